// Property tests for shallow-merge semantics and persistence round-trips.

use pipeline_session::{
    BusinessRule, DashboardTab, DatasetRef, MemoryStorage, PipelineData, PipelineStage,
    PipelineStatus, SessionState, SessionStore, SessionUpdate, Severity, StageResult,
};
use proptest::prelude::*;

fn status() -> impl Strategy<Value = PipelineStatus> {
    prop::sample::select(vec![
        PipelineStatus::Idle,
        PipelineStatus::Processing,
        PipelineStatus::Completed,
        PipelineStatus::Error,
    ])
}

fn rules() -> impl Strategy<Value = Vec<BusinessRule>> {
    prop::collection::vec(("[a-z]{1,4}", any::<bool>()), 0..4).prop_map(|specs| {
        specs
            .into_iter()
            .map(|(id, enabled)| BusinessRule {
                enabled,
                ..BusinessRule::new(id.clone(), id, "value > 0", Severity::Low)
            })
            .collect()
    })
}

fn pipeline_data() -> impl Strategy<Value = PipelineData> {
    let stage = prop::sample::select(vec![
        PipelineStage::Upload,
        PipelineStage::Validation,
        PipelineStage::Rules,
        PipelineStage::Cleaning,
        PipelineStage::Analytics,
    ]);
    prop::collection::btree_map(stage, (0u64..1000, 0u64..50), 0..4).prop_map(|results| {
        results
            .into_iter()
            .map(|(stage, (records, issues))| (stage, StageResult::new(records, issues)))
            .collect()
    })
}

fn update() -> impl Strategy<Value = SessionUpdate> {
    (
        prop::option::of(prop::option::of("[a-z]{1,6}")),
        prop::option::of(status()),
        prop::option::of(pipeline_data()),
        prop::option::of(prop::sample::select(DashboardTab::ALL.to_vec())),
        prop::option::of(any::<bool>()),
        prop::option::of(rules()),
    )
        .prop_map(|(dataset, status, data, tab, chat, rules)| SessionUpdate {
            current_dataset: dataset.map(|id| id.map(|id| DatasetRef::new(id.clone(), id))),
            pipeline_status: status,
            pipeline_data: data,
            active_tab: tab,
            is_chat_open: chat,
            business_rules: rules,
        })
}

/// Latest update matching `pick`.
fn last<'a>(
    updates: &'a [SessionUpdate],
    pick: impl Fn(&SessionUpdate) -> bool,
) -> Option<&'a SessionUpdate> {
    updates.iter().rev().find(|u| pick(*u))
}

/// Expected state after `updates`: for each field, the last value set, else the default.
fn fold_updates(updates: &[SessionUpdate]) -> SessionState {
    let defaults = SessionState::default();

    SessionState {
        current_dataset: last(updates, |u| u.current_dataset.is_some())
            .and_then(|u| u.current_dataset.clone())
            .unwrap_or(defaults.current_dataset),
        pipeline_status: last(updates, |u| u.pipeline_status.is_some())
            .and_then(|u| u.pipeline_status)
            .unwrap_or(defaults.pipeline_status),
        pipeline_data: last(updates, |u| u.pipeline_data.is_some())
            .and_then(|u| u.pipeline_data.clone())
            .unwrap_or(defaults.pipeline_data),
        active_tab: last(updates, |u| u.active_tab.is_some())
            .and_then(|u| u.active_tab)
            .unwrap_or(defaults.active_tab),
        is_chat_open: last(updates, |u| u.is_chat_open.is_some())
            .and_then(|u| u.is_chat_open)
            .unwrap_or(defaults.is_chat_open),
        business_rules: last(updates, |u| u.business_rules.is_some())
            .and_then(|u| u.business_rules.clone())
            .unwrap_or(defaults.business_rules),
    }
}

proptest! {
    #[test]
    fn set_sequence_equals_shallow_merge(updates in prop::collection::vec(update(), 0..8)) {
        let storage = MemoryStorage::new();
        let mut store = SessionStore::open(storage.clone());
        let expected = fold_updates(&updates);

        for update in updates {
            store.set(update);
        }

        prop_assert_eq!(store.get(), &expected);

        let reloaded = SessionStore::open(storage);
        prop_assert_eq!(reloaded.get(), &expected);
    }

    #[test]
    fn unset_fields_keep_earlier_values(first in update(), tab in prop::sample::select(DashboardTab::ALL.to_vec())) {
        let mut store = SessionStore::open(MemoryStorage::new());
        store.set(first);
        let before = store.get().clone();

        store.set(SessionUpdate::new().active_tab(tab));

        let after = store.get();
        prop_assert_eq!(after.active_tab, tab);
        prop_assert_eq!(&after.current_dataset, &before.current_dataset);
        prop_assert_eq!(after.pipeline_status, before.pipeline_status);
        prop_assert_eq!(&after.pipeline_data, &before.pipeline_data);
        prop_assert_eq!(after.is_chat_open, before.is_chat_open);
        prop_assert_eq!(&after.business_rules, &before.business_rules);
    }

    #[test]
    fn reset_after_any_sequence_restores_defaults(updates in prop::collection::vec(update(), 1..5)) {
        let storage = MemoryStorage::new();
        let mut store = SessionStore::open(storage.clone());
        for update in updates {
            store.set(update);
        }

        store.reset();

        prop_assert_eq!(store.get(), &SessionState::default());
        prop_assert!(SessionStore::open(storage).get() == &SessionState::default());
    }
}
