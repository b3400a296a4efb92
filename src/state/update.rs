// Partial updates to the session state.
// Only the fields that are set replace their counterpart; nothing merges below the top level.

use super::rules::BusinessRule;
use super::session::{DatasetRef, PipelineData, PipelineStatus, SessionState};
use super::tab::DashboardTab;

/// A shallow, top-level patch of [`SessionState`].
///
/// `current_dataset` is doubly optional so an update can clear the dataset
/// (`Some(None)`) as well as leave it alone (`None`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionUpdate {
    pub current_dataset: Option<Option<DatasetRef>>,
    pub pipeline_status: Option<PipelineStatus>,
    pub pipeline_data: Option<PipelineData>,
    pub active_tab: Option<DashboardTab>,
    pub is_chat_open: Option<bool>,
    pub business_rules: Option<Vec<BusinessRule>>,
}

impl SessionUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current_dataset(mut self, dataset: Option<DatasetRef>) -> Self {
        self.current_dataset = Some(dataset);
        self
    }

    pub fn pipeline_status(mut self, status: PipelineStatus) -> Self {
        self.pipeline_status = Some(status);
        self
    }

    pub fn pipeline_data(mut self, data: PipelineData) -> Self {
        self.pipeline_data = Some(data);
        self
    }

    pub fn active_tab(mut self, tab: DashboardTab) -> Self {
        self.active_tab = Some(tab);
        self
    }

    pub fn chat_open(mut self, open: bool) -> Self {
        self.is_chat_open = Some(open);
        self
    }

    pub fn business_rules(mut self, rules: Vec<BusinessRule>) -> Self {
        self.business_rules = Some(rules);
        self
    }

    /// True when the update would change nothing.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply the set fields to `state`, replacing each one wholesale.
    pub fn apply_to(self, state: &mut SessionState) {
        if let Some(dataset) = self.current_dataset {
            state.current_dataset = dataset;
        }
        if let Some(status) = self.pipeline_status {
            state.pipeline_status = status;
        }
        if let Some(data) = self.pipeline_data {
            state.pipeline_data = data;
        }
        if let Some(tab) = self.active_tab {
            state.active_tab = tab;
        }
        if let Some(open) = self.is_chat_open {
            state.is_chat_open = open;
        }
        if let Some(rules) = self.business_rules {
            state.business_rules = rules;
        }
    }
}
