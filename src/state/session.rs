// Session state for the pipeline dashboard.
// Defines the persisted shape: dataset, pipeline progress, active tab, rules, chat flag.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::rules::BusinessRule;
use super::tab::DashboardTab;

/// Overall pipeline status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStatus {
    #[default]
    Idle,
    Processing,
    Completed,
    Error,
}

impl PipelineStatus {
    pub fn display(&self) -> &'static str {
        match self {
            PipelineStatus::Idle => "Idle",
            PipelineStatus::Processing => "Processing",
            PipelineStatus::Completed => "Completed",
            PipelineStatus::Error => "Error",
        }
    }
}

/// Stages of the pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    Upload,
    Validation,
    Rules,
    Cleaning,
    Analytics,
}

/// Reference to the dataset currently being processed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetRef {
    pub id: String,
    pub name: String,
    pub row_count: Option<u64>,
    pub uploaded_at: DateTime<Utc>,
}

impl DatasetRef {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            row_count: None,
            uploaded_at: Utc::now(),
        }
    }

    pub fn with_row_count(mut self, rows: u64) -> Self {
        self.row_count = Some(rows);
        self
    }
}

/// Outcome of one pipeline stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageResult {
    pub completed_at: DateTime<Utc>,
    pub records_processed: u64,
    pub issues_found: u64,
    pub summary: Option<String>,
}

impl StageResult {
    pub fn new(records_processed: u64, issues_found: u64) -> Self {
        Self {
            completed_at: Utc::now(),
            records_processed,
            issues_found,
            summary: None,
        }
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }
}

/// Accumulated results keyed by pipeline stage.
pub type PipelineData = BTreeMap<PipelineStage, StageResult>;

/// Complete pipeline session state.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    /// Dataset being processed, if one has been uploaded.
    pub current_dataset: Option<DatasetRef>,
    pub pipeline_status: PipelineStatus,
    pub pipeline_data: PipelineData,
    /// Section to restore on reload.
    pub active_tab: DashboardTab,
    pub is_chat_open: bool,
    pub business_rules: Vec<BusinessRule>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rules currently switched on.
    pub fn enabled_rules(&self) -> impl Iterator<Item = &BusinessRule> {
        self.business_rules.iter().filter(|rule| rule.enabled)
    }

    pub fn find_rule(&self, id: &str) -> Option<&BusinessRule> {
        self.business_rules.iter().find(|rule| rule.id == id)
    }

    /// Stages that have recorded a result, in pipeline order.
    pub fn completed_stages(&self) -> Vec<PipelineStage> {
        self.pipeline_data.keys().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Severity;

    fn populated() -> SessionState {
        let mut state = SessionState::new();
        state.current_dataset = Some(DatasetRef::new("ds-1", "customers.csv").with_row_count(1200));
        state.pipeline_status = PipelineStatus::Processing;
        state.pipeline_data.insert(
            PipelineStage::Validation,
            StageResult::new(1200, 37).with_summary("37 rows failed validation"),
        );
        state.active_tab = DashboardTab::Validate;
        state.is_chat_open = true;
        state.business_rules.push(BusinessRule::new(
            "r1",
            "Valid email",
            "email ~ '@'",
            Severity::Critical,
        ));
        state
    }

    #[test]
    fn test_default_state() {
        let state = SessionState::default();
        assert!(state.current_dataset.is_none());
        assert_eq!(state.pipeline_status, PipelineStatus::Idle);
        assert!(state.pipeline_data.is_empty());
        assert_eq!(state.active_tab, DashboardTab::Upload);
        assert!(!state.is_chat_open);
        assert!(state.business_rules.is_empty());
    }

    #[test]
    fn test_serialized_field_names() {
        let json = serde_json::to_value(populated()).unwrap();

        assert_eq!(json["activeTab"], "validate");
        assert_eq!(json["pipelineStatus"], "processing");
        assert_eq!(json["isChatOpen"], true);
        assert_eq!(json["currentDataset"]["rowCount"], 1200);
        assert_eq!(json["pipelineData"]["validation"]["issuesFound"], 37);
        assert_eq!(json["businessRules"][0]["severity"], "critical");
    }

    #[test]
    fn test_round_trip_preserves_state() {
        let state = populated();
        let json = serde_json::to_string(&state).unwrap();
        let parsed: SessionState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, state);
    }

    #[test]
    fn test_absent_dataset_serializes_as_null() {
        let json = serde_json::to_value(SessionState::default()).unwrap();
        assert!(json["currentDataset"].is_null());
    }

    #[test]
    fn test_enabled_rules_and_completed_stages() {
        let mut state = populated();
        state
            .business_rules
            .push(BusinessRule { enabled: false, ..BusinessRule::new("r2", "Off", "true", Severity::Low) });
        state
            .pipeline_data
            .insert(PipelineStage::Upload, StageResult::new(1200, 0));

        assert_eq!(state.enabled_rules().count(), 1);
        assert_eq!(
            state.completed_stages(),
            vec![PipelineStage::Upload, PipelineStage::Validation]
        );
        assert!(state.find_rule("r2").is_some());
    }
}
