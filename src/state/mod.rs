// Session state types.
// Dataset, pipeline progress, dashboard tab, and business rule models plus partial updates.

pub mod rules;
pub mod session;
pub mod tab;
pub mod update;

pub use rules::{BusinessRule, Severity};
pub use session::{DatasetRef, PipelineData, PipelineStage, PipelineStatus, SessionState, StageResult};
pub use tab::DashboardTab;
pub use update::SessionUpdate;
