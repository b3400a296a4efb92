// Dashboard sections that can be restored as the active view.
// Listed in pipeline order, from upload to analytics.

use serde::{Deserialize, Serialize};

/// Last-viewed dashboard section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DashboardTab {
    #[default]
    Upload,
    Validate,
    Rules,
    Clean,
    Analytics,
}

impl DashboardTab {
    /// Every section, in pipeline order.
    pub const ALL: [DashboardTab; 5] = [
        DashboardTab::Upload,
        DashboardTab::Validate,
        DashboardTab::Rules,
        DashboardTab::Clean,
        DashboardTab::Analytics,
    ];
}
