// Business rule descriptors managed from the rules section.

use serde::{Deserialize, Serialize};

/// How serious a rule violation is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    #[default]
    Medium,
    High,
    Critical,
}

/// A data-quality rule applied during validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessRule {
    pub id: String,
    pub name: String,
    /// Condition expression evaluated against each record, e.g. `age >= 0`.
    pub condition: String,
    pub severity: Severity,
    pub enabled: bool,
}

impl BusinessRule {
    /// Create an enabled rule.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        condition: impl Into<String>,
        severity: Severity,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            condition: condition.into(),
            severity,
            enabled: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_orders_by_seriousness() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn test_rule_json_shape() {
        let rule = BusinessRule::new("r1", "Non-negative age", "age >= 0", Severity::High);
        let json = serde_json::to_value(&rule).unwrap();

        assert_eq!(json["severity"], "high");
        assert_eq!(json["enabled"], true);
        assert_eq!(json["condition"], "age >= 0");
    }
}
