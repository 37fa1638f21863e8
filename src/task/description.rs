//! Task description records and fix-up policies

use serde::{Deserialize, Serialize};

/// Kind of supervised learning task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskType {
    /// Classification (categorical target)
    Classif,
    /// Regression (numeric target)
    Regr,
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskType::Classif => write!(f, "classif"),
            TaskType::Regr => write!(f, "regr"),
        }
    }
}

/// Kind of a single feature column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureKind {
    /// Fully-specified numeric column
    Numeric,
    /// Categorical column with a fixed level set
    Factor,
}

/// Policy for dropping empty factor levels at construction time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum FixupPolicy {
    /// Drop empty levels silently
    Quiet,
    /// Drop empty levels and emit a warning naming affected columns
    #[default]
    Warn,
    /// Leave the data untouched; validation then rejects empty levels
    Off,
}

/// Record of the level fix-up applied during construction
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixupReport {
    /// Columns whose level set changed, with the levels that were dropped
    pub changed: Vec<(String, Vec<String>)>,
}

impl FixupReport {
    /// Whether any column was touched
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty()
    }

    /// Names of all columns whose levels changed
    pub fn columns(&self) -> Vec<&str> {
        self.changed.iter().map(|(c, _)| c.as_str()).collect()
    }
}

/// Computed summary record for a task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskDesc {
    /// Task identifier
    pub id: String,
    /// Task type
    pub task_type: TaskType,
    /// Number of observations
    pub n_obs: usize,
    /// Number of feature columns
    pub n_feats: usize,
    /// Number of numeric features
    pub n_numeric: usize,
    /// Number of factor features
    pub n_factor: usize,
    /// Whether any feature or target value is missing
    pub has_missing: bool,
    /// Whether per-observation weights are attached
    pub has_weights: bool,
    /// Whether a blocking factor is attached
    pub has_blocking: bool,
    /// Positive class label (binary classification only)
    pub positive: Option<String>,
    /// Observed target class levels (classification only)
    pub class_levels: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_type_display() {
        assert_eq!(TaskType::Classif.to_string(), "classif");
        assert_eq!(TaskType::Regr.to_string(), "regr");
    }

    #[test]
    fn test_fixup_report_columns() {
        let report = FixupReport {
            changed: vec![("color".to_string(), vec!["violet".to_string()])],
        };
        assert!(!report.is_empty());
        assert_eq!(report.columns(), vec!["color"]);
    }

    #[test]
    fn test_default_fixup_policy_warns() {
        assert_eq!(FixupPolicy::default(), FixupPolicy::Warn);
    }
}
