//! Optimization path: the ordered log of evaluated configurations

use crate::error::Result;
use crate::tune::ParamConfig;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One evaluated configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptPathEntry {
    /// Position in the path
    pub index: usize,
    /// Parameter assignment that was evaluated
    pub config: ParamConfig,
    /// Aggregated performance, NaN when the evaluation failed
    pub score: f64,
    /// Wall-clock evaluation time
    pub exec_time_secs: f64,
    /// Error message when the evaluation failed
    pub error_message: Option<String>,
    /// When the entry was logged
    pub timestamp: DateTime<Utc>,
}

/// Ordered log of evaluated configurations with their scores
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptPath {
    entries: Vec<OptPathEntry>,
    minimize: bool,
}

impl OptPath {
    /// Create an empty path for the given optimization direction
    pub fn new(minimize: bool) -> Self {
        Self {
            entries: Vec::new(),
            minimize,
        }
    }

    /// Whether lower scores are better
    pub fn minimize(&self) -> bool {
        self.minimize
    }

    /// Append an evaluation, returning its index
    pub fn push(
        &mut self,
        config: ParamConfig,
        score: f64,
        exec_time_secs: f64,
        error_message: Option<String>,
    ) -> usize {
        let index = self.entries.len();
        self.entries.push(OptPathEntry {
            index,
            config,
            score,
            exec_time_secs,
            error_message,
            timestamp: Utc::now(),
        });
        index
    }

    pub fn entries(&self) -> &[OptPathEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Best entry so far; failed (NaN) evaluations never win
    pub fn best(&self) -> Option<&OptPathEntry> {
        self.entries
            .iter()
            .filter(|e| e.score.is_finite())
            .min_by(|a, b| {
                if self.minimize {
                    a.score.total_cmp(&b.score)
                } else {
                    b.score.total_cmp(&a.score)
                }
            })
    }

    /// Persist the path as JSON
    pub fn save(&self, path: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load a path from JSON
    pub fn load(path: &str) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let loaded: Self = serde_json::from_str(&json)?;
        Ok(loaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tune::ParamValue;

    fn config(v: f64) -> ParamConfig {
        let mut c = ParamConfig::new();
        c.insert("x".to_string(), ParamValue::Float(v));
        c
    }

    #[test]
    fn test_best_minimize() {
        let mut path = OptPath::new(true);
        path.push(config(1.0), 3.0, 0.1, None);
        path.push(config(2.0), 1.0, 0.1, None);
        path.push(config(3.0), 2.0, 0.1, None);
        assert_eq!(path.best().unwrap().index, 1);
    }

    #[test]
    fn test_best_maximize() {
        let mut path = OptPath::new(false);
        path.push(config(1.0), 0.2, 0.1, None);
        path.push(config(2.0), 0.9, 0.1, None);
        assert_eq!(path.best().unwrap().index, 1);
    }

    #[test]
    fn test_best_skips_failed_entries() {
        let mut path = OptPath::new(true);
        path.push(config(1.0), f64::NAN, 0.1, Some("boom".to_string()));
        path.push(config(2.0), 5.0, 0.1, None);
        let best = path.best().unwrap();
        assert_eq!(best.index, 1);
        assert_eq!(best.score, 5.0);
    }

    #[test]
    fn test_empty_path_has_no_best() {
        let path = OptPath::new(true);
        assert!(path.best().is_none());
    }

    #[test]
    fn test_json_round_trip() {
        let mut path = OptPath::new(true);
        path.push(config(1.5), 2.5, 0.01, None);
        let json = serde_json::to_string(&path).unwrap();
        let back: OptPath = serde_json::from_str(&json).unwrap();
        assert_eq!(back.len(), 1);
        assert_eq!(back.entries()[0].score, 2.5);
        assert!(back.minimize());
    }
}
