//! Performance measures and fold-score aggregation

use crate::error::{MlexpError, Result};
use crate::task::TaskType;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// A performance measure for evaluating predictions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Measure {
    /// Mean misclassification error
    Mmce,
    /// Accuracy
    Acc,
    /// Mean squared error
    Mse,
    /// Root mean squared error
    Rmse,
    /// Mean absolute error
    Mae,
    /// R-squared
    R2,
}

impl Measure {
    /// Measure identifier
    pub fn id(&self) -> &'static str {
        match self {
            Measure::Mmce => "mmce",
            Measure::Acc => "acc",
            Measure::Mse => "mse",
            Measure::Rmse => "rmse",
            Measure::Mae => "mae",
            Measure::R2 => "r2",
        }
    }

    /// Whether lower values are better
    pub fn minimize(&self) -> bool {
        !matches!(self, Measure::Acc | Measure::R2)
    }

    /// Task type this measure applies to
    pub fn task_type(&self) -> TaskType {
        match self {
            Measure::Mmce | Measure::Acc => TaskType::Classif,
            Measure::Mse | Measure::Rmse | Measure::Mae | Measure::R2 => TaskType::Regr,
        }
    }

    /// Default measure for a task type
    pub fn default_for(task_type: TaskType) -> Measure {
        match task_type {
            TaskType::Classif => Measure::Mmce,
            TaskType::Regr => Measure::Mse,
        }
    }

    /// Worst possible value, respecting the direction
    pub fn worst(&self) -> f64 {
        if self.minimize() {
            f64::INFINITY
        } else {
            f64::NEG_INFINITY
        }
    }

    /// Evaluate predictions against the truth
    pub fn eval(&self, y_true: &Array1<f64>, y_pred: &Array1<f64>) -> Result<f64> {
        if y_true.len() != y_pred.len() {
            return Err(MlexpError::MeasureError(format!(
                "truth has {} values but prediction has {}",
                y_true.len(),
                y_pred.len()
            )));
        }
        if y_true.is_empty() {
            return Err(MlexpError::MeasureError(
                "cannot score an empty prediction".to_string(),
            ));
        }
        let n = y_true.len() as f64;
        let score = match self {
            Measure::Mmce | Measure::Acc => {
                let correct = y_true
                    .iter()
                    .zip(y_pred.iter())
                    .filter(|(t, p)| (**t - **p).abs() < 0.5)
                    .count() as f64;
                match self {
                    Measure::Acc => correct / n,
                    _ => 1.0 - correct / n,
                }
            }
            Measure::Mse => {
                y_true
                    .iter()
                    .zip(y_pred.iter())
                    .map(|(t, p)| (t - p).powi(2))
                    .sum::<f64>()
                    / n
            }
            Measure::Rmse => {
                (y_true
                    .iter()
                    .zip(y_pred.iter())
                    .map(|(t, p)| (t - p).powi(2))
                    .sum::<f64>()
                    / n)
                    .sqrt()
            }
            Measure::Mae => {
                y_true
                    .iter()
                    .zip(y_pred.iter())
                    .map(|(t, p)| (t - p).abs())
                    .sum::<f64>()
                    / n
            }
            Measure::R2 => {
                let mean = y_true.sum() / n;
                let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
                let ss_res: f64 = y_true
                    .iter()
                    .zip(y_pred.iter())
                    .map(|(t, p)| (t - p).powi(2))
                    .sum();
                if ss_tot > 0.0 {
                    1.0 - ss_res / ss_tot
                } else {
                    0.0
                }
            }
        };
        Ok(score)
    }
}

/// Aggregated fold scores. Non-finite scores are treated as missing: NaN
/// comes from folds whose learner failed under the warn/quiet policy, and an
/// infinite score (e.g. a squared-error overflow) is equally unusable. Both
/// are excluded from mean and sd and counted in `n_missing`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Aggregation {
    /// Raw per-fold scores, NaN for failed folds
    pub scores: Vec<f64>,
    /// Mean over finite scores (NaN if no fold produced one)
    pub mean: f64,
    /// Standard deviation over finite scores
    pub sd: f64,
    /// Number of folds without a finite score
    pub n_missing: usize,
}

impl Aggregation {
    /// Aggregate per-fold scores
    pub fn from_scores(scores: Vec<f64>) -> Self {
        let valid: Vec<f64> = scores.iter().copied().filter(|s| s.is_finite()).collect();
        let n_missing = scores.len() - valid.len();
        if valid.is_empty() {
            return Self {
                scores,
                mean: f64::NAN,
                sd: f64::NAN,
                n_missing,
            };
        }
        let n = valid.len() as f64;
        let mean = valid.iter().sum::<f64>() / n;
        let var = valid.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
        Self {
            scores,
            mean,
            sd: var.sqrt(),
            n_missing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_mmce_and_acc_complementary() {
        let t = array![0.0, 1.0, 1.0, 0.0];
        let p = array![0.0, 1.0, 0.0, 0.0];
        let mmce = Measure::Mmce.eval(&t, &p).unwrap();
        let acc = Measure::Acc.eval(&t, &p).unwrap();
        assert!((mmce - 0.25).abs() < 1e-12);
        assert!((acc + mmce - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_regression_measures() {
        let t = array![1.0, 2.0, 3.0];
        let p = array![1.0, 2.0, 5.0];
        assert!((Measure::Mse.eval(&t, &p).unwrap() - 4.0 / 3.0).abs() < 1e-12);
        assert!((Measure::Mae.eval(&t, &p).unwrap() - 2.0 / 3.0).abs() < 1e-12);
        let r2 = Measure::R2.eval(&t, &t).unwrap();
        assert!((r2 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_length_mismatch() {
        let t = array![1.0, 2.0];
        let p = array![1.0];
        assert!(Measure::Mse.eval(&t, &p).is_err());
    }

    #[test]
    fn test_direction() {
        assert!(Measure::Mmce.minimize());
        assert!(!Measure::Acc.minimize());
        assert_eq!(Measure::Mmce.worst(), f64::INFINITY);
        assert_eq!(Measure::R2.worst(), f64::NEG_INFINITY);
    }

    #[test]
    fn test_aggregation_skips_missing() {
        let aggr = Aggregation::from_scores(vec![1.0, f64::NAN, 3.0]);
        assert_eq!(aggr.n_missing, 1);
        assert!((aggr.mean - 2.0).abs() < 1e-12);
        assert!((aggr.sd - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_aggregation_treats_infinite_as_missing() {
        let aggr = Aggregation::from_scores(vec![1.0, f64::INFINITY, 3.0]);
        assert_eq!(aggr.n_missing, 1);
        assert!((aggr.mean - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_aggregation_all_missing() {
        let aggr = Aggregation::from_scores(vec![f64::NAN, f64::NAN]);
        assert_eq!(aggr.n_missing, 2);
        assert!(aggr.mean.is_nan());
    }
}
