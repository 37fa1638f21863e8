//! Featureless baseline learners
//!
//! These ignore the feature matrix entirely and predict a constant derived
//! from the training target: the (weighted) mean for regression, the
//! (weighted) majority class for classification. Useful as sanity baselines
//! and as cheap drivers for resampling tests.

use crate::error::{MlexpError, Result};
use crate::learner::{Learner, PredictModel};
use crate::task::TaskType;
use ndarray::{Array1, Array2};
use std::collections::BTreeMap;

/// Predicts the (weighted) training mean
#[derive(Debug, Clone, Default)]
pub struct FeaturelessRegressor;

impl FeaturelessRegressor {
    pub fn new() -> Self {
        Self
    }
}

impl Learner for FeaturelessRegressor {
    fn id(&self) -> &str {
        "regr.featureless"
    }

    fn task_type(&self) -> TaskType {
        TaskType::Regr
    }

    fn train(
        &self,
        _x: &Array2<f64>,
        y: &Array1<f64>,
        weights: Option<&[f64]>,
    ) -> Result<Box<dyn PredictModel>> {
        if y.is_empty() {
            return Err(MlexpError::LearnerError(
                "cannot train on an empty target vector".to_string(),
            ));
        }
        let constant = match weights {
            None => y.sum() / y.len() as f64,
            Some(w) => {
                let total: f64 = w.iter().sum();
                if total <= 0.0 {
                    return Err(MlexpError::LearnerError(
                        "weights sum to zero".to_string(),
                    ));
                }
                y.iter().zip(w.iter()).map(|(v, w)| v * w).sum::<f64>() / total
            }
        };
        Ok(Box::new(ConstantModel { constant }))
    }
}

/// Predicts the (weighted) majority class index
#[derive(Debug, Clone, Default)]
pub struct FeaturelessClassifier;

impl FeaturelessClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl Learner for FeaturelessClassifier {
    fn id(&self) -> &str {
        "classif.featureless"
    }

    fn task_type(&self) -> TaskType {
        TaskType::Classif
    }

    fn train(
        &self,
        _x: &Array2<f64>,
        y: &Array1<f64>,
        weights: Option<&[f64]>,
    ) -> Result<Box<dyn PredictModel>> {
        if y.is_empty() {
            return Err(MlexpError::LearnerError(
                "cannot train on an empty target vector".to_string(),
            ));
        }
        let mut votes: BTreeMap<i64, f64> = BTreeMap::new();
        for (i, &v) in y.iter().enumerate() {
            let class = v.round() as i64;
            let w = weights.map(|w| w[i]).unwrap_or(1.0);
            *votes.entry(class).or_insert(0.0) += w;
        }
        let majority = votes
            .into_iter()
            .max_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(class, _)| class as f64)
            .ok_or_else(|| MlexpError::LearnerError("no classes observed".to_string()))?;
        Ok(Box::new(ConstantModel { constant: majority }))
    }
}

struct ConstantModel {
    constant: f64,
}

impl PredictModel for ConstantModel {
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(Array1::from_elem(x.nrows(), self.constant))
    }
}
