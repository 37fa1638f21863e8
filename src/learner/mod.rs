//! Learner abstraction: the pluggable train/predict contract
//!
//! Drivers never see model internals. They hand a feature matrix plus
//! target vector to a [`Learner`] and get back a boxed [`PredictModel`].
//! Serious learners live outside this crate; the built-ins here exist so
//! resampling and tuning are exercisable end-to-end.

pub mod baseline;
pub mod linear;

pub use baseline::{FeaturelessClassifier, FeaturelessRegressor};
pub use linear::RidgeRegression;

use crate::error::Result;
use crate::task::TaskType;
use ndarray::{Array1, Array2};

/// A model-fitting strategy
pub trait Learner: Send + Sync {
    /// Learner identifier for logs and results
    fn id(&self) -> &str;

    /// Task type this learner supports
    fn task_type(&self) -> TaskType;

    /// Fit on a training matrix and target vector. Classification targets
    /// arrive as class indices. Weights, when present, match the row count.
    fn train(
        &self,
        x: &Array2<f64>,
        y: &Array1<f64>,
        weights: Option<&[f64]>,
    ) -> Result<Box<dyn PredictModel>>;
}

/// A fitted model ready for prediction
pub trait PredictModel: Send {
    /// Predict a numeric response (class index for classification)
    fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>>;
}
