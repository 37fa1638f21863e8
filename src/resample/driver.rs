//! Resampling driver: iterate folds, train, predict, score
//!
//! Fold evaluation is dispatched through the parallel layer at level
//! `Resample`. Each worker receives the propagated configuration and
//! applies the on-learner-error policy locally: `Fail` aborts the run,
//! `Warn` logs and records a missing score, `Quiet` records silently.

use crate::error::{MlexpError, Result};
use crate::learner::Learner;
use crate::measure::{Aggregation, Measure};
use crate::parallel::{parallel_map, ErrorPolicy, ExecConfig, ParallelLevel};
use crate::resample::{ResampleSplit, Resampling};
use crate::task::Task;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Result of a resampling evaluation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResampleResult {
    /// Measure that was evaluated
    pub measure: Measure,
    /// Aggregated fold scores
    pub aggr: Aggregation,
    /// Per-fold learner error messages, `None` for successful folds
    pub fold_errors: Vec<Option<String>>,
    /// Number of resampling iterations
    pub n_iters: usize,
}

/// Estimate learner performance on a task by resampling
pub fn resample(
    learner: &dyn Learner,
    task: &Task,
    resampling: &Resampling,
    measure: Measure,
    exec: &ExecConfig,
) -> Result<ResampleResult> {
    if learner.task_type() != task.task_type() {
        return Err(MlexpError::ConfigError(format!(
            "learner `{}` is a {} learner but the task is {}",
            learner.id(),
            learner.task_type(),
            task.task_type()
        )));
    }
    if measure.task_type() != task.task_type() {
        return Err(MlexpError::ConfigError(format!(
            "measure `{}` does not apply to {} tasks",
            measure.id(),
            task.task_type()
        )));
    }

    let x = task.features_array()?;
    let y = task.target_values()?;
    let weights = task.weights().map(|w| w.to_vec());
    let instance = resampling.instantiate(task)?;
    let n_iters = instance.splits.len();

    info!(
        task = task.id(),
        learner = learner.id(),
        measure = measure.id(),
        iters = n_iters,
        "starting resampling"
    );

    let outcomes: Vec<(f64, Option<String>)> = parallel_map(
        exec,
        ParallelLevel::Resample,
        instance.splits,
        |cfg, split| {
            let iter = split.iter;
            match evaluate_split(learner, &x, &y, weights.as_deref(), &split, measure) {
                Ok(score) => {
                    if cfg.log_progress {
                        debug!(iter, score, "fold evaluated");
                    }
                    (score, None)
                }
                Err(e) => {
                    if cfg.on_learner_error == ErrorPolicy::Warn {
                        warn!(iter, error = %e, "learner failed, scoring fold as missing");
                    }
                    (f64::NAN, Some(e.to_string()))
                }
            }
        },
    );

    if exec.worker.on_learner_error == ErrorPolicy::Fail {
        if let Some((_, Some(msg))) = outcomes.iter().find(|(_, e)| e.is_some()) {
            return Err(MlexpError::LearnerError(msg.clone()));
        }
    }

    let (scores, fold_errors): (Vec<f64>, Vec<Option<String>>) = outcomes.into_iter().unzip();
    let aggr = Aggregation::from_scores(scores);

    info!(
        mean = aggr.mean,
        sd = aggr.sd,
        n_missing = aggr.n_missing,
        "resampling finished"
    );

    Ok(ResampleResult {
        measure,
        aggr,
        fold_errors,
        n_iters,
    })
}

fn evaluate_split(
    learner: &dyn Learner,
    x: &Array2<f64>,
    y: &Array1<f64>,
    weights: Option<&[f64]>,
    split: &ResampleSplit,
    measure: Measure,
) -> Result<f64> {
    let x_train = select_rows(x, &split.train);
    let y_train = select_values(y, &split.train);
    let w_train =
        weights.map(|w| split.train.iter().map(|&i| w[i]).collect::<Vec<f64>>());

    let model = learner.train(&x_train, &y_train, w_train.as_deref())?;

    let x_test = select_rows(x, &split.test);
    let y_test = select_values(y, &split.test);
    let pred = model.predict(&x_test)?;
    measure.eval(&y_test, &pred)
}

fn select_rows(x: &Array2<f64>, rows: &[usize]) -> Array2<f64> {
    Array2::from_shape_fn((rows.len(), x.ncols()), |(r, c)| x[[rows[r], c]])
}

fn select_values(y: &Array1<f64>, rows: &[usize]) -> Array1<f64> {
    Array1::from_shape_fn(rows.len(), |r| y[rows[r]])
}
