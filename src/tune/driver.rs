//! Tuning driver: evaluate proposed configurations by resampling
//!
//! Each candidate configuration is scored by a full resampling run of the
//! learner the factory builds for it. Candidate evaluation within a batch
//! dispatches at level `Tune`; when that level is active the inner
//! resampling runs sequentially so the two levels never nest pools.

use crate::error::{MlexpError, Result};
use crate::learner::Learner;
use crate::measure::Measure;
use crate::parallel::{parallel_map, Backend, ErrorPolicy, ExecConfig, ParallelLevel};
use crate::resample::{resample, Resampling};
use crate::task::Task;
use crate::tune::{OptPath, ParamConfig, ParamSet, SearchStrategy};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};

/// Result of a tuning run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TuneResult {
    /// Best configuration found
    pub best_config: ParamConfig,
    /// Its aggregated resampling score
    pub best_score: f64,
    /// The full optimization path
    pub opt_path: OptPath,
}

/// Tune hyperparameters by resampled evaluation of proposed configurations
pub fn tune<F>(
    factory: F,
    task: &Task,
    resampling: &Resampling,
    measure: Measure,
    param_set: &ParamSet,
    strategy: &mut dyn SearchStrategy,
    exec: &ExecConfig,
) -> Result<TuneResult>
where
    F: Fn(&ParamConfig) -> Result<Box<dyn Learner>> + Sync,
{
    if param_set.is_empty() {
        return Err(MlexpError::TuneError(
            "parameter set is empty".to_string(),
        ));
    }

    let inner_backend = if exec.active_at(ParallelLevel::Tune) {
        Backend::Sequential
    } else {
        exec.backend.clone()
    };

    let mut path = OptPath::new(measure.minimize());

    while let Some(batch) = strategy.propose(param_set, &path) {
        if batch.is_empty() {
            break;
        }
        info!(candidates = batch.len(), "evaluating tuning batch");

        let evals: Vec<(ParamConfig, f64, f64, Option<String>)> = parallel_map(
            exec,
            ParallelLevel::Tune,
            batch,
            |cfg, config| {
                let start = Instant::now();
                let inner = ExecConfig {
                    backend: inner_backend.clone(),
                    level: exec.level,
                    worker: cfg.clone(),
                };
                let outcome = factory(&config)
                    .and_then(|learner| resample(learner.as_ref(), task, resampling, measure, &inner));
                let secs = start.elapsed().as_secs_f64();
                match outcome {
                    Ok(rr) => (config, rr.aggr.mean, secs, None),
                    Err(e) => (config, f64::NAN, secs, Some(e.to_string())),
                }
            },
        );

        for (config, score, secs, error) in evals {
            if let Some(msg) = &error {
                match exec.worker.on_learner_error {
                    ErrorPolicy::Fail => return Err(MlexpError::TuneError(msg.clone())),
                    ErrorPolicy::Warn => {
                        warn!(error = %msg, "configuration failed, logging as missing")
                    }
                    ErrorPolicy::Quiet => {}
                }
            }
            path.push(config, score, secs, error);
        }
    }

    let (best_config, best_score) = {
        let best = path.best().ok_or_else(|| {
            MlexpError::TuneError("no configuration evaluated successfully".to_string())
        })?;
        (best.config.clone(), best.score)
    };

    info!(
        evaluations = path.len(),
        best_score, "tuning finished"
    );

    Ok(TuneResult {
        best_config,
        best_score,
        opt_path: path,
    })
}
