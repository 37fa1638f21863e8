//! Feature selection over resampled performance
//!
//! Candidate feature subsets are scored by resampling the learner on a
//! task view restricted to those features. Every evaluated subset lands in
//! an optimization path, encoded as a 0/1 assignment per feature. Subset
//! evaluation within one round dispatches at level `FeatSel`.

use crate::error::{MlexpError, Result};
use crate::learner::Learner;
use crate::measure::Measure;
use crate::parallel::{parallel_map, Backend, ErrorPolicy, ExecConfig, ParallelLevel};
use crate::resample::{resample, Resampling};
use crate::task::Task;
use crate::tune::{OptPath, ParamConfig, ParamValue};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};

/// Subset-search strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FeatSelStrategy {
    /// Greedy forward selection: grow the set while performance improves
    SequentialForward { max_features: Option<usize> },
    /// Greedy backward elimination: shrink the set while performance improves
    SequentialBackward { min_features: usize },
    /// Evaluate random subsets, keeping each feature with probability `prob`
    Random { iters: usize, prob: f64 },
}

/// Result of a feature-selection run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatSelResult {
    /// Best feature subset found
    pub best_features: Vec<String>,
    /// Its aggregated resampling score
    pub best_score: f64,
    /// The full optimization path of evaluated subsets
    pub opt_path: OptPath,
}

/// Select a feature subset by resampled evaluation
pub fn select_features(
    learner: &dyn Learner,
    task: &Task,
    resampling: &Resampling,
    measure: Measure,
    strategy: &FeatSelStrategy,
    random_state: Option<u64>,
    exec: &ExecConfig,
) -> Result<FeatSelResult> {
    let all_features = task.feature_names();
    if all_features.is_empty() {
        return Err(MlexpError::FeatSelError(
            "task has no features to select from".to_string(),
        ));
    }

    match strategy {
        FeatSelStrategy::SequentialForward { max_features } => {
            sequential_forward(learner, task, resampling, measure, *max_features, exec)
        }
        FeatSelStrategy::SequentialBackward { min_features } => {
            sequential_backward(learner, task, resampling, measure, *min_features, exec)
        }
        FeatSelStrategy::Random { iters, prob } => {
            if *iters == 0 {
                return Err(MlexpError::FeatSelError(
                    "random search needs at least one iteration".to_string(),
                ));
            }
            if !(*prob > 0.0 && *prob <= 1.0) {
                return Err(MlexpError::FeatSelError(format!(
                    "keep probability must lie in (0, 1], got {}",
                    prob
                )));
            }
            random_subsets(learner, task, resampling, measure, *iters, *prob, random_state, exec)
        }
    }
}

/// Evaluate one batch of keep-sets, appending each outcome to the path.
/// Returns `(features, score)` per candidate in input order.
fn evaluate_batch(
    learner: &dyn Learner,
    task: &Task,
    resampling: &Resampling,
    measure: Measure,
    candidates: Vec<Vec<String>>,
    path: &mut OptPath,
    exec: &ExecConfig,
) -> Result<Vec<(Vec<String>, f64)>> {
    let all_features = task.feature_names();
    let inner_backend = if exec.active_at(ParallelLevel::FeatSel) {
        Backend::Sequential
    } else {
        exec.backend.clone()
    };

    let evals: Vec<(Vec<String>, f64, f64, Option<String>)> = parallel_map(
        exec,
        ParallelLevel::FeatSel,
        candidates,
        |cfg, keep| {
            let start = Instant::now();
            let inner = ExecConfig {
                backend: inner_backend.clone(),
                level: exec.level,
                worker: cfg.clone(),
            };
            let keep_refs: Vec<&str> = keep.iter().map(String::as_str).collect();
            let outcome = task
                .keep_features(&keep_refs)
                .and_then(|view| resample(learner, &view, resampling, measure, &inner));
            let secs = start.elapsed().as_secs_f64();
            match outcome {
                Ok(rr) => (keep, rr.aggr.mean, secs, None),
                Err(e) => (keep, f64::NAN, secs, Some(e.to_string())),
            }
        },
    );

    let mut scored = Vec::with_capacity(evals.len());
    for (keep, score, secs, error) in evals {
        if let Some(msg) = &error {
            match exec.worker.on_learner_error {
                ErrorPolicy::Fail => return Err(MlexpError::FeatSelError(msg.clone())),
                ErrorPolicy::Warn => {
                    warn!(error = %msg, "feature subset failed, logging as missing")
                }
                ErrorPolicy::Quiet => {}
            }
        }
        path.push(subset_config(&all_features, &keep), score, secs, error);
        scored.push((keep, score));
    }
    Ok(scored)
}

fn subset_config(all_features: &[String], keep: &[String]) -> ParamConfig {
    all_features
        .iter()
        .map(|f| {
            let on = keep.contains(f);
            (f.clone(), ParamValue::Int(on as i64))
        })
        .collect()
}

fn improves(candidate: f64, incumbent: f64, minimize: bool) -> bool {
    if !candidate.is_finite() {
        return false;
    }
    if !incumbent.is_finite() {
        return true;
    }
    if minimize {
        candidate < incumbent
    } else {
        candidate > incumbent
    }
}

fn sequential_forward(
    learner: &dyn Learner,
    task: &Task,
    resampling: &Resampling,
    measure: Measure,
    max_features: Option<usize>,
    exec: &ExecConfig,
) -> Result<FeatSelResult> {
    let all_features = task.feature_names();
    let mut path = OptPath::new(measure.minimize());

    // featureless baseline is the starting incumbent
    let mut current: Vec<String> = Vec::new();
    let baseline = evaluate_batch(
        learner,
        task,
        resampling,
        measure,
        vec![current.clone()],
        &mut path,
        exec,
    )?;
    let mut best_score = baseline[0].1;

    loop {
        if let Some(max) = max_features {
            if current.len() >= max {
                break;
            }
        }
        let remaining: Vec<&String> =
            all_features.iter().filter(|f| !current.contains(f)).collect();
        if remaining.is_empty() {
            break;
        }

        let candidates: Vec<Vec<String>> = remaining
            .iter()
            .map(|f| {
                let mut set = current.clone();
                set.push((*f).clone());
                set
            })
            .collect();
        let scored =
            evaluate_batch(learner, task, resampling, measure, candidates, &mut path, exec)?;

        let winner = scored.into_iter().reduce(|a, b| {
            if improves(b.1, a.1, measure.minimize()) {
                b
            } else {
                a
            }
        });
        match winner {
            Some((set, score)) if improves(score, best_score, measure.minimize()) => {
                info!(features = ?set, score, "forward selection accepted a feature");
                current = set;
                best_score = score;
            }
            _ => break,
        }
    }

    Ok(FeatSelResult {
        best_features: current,
        best_score,
        opt_path: path,
    })
}

fn sequential_backward(
    learner: &dyn Learner,
    task: &Task,
    resampling: &Resampling,
    measure: Measure,
    min_features: usize,
    exec: &ExecConfig,
) -> Result<FeatSelResult> {
    let all_features = task.feature_names();
    if min_features > all_features.len() {
        return Err(MlexpError::FeatSelError(format!(
            "min_features ({}) exceeds the number of features ({})",
            min_features,
            all_features.len()
        )));
    }

    let mut path = OptPath::new(measure.minimize());
    let mut current = all_features.clone();
    let full = evaluate_batch(
        learner,
        task,
        resampling,
        measure,
        vec![current.clone()],
        &mut path,
        exec,
    )?;
    let mut best_score = full[0].1;

    while current.len() > min_features {
        let candidates: Vec<Vec<String>> = current
            .iter()
            .map(|drop| current.iter().filter(|f| *f != drop).cloned().collect())
            .collect();
        let scored =
            evaluate_batch(learner, task, resampling, measure, candidates, &mut path, exec)?;

        let winner = scored.into_iter().reduce(|a, b| {
            if improves(b.1, a.1, measure.minimize()) {
                b
            } else {
                a
            }
        });
        match winner {
            Some((set, score)) if improves(score, best_score, measure.minimize()) => {
                info!(features = ?set, score, "backward elimination dropped a feature");
                current = set;
                best_score = score;
            }
            _ => break,
        }
    }

    Ok(FeatSelResult {
        best_features: current,
        best_score,
        opt_path: path,
    })
}

#[allow(clippy::too_many_arguments)]
fn random_subsets(
    learner: &dyn Learner,
    task: &Task,
    resampling: &Resampling,
    measure: Measure,
    iters: usize,
    prob: f64,
    random_state: Option<u64>,
    exec: &ExecConfig,
) -> Result<FeatSelResult> {
    let all_features = task.feature_names();
    let mut rng = match random_state {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };

    let candidates: Vec<Vec<String>> = (0..iters)
        .map(|_| {
            let mut keep: Vec<String> = all_features
                .iter()
                .filter(|_| rng.gen::<f64>() < prob)
                .cloned()
                .collect();
            if keep.is_empty() {
                // a subset must contain at least one feature
                let pick = rng.gen_range(0..all_features.len());
                keep.push(all_features[pick].clone());
            }
            keep
        })
        .collect();

    let mut path = OptPath::new(measure.minimize());
    let scored = evaluate_batch(learner, task, resampling, measure, candidates, &mut path, exec)?;

    let mut best: Option<(Vec<String>, f64)> = None;
    for (set, score) in scored {
        let take = match &best {
            None => score.is_finite(),
            Some((_, incumbent)) => improves(score, *incumbent, measure.minimize()),
        };
        if take {
            best = Some((set, score));
        }
    }

    let (best_features, best_score) = best.ok_or_else(|| {
        MlexpError::FeatSelError("no feature subset evaluated successfully".to_string())
    })?;

    Ok(FeatSelResult {
        best_features,
        best_score,
        opt_path: path,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learner::RidgeRegression;
    use crate::task::TaskBuilder;
    use polars::prelude::*;

    /// Target depends on `signal` only; `noise` is irrelevant.
    fn signal_noise_task() -> Task {
        let signal: Vec<f64> = (0..40).map(|i| i as f64 / 4.0).collect();
        let noise: Vec<f64> = (0..40).map(|i| ((i * 7919) % 13) as f64).collect();
        let y: Vec<f64> = signal.iter().map(|v| 3.0 * v).collect();
        let df = df!("signal" => &signal, "noise" => &noise, "y" => &y).unwrap();
        TaskBuilder::regr(df, "y").build().unwrap()
    }

    #[test]
    fn test_forward_selection_finds_signal() {
        let task = signal_noise_task();
        let result = select_features(
            &RidgeRegression::new(1e-6),
            &task,
            &Resampling::cv(4).with_random_state(42),
            Measure::Mse,
            &FeatSelStrategy::SequentialForward { max_features: None },
            None,
            &ExecConfig::sequential(),
        )
        .unwrap();
        assert!(result.best_features.contains(&"signal".to_string()));
        assert!(result.best_score.is_finite());
        // baseline plus at least one growth round was logged
        assert!(result.opt_path.len() >= 3);
    }

    #[test]
    fn test_backward_respects_min_features() {
        let task = signal_noise_task();
        let result = select_features(
            &RidgeRegression::new(1e-6),
            &task,
            &Resampling::cv(4).with_random_state(42),
            Measure::Mse,
            &FeatSelStrategy::SequentialBackward { min_features: 1 },
            None,
            &ExecConfig::sequential(),
        )
        .unwrap();
        assert!(!result.best_features.is_empty());
    }

    #[test]
    fn test_random_subsets_budget() {
        let task = signal_noise_task();
        let result = select_features(
            &RidgeRegression::new(1e-6),
            &task,
            &Resampling::cv(3).with_random_state(1),
            Measure::Mse,
            &FeatSelStrategy::Random { iters: 5, prob: 0.5 },
            Some(99),
            &ExecConfig::sequential(),
        )
        .unwrap();
        assert_eq!(result.opt_path.len(), 5);
        assert!(!result.best_features.is_empty());
    }

    #[test]
    fn test_invalid_random_config() {
        let task = signal_noise_task();
        let learner = RidgeRegression::new(0.1);
        let exec = ExecConfig::sequential();
        let resampling = Resampling::cv(2);
        assert!(select_features(
            &learner,
            &task,
            &resampling,
            Measure::Mse,
            &FeatSelStrategy::Random { iters: 0, prob: 0.5 },
            None,
            &exec,
        )
        .is_err());
        assert!(select_features(
            &learner,
            &task,
            &resampling,
            Measure::Mse,
            &FeatSelStrategy::Random { iters: 3, prob: 1.5 },
            None,
            &exec,
        )
        .is_err());
    }
}
