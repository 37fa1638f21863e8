//! Parallel experiment dispatch
//!
//! Resampling, tuning and feature-selection drivers hand their iterations
//! to [`parallel_map`]. The experiment configuration a worker must observe
//! (notably the on-learner-error policy) travels with the dispatch: it is
//! serialized once at the call site and re-deserialized on each worker
//! thread before its first item runs. Workers therefore never read ambient
//! state, so sequential and parallel runs cannot diverge in behavior.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// What to do when a learner fails inside a driver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ErrorPolicy {
    /// Abort the whole run with the learner error
    #[default]
    Fail,
    /// Log a warning and score the iteration as missing
    Warn,
    /// Score the iteration as missing, silently
    Quiet,
}

/// Logical phase requesting parallelism
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParallelLevel {
    Resample,
    Tune,
    FeatSel,
}

/// The slice of experiment configuration every worker must observe
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct WorkerConfig {
    /// Policy applied when a learner errors during train or predict
    pub on_learner_error: ErrorPolicy,
    /// Whether workers log per-iteration progress
    pub log_progress: bool,
}

/// Execution backend
#[derive(Debug, Clone, Default)]
pub enum Backend {
    /// Run iterations in the calling thread
    #[default]
    Sequential,
    /// Dispatch onto a rayon thread pool
    Multicore {
        /// Pool size; `None` uses all available cores
        n_threads: Option<usize>,
    },
}

/// Execution configuration for a whole experiment
#[derive(Debug, Clone, Default)]
pub struct ExecConfig {
    /// Backend to dispatch onto
    pub backend: Backend,
    /// Restrict parallelism to one level; `None` parallelizes every level
    pub level: Option<ParallelLevel>,
    /// Configuration propagated to every worker
    pub worker: WorkerConfig,
}

impl ExecConfig {
    /// Sequential execution with default worker configuration
    pub fn sequential() -> Self {
        Self::default()
    }

    /// Multicore execution using all available cores
    pub fn multicore() -> Self {
        Self {
            backend: Backend::Multicore { n_threads: None },
            ..Self::default()
        }
    }

    /// Limit the multicore pool size. Switches the backend to multicore if
    /// it was sequential.
    pub fn with_threads(mut self, n: usize) -> Self {
        self.backend = Backend::Multicore { n_threads: Some(n) };
        self
    }

    /// Only parallelize at the given level
    pub fn at_level(mut self, level: ParallelLevel) -> Self {
        self.level = Some(level);
        self
    }

    /// Set the on-learner-error policy propagated to workers
    pub fn on_learner_error(mut self, policy: ErrorPolicy) -> Self {
        self.worker.on_learner_error = policy;
        self
    }

    /// Enable per-iteration progress logging in workers
    pub fn with_progress(mut self, log_progress: bool) -> Self {
        self.worker.log_progress = log_progress;
        self
    }

    /// Whether dispatch at the given level runs in parallel
    pub fn active_at(&self, level: ParallelLevel) -> bool {
        matches!(self.backend, Backend::Multicore { .. })
            && self.level.map_or(true, |l| l == level)
    }
}

/// Map a worker function over items, parallel when the backend is active at
/// `level`. The worker function receives the propagated [`WorkerConfig`]
/// alongside each item.
pub fn parallel_map<T, U, F>(exec: &ExecConfig, level: ParallelLevel, items: Vec<T>, f: F) -> Vec<U>
where
    T: Send,
    U: Send,
    F: Fn(&WorkerConfig, T) -> U + Send + Sync,
{
    if !exec.active_at(level) {
        let cfg = exec.worker.clone();
        return items.into_iter().map(|item| f(&cfg, item)).collect();
    }

    // Serialize here, deserialize per worker thread: workers observe the
    // launcher's configuration, never ambient state.
    let wire = match serde_json::to_string(&exec.worker) {
        Ok(w) => w,
        Err(e) => {
            warn!(error = %e, "worker config failed to serialize, falling back to sequential");
            let cfg = exec.worker.clone();
            return items.into_iter().map(|item| f(&cfg, item)).collect();
        }
    };

    let custom_pool = match exec.backend {
        Backend::Multicore {
            n_threads: Some(n),
        } => match rayon::ThreadPoolBuilder::new().num_threads(n).build() {
            Ok(pool) => Some(pool),
            Err(e) => {
                warn!(error = %e, "thread pool construction failed, falling back to sequential");
                let cfg = exec.worker.clone();
                return items.into_iter().map(|item| f(&cfg, item)).collect();
            }
        },
        _ => None,
    };

    let run = || {
        items
            .into_par_iter()
            .map_init(
                || {
                    serde_json::from_str::<WorkerConfig>(&wire)
                        .unwrap_or_else(|_| exec.worker.clone())
                },
                |cfg, item| f(cfg, item),
            )
            .collect()
    };

    match custom_pool {
        Some(pool) => pool.install(run),
        None => run(),
    }
}
