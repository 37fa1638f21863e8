//! Search strategies for hyperparameter tuning
//!
//! A strategy proposes batches of configurations; the tuning driver
//! evaluates each batch (possibly in parallel) and records outcomes in the
//! optimization path before asking for the next batch. Advanced external
//! optimizers plug in through the same trait.

use crate::tune::{OptPath, ParamConfig, ParamSet};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// A pluggable configuration-proposal strategy
pub trait SearchStrategy: Send {
    /// Propose the next batch of configurations, or `None` when exhausted.
    /// The optimization path holds every outcome recorded so far.
    fn propose(&mut self, param_set: &ParamSet, path: &OptPath) -> Option<Vec<ParamConfig>>;
}

/// Exhaustive cross-product search at a fixed per-parameter resolution
#[derive(Debug, Clone)]
pub struct GridSearch {
    resolution: usize,
    exhausted: bool,
}

impl GridSearch {
    pub fn new(resolution: usize) -> Self {
        Self {
            resolution: resolution.max(1),
            exhausted: false,
        }
    }
}

impl SearchStrategy for GridSearch {
    fn propose(&mut self, param_set: &ParamSet, _path: &OptPath) -> Option<Vec<ParamConfig>> {
        if self.exhausted {
            return None;
        }
        self.exhausted = true;
        Some(param_set.grid(self.resolution))
    }
}

/// Uniform random search with a fixed evaluation budget
pub struct RandomSearch {
    max_iters: usize,
    batch_size: usize,
    proposed: usize,
    rng: ChaCha8Rng,
}

impl RandomSearch {
    pub fn new(max_iters: usize) -> Self {
        Self {
            max_iters,
            batch_size: 1,
            proposed: 0,
            rng: ChaCha8Rng::from_entropy(),
        }
    }

    /// Propose this many configurations per batch so they can be evaluated
    /// in parallel
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Seed for reproducible proposals
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.rng = ChaCha8Rng::seed_from_u64(seed);
        self
    }
}

impl SearchStrategy for RandomSearch {
    fn propose(&mut self, param_set: &ParamSet, _path: &OptPath) -> Option<Vec<ParamConfig>> {
        let remaining = self.max_iters.saturating_sub(self.proposed);
        if remaining == 0 {
            return None;
        }
        let count = remaining.min(self.batch_size);
        self.proposed += count;
        Some(
            (0..count)
                .map(|_| param_set.sample_config(&mut self.rng))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_param_set() -> ParamSet {
        ParamSet::new()
            .float("a", 0.0, 1.0)
            .categorical("b", vec!["x", "y"])
    }

    #[test]
    fn test_grid_search_proposes_once() {
        let ps = two_param_set();
        let path = OptPath::new(true);
        let mut grid = GridSearch::new(3);
        let batch = grid.propose(&ps, &path).unwrap();
        assert_eq!(batch.len(), 6);
        assert!(grid.propose(&ps, &path).is_none());
    }

    #[test]
    fn test_random_search_budget() {
        let ps = two_param_set();
        let path = OptPath::new(true);
        let mut search = RandomSearch::new(7).with_batch_size(3);
        let mut total = 0;
        while let Some(batch) = search.propose(&ps, &path) {
            total += batch.len();
        }
        assert_eq!(total, 7);
    }

    #[test]
    fn test_random_search_reproducible() {
        let ps = two_param_set();
        let path = OptPath::new(true);
        let mut s1 = RandomSearch::new(5).with_random_state(13);
        let mut s2 = RandomSearch::new(5).with_random_state(13);
        while let (Some(b1), Some(b2)) = (s1.propose(&ps, &path), s2.propose(&ps, &path)) {
            assert_eq!(b1, b2);
        }
    }
}
