//! Resampling descriptions and fold generation
//!
//! A [`Resampling`] is a description of a train/test splitting scheme;
//! [`Resampling::instantiate`] materializes it against a task into concrete
//! index sets. Blocking is honored at this layer: observations sharing a
//! blocking value are assigned to folds as one unit, so a block never
//! straddles a train/test boundary. Stratification preserves class ratios
//! per fold and cannot be combined with blocking.

mod driver;

pub use driver::{resample, ResampleResult};

use crate::error::{MlexpError, Result};
use crate::task::{Task, TaskType};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Resampling scheme
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ResampleDesc {
    /// K-fold cross-validation
    CV { folds: usize },
    /// Repeated K-fold cross-validation
    RepCV { folds: usize, reps: usize },
    /// Single train/test split; `split` is the training fraction
    Holdout { split: f64 },
    /// Repeated random train/test splits
    Subsample { iters: usize, split: f64 },
    /// Bootstrap: sample units with replacement, test on out-of-bag
    Bootstrap { iters: usize },
    /// Leave-one-out (one unit out per iteration)
    LOO,
}

/// A single train/test split
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResampleSplit {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
    pub iter: usize,
}

/// Materialized resampling: the full set of splits for one task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResampleInstance {
    pub splits: Vec<ResampleSplit>,
}

/// A resampling description plus instantiation options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resampling {
    desc: ResampleDesc,
    random_state: Option<u64>,
    stratify: bool,
}

impl Resampling {
    /// Create from a description
    pub fn new(desc: ResampleDesc) -> Self {
        Self {
            desc,
            random_state: None,
            stratify: false,
        }
    }

    /// K-fold cross-validation
    pub fn cv(folds: usize) -> Self {
        Self::new(ResampleDesc::CV { folds })
    }

    /// Repeated K-fold cross-validation
    pub fn rep_cv(folds: usize, reps: usize) -> Self {
        Self::new(ResampleDesc::RepCV { folds, reps })
    }

    /// Single holdout split
    pub fn holdout(split: f64) -> Self {
        Self::new(ResampleDesc::Holdout { split })
    }

    /// Repeated random subsampling
    pub fn subsample(iters: usize, split: f64) -> Self {
        Self::new(ResampleDesc::Subsample { iters, split })
    }

    /// Bootstrap with out-of-bag testing
    pub fn bootstrap(iters: usize) -> Self {
        Self::new(ResampleDesc::Bootstrap { iters })
    }

    /// Leave-one-out
    pub fn loo() -> Self {
        Self::new(ResampleDesc::LOO)
    }

    /// Seed for reproducible instantiation
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Preserve class ratios per fold (classification, no blocking)
    pub fn with_stratify(mut self, stratify: bool) -> Self {
        self.stratify = stratify;
        self
    }

    fn rng(&self, offset: u64) -> ChaCha8Rng {
        match self.random_state {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed.wrapping_add(offset)),
            None => ChaCha8Rng::from_entropy(),
        }
    }

    /// Materialize train/test splits against a task
    pub fn instantiate(&self, task: &Task) -> Result<ResampleInstance> {
        if self.stratify {
            if task.task_type() != TaskType::Classif {
                return Err(MlexpError::ConfigError(
                    "stratification requires a classification task".to_string(),
                ));
            }
            if task.blocking().is_some() {
                return Err(MlexpError::ConfigError(
                    "stratification cannot be combined with blocking".to_string(),
                ));
            }
        }

        let units = observation_units(task);
        let splits = match self.desc {
            ResampleDesc::CV { folds } => {
                self.check_folds(folds, units.len())?;
                if self.stratify {
                    stratified_k_fold(task, folds, &mut self.rng(0), 0)?
                } else {
                    k_fold(&units, folds, &mut self.rng(0), 0)
                }
            }
            ResampleDesc::RepCV { folds, reps } => {
                self.check_folds(folds, units.len())?;
                if reps == 0 {
                    return Err(MlexpError::ConfigError(
                        "repeated CV needs at least one repetition".to_string(),
                    ));
                }
                let mut all = Vec::with_capacity(folds * reps);
                for rep in 0..reps {
                    let mut rng = self.rng(rep as u64);
                    let batch = if self.stratify {
                        stratified_k_fold(task, folds, &mut rng, rep * folds)?
                    } else {
                        k_fold(&units, folds, &mut rng, rep * folds)
                    };
                    all.extend(batch);
                }
                all
            }
            ResampleDesc::Holdout { split } => {
                check_split(split)?;
                vec![holdout_split(&units, split, task.nrow(), &mut self.rng(0), 0)?]
            }
            ResampleDesc::Subsample { iters, split } => {
                check_split(split)?;
                if iters == 0 {
                    return Err(MlexpError::ConfigError(
                        "subsampling needs at least one iteration".to_string(),
                    ));
                }
                (0..iters)
                    .map(|i| {
                        holdout_split(&units, split, task.nrow(), &mut self.rng(i as u64), i)
                    })
                    .collect::<Result<Vec<_>>>()?
            }
            ResampleDesc::Bootstrap { iters } => {
                if iters == 0 {
                    return Err(MlexpError::ConfigError(
                        "bootstrap needs at least one iteration".to_string(),
                    ));
                }
                (0..iters)
                    .map(|i| bootstrap_split(&units, &mut self.rng(i as u64), i))
                    .collect::<Result<Vec<_>>>()?
            }
            ResampleDesc::LOO => leave_one_out(&units),
        };

        Ok(ResampleInstance { splits })
    }

    fn check_folds(&self, folds: usize, n_units: usize) -> Result<()> {
        if folds < 2 {
            return Err(MlexpError::ConfigError(
                "cross-validation needs at least 2 folds".to_string(),
            ));
        }
        if n_units < folds {
            return Err(MlexpError::ConfigError(format!(
                "number of resampling units ({}) must be >= folds ({})",
                n_units, folds
            )));
        }
        Ok(())
    }
}

fn check_split(split: f64) -> Result<()> {
    if !(split > 0.0 && split < 1.0) {
        return Err(MlexpError::ConfigError(format!(
            "training fraction must lie in (0, 1), got {}",
            split
        )));
    }
    Ok(())
}

/// The units resampling moves around: single observations, or whole blocks
/// when the task carries a blocking factor.
fn observation_units(task: &Task) -> Vec<Vec<usize>> {
    match task.blocking() {
        None => (0..task.nrow()).map(|i| vec![i]).collect(),
        Some(blocking) => {
            let mut groups: BTreeMap<&String, Vec<usize>> = BTreeMap::new();
            for (i, value) in blocking.iter().enumerate() {
                groups.entry(value).or_default().push(i);
            }
            groups.into_values().collect()
        }
    }
}

fn k_fold(
    units: &[Vec<usize>],
    folds: usize,
    rng: &mut ChaCha8Rng,
    iter_offset: usize,
) -> Vec<ResampleSplit> {
    let mut order: Vec<usize> = (0..units.len()).collect();
    order.shuffle(rng);

    let mut fold_units: Vec<Vec<usize>> = vec![Vec::new(); folds];
    for (i, &u) in order.iter().enumerate() {
        fold_units[i % folds].push(u);
    }

    (0..folds)
        .map(|k| {
            let mut test: Vec<usize> = fold_units[k]
                .iter()
                .flat_map(|&u| units[u].iter().copied())
                .collect();
            let mut train: Vec<usize> = fold_units
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != k)
                .flat_map(|(_, us)| us.iter().flat_map(|&u| units[u].iter().copied()))
                .collect();
            train.sort_unstable();
            test.sort_unstable();
            ResampleSplit {
                train,
                test,
                iter: iter_offset + k,
            }
        })
        .collect()
}

fn stratified_k_fold(
    task: &Task,
    folds: usize,
    rng: &mut ChaCha8Rng,
    iter_offset: usize,
) -> Result<Vec<ResampleSplit>> {
    let y = task.target_values()?;
    let mut class_indices: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
    for (i, &v) in y.iter().enumerate() {
        class_indices.entry(v.round() as i64).or_default().push(i);
    }

    for indices in class_indices.values_mut() {
        indices.shuffle(rng);
    }

    let mut fold_members: Vec<Vec<usize>> = vec![Vec::new(); folds];
    for indices in class_indices.values() {
        for (i, &idx) in indices.iter().enumerate() {
            fold_members[i % folds].push(idx);
        }
    }

    Ok((0..folds)
        .map(|k| {
            let mut test = fold_members[k].clone();
            let mut train: Vec<usize> = fold_members
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != k)
                .flat_map(|(_, m)| m.iter().copied())
                .collect();
            train.sort_unstable();
            test.sort_unstable();
            ResampleSplit {
                train,
                test,
                iter: iter_offset + k,
            }
        })
        .collect())
}

fn holdout_split(
    units: &[Vec<usize>],
    split: f64,
    n_obs: usize,
    rng: &mut ChaCha8Rng,
    iter: usize,
) -> Result<ResampleSplit> {
    let mut order: Vec<usize> = (0..units.len()).collect();
    order.shuffle(rng);

    let target_train = (n_obs as f64 * split).round() as usize;
    let mut train = Vec::new();
    let mut test = Vec::new();
    for &u in &order {
        if train.len() < target_train {
            train.extend(units[u].iter().copied());
        } else {
            test.extend(units[u].iter().copied());
        }
    }
    if train.is_empty() || test.is_empty() {
        return Err(MlexpError::ConfigError(format!(
            "training fraction {} leaves an empty train or test set",
            split
        )));
    }
    train.sort_unstable();
    test.sort_unstable();
    Ok(ResampleSplit { train, test, iter })
}

fn bootstrap_split(
    units: &[Vec<usize>],
    rng: &mut ChaCha8Rng,
    iter: usize,
) -> Result<ResampleSplit> {
    let n_units = units.len();
    let mut drawn = vec![false; n_units];
    let mut train = Vec::new();
    for _ in 0..n_units {
        let u = rng.gen_range(0..n_units);
        drawn[u] = true;
        train.extend(units[u].iter().copied());
    }
    let mut test: Vec<usize> = (0..n_units)
        .filter(|&u| !drawn[u])
        .flat_map(|u| units[u].iter().copied())
        .collect();
    if test.is_empty() {
        return Err(MlexpError::ConfigError(
            "bootstrap draw left no out-of-bag observations".to_string(),
        ));
    }
    train.sort_unstable();
    test.sort_unstable();
    Ok(ResampleSplit { train, test, iter })
}

fn leave_one_out(units: &[Vec<usize>]) -> Vec<ResampleSplit> {
    (0..units.len())
        .map(|k| {
            let test = units[k].clone();
            let mut train: Vec<usize> = units
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != k)
                .flat_map(|(_, u)| u.iter().copied())
                .collect();
            train.sort_unstable();
            ResampleSplit {
                train,
                test,
                iter: k,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskBuilder;
    use polars::prelude::*;

    fn regr_task(n: usize) -> Task {
        let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let y: Vec<f64> = (0..n).map(|i| 2.0 * i as f64).collect();
        let df = df!("x" => &x, "y" => &y).unwrap();
        TaskBuilder::regr(df, "y").build().unwrap()
    }

    fn classif_task_balanced() -> Task {
        let x: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let y: Vec<&str> = (0..20).map(|i| if i % 2 == 0 { "a" } else { "b" }).collect();
        let df = df!("x" => &x, "y" => &y).unwrap();
        TaskBuilder::classif(df, "y").build().unwrap()
    }

    #[test]
    fn test_cv_covers_every_observation_once() {
        let task = regr_task(100);
        let inst = Resampling::cv(5).with_random_state(42).instantiate(&task).unwrap();
        assert_eq!(inst.splits.len(), 5);
        let mut all_test: Vec<usize> = inst
            .splits
            .iter()
            .flat_map(|s| s.test.iter().copied())
            .collect();
        all_test.sort_unstable();
        assert_eq!(all_test, (0..100).collect::<Vec<_>>());
        for split in &inst.splits {
            assert_eq!(split.train.len() + split.test.len(), 100);
        }
    }

    #[test]
    fn test_cv_too_few_observations() {
        let task = regr_task(3);
        assert!(Resampling::cv(5).instantiate(&task).is_err());
        assert!(Resampling::cv(1).instantiate(&task).is_err());
    }

    #[test]
    fn test_blocking_keeps_blocks_together() {
        let n = 24;
        let x: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let y: Vec<f64> = (0..n).map(|i| i as f64).collect();
        let blocks: Vec<String> = (0..n).map(|i| format!("b{}", i / 4)).collect();
        let df = df!("x" => &x, "y" => &y).unwrap();
        let task = TaskBuilder::regr(df, "y")
            .with_blocking(blocks.clone())
            .build()
            .unwrap();

        let inst = Resampling::cv(3).with_random_state(7).instantiate(&task).unwrap();
        for split in &inst.splits {
            for block in ["b0", "b1", "b2", "b3", "b4", "b5"] {
                let members: Vec<usize> =
                    (0..n).filter(|&i| blocks[i] == block).collect();
                let in_test = members.iter().filter(|m| split.test.contains(m)).count();
                assert!(
                    in_test == 0 || in_test == members.len(),
                    "block {} straddles the fold boundary",
                    block
                );
            }
        }
    }

    #[test]
    fn test_stratified_cv_balances_classes() {
        let task = classif_task_balanced();
        let inst = Resampling::cv(5)
            .with_stratify(true)
            .with_random_state(1)
            .instantiate(&task)
            .unwrap();
        let y = task.target_values().unwrap();
        for split in &inst.splits {
            let a = split.test.iter().filter(|&&i| y[i] == 0.0).count();
            let b = split.test.iter().filter(|&&i| y[i] == 1.0).count();
            assert_eq!(a, 2);
            assert_eq!(b, 2);
        }
    }

    #[test]
    fn test_stratify_rejects_regression_and_blocking() {
        let task = regr_task(10);
        assert!(Resampling::cv(2).with_stratify(true).instantiate(&task).is_err());

        let df = df!("x" => &[1.0, 2.0], "y" => &["a", "b"]).unwrap();
        let blocked = TaskBuilder::classif(df, "y")
            .with_blocking(vec!["g1".to_string(), "g2".to_string()])
            .build()
            .unwrap();
        assert!(Resampling::cv(2)
            .with_stratify(true)
            .instantiate(&blocked)
            .is_err());
    }

    #[test]
    fn test_holdout_split_sizes() {
        let task = regr_task(100);
        let inst = Resampling::holdout(0.7)
            .with_random_state(3)
            .instantiate(&task)
            .unwrap();
        assert_eq!(inst.splits.len(), 1);
        assert_eq!(inst.splits[0].train.len(), 70);
        assert_eq!(inst.splits[0].test.len(), 30);
        assert!(Resampling::holdout(1.5).instantiate(&task).is_err());
    }

    #[test]
    fn test_subsample_iteration_count() {
        let task = regr_task(50);
        let inst = Resampling::subsample(4, 0.8)
            .with_random_state(9)
            .instantiate(&task)
            .unwrap();
        assert_eq!(inst.splits.len(), 4);
    }

    #[test]
    fn test_bootstrap_oob_disjoint_from_train() {
        let task = regr_task(60);
        let inst = Resampling::bootstrap(3)
            .with_random_state(11)
            .instantiate(&task)
            .unwrap();
        for split in &inst.splits {
            for t in &split.test {
                assert!(!split.train.contains(t));
            }
            assert_eq!(split.train.len(), 60);
        }
    }

    #[test]
    fn test_loo() {
        let task = regr_task(10);
        let inst = Resampling::loo().instantiate(&task).unwrap();
        assert_eq!(inst.splits.len(), 10);
        for split in &inst.splits {
            assert_eq!(split.test.len(), 1);
            assert_eq!(split.train.len(), 9);
        }
    }

    #[test]
    fn test_rep_cv_count_and_iter_indices() {
        let task = regr_task(30);
        let inst = Resampling::rep_cv(3, 2)
            .with_random_state(5)
            .instantiate(&task)
            .unwrap();
        assert_eq!(inst.splits.len(), 6);
        let iters: Vec<usize> = inst.splits.iter().map(|s| s.iter).collect();
        assert_eq!(iters, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_seeded_instantiation_is_reproducible() {
        let task = regr_task(40);
        let a = Resampling::cv(4).with_random_state(21).instantiate(&task).unwrap();
        let b = Resampling::cv(4).with_random_state(21).instantiate(&task).unwrap();
        for (sa, sb) in a.splits.iter().zip(b.splits.iter()) {
            assert_eq!(sa.test, sb.test);
        }
    }
}
