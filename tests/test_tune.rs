//! End-to-end hyperparameter tuning tests

use mlexp::learner::{Learner, RidgeRegression};
use mlexp::measure::Measure;
use mlexp::parallel::{ExecConfig, ParallelLevel};
use mlexp::resample::Resampling;
use mlexp::task::{Task, TaskBuilder};
use mlexp::tune::{tune, GridSearch, ParamConfig, ParamSet, RandomSearch};
use mlexp::{MlexpError, Result};
use polars::prelude::*;

fn noisy_linear_task() -> Task {
    // y = 4x + small deterministic wobble
    let x: Vec<f64> = (0..50).map(|i| i as f64 / 5.0).collect();
    let y: Vec<f64> = x
        .iter()
        .enumerate()
        .map(|(i, v)| 4.0 * v + ((i * 31) % 7) as f64 * 0.01)
        .collect();
    let df = df!("x" => &x, "y" => &y).unwrap();
    TaskBuilder::regr(df, "y").build().unwrap()
}

fn ridge_factory(config: &ParamConfig) -> Result<Box<dyn Learner>> {
    let lambda = config
        .get("lambda")
        .and_then(|v| v.as_float())
        .ok_or_else(|| MlexpError::TuneError("missing lambda".to_string()))?;
    Ok(Box::new(RidgeRegression::new(lambda)))
}

#[test]
fn test_grid_search_finds_low_penalty() {
    let task = noisy_linear_task();
    let params = ParamSet::new().log_float("lambda", 1e-8, 1e4);
    let mut strategy = GridSearch::new(7);
    let result = tune(
        ridge_factory,
        &task,
        &Resampling::cv(5).with_random_state(1),
        Measure::Rmse,
        &params,
        &mut strategy,
        &ExecConfig::sequential(),
    )
    .unwrap();
    assert_eq!(result.opt_path.len(), 7);
    let best_lambda = result.best_config["lambda"].as_float().unwrap();
    assert!(best_lambda < 1.0, "best lambda was {}", best_lambda);
}

#[test]
fn test_random_search_respects_budget_and_seed() {
    let task = noisy_linear_task();
    let params = ParamSet::new().log_float("lambda", 1e-8, 1e4);
    let resampling = Resampling::cv(3).with_random_state(1);
    let exec = ExecConfig::sequential();

    let run = |seed: u64| {
        let mut strategy = RandomSearch::new(8).with_random_state(seed);
        tune(
            ridge_factory,
            &task,
            &resampling,
            Measure::Mse,
            &params,
            &mut strategy,
            &exec,
        )
        .unwrap()
    };
    let a = run(21);
    let b = run(21);
    assert_eq!(a.opt_path.len(), 8);
    assert_eq!(a.best_config, b.best_config);
    assert_eq!(a.best_score, b.best_score);
}

#[test]
fn test_parallel_tune_matches_sequential() {
    let task = noisy_linear_task();
    let params = ParamSet::new().log_float("lambda", 1e-6, 1e2);
    let resampling = Resampling::cv(3).with_random_state(9);

    let mut g1 = GridSearch::new(5);
    let seq = tune(
        ridge_factory,
        &task,
        &resampling,
        Measure::Mse,
        &params,
        &mut g1,
        &ExecConfig::sequential(),
    )
    .unwrap();

    let mut g2 = GridSearch::new(5);
    let par = tune(
        ridge_factory,
        &task,
        &resampling,
        Measure::Mse,
        &params,
        &mut g2,
        &ExecConfig::multicore()
            .with_threads(2)
            .at_level(ParallelLevel::Tune),
    )
    .unwrap();

    assert_eq!(seq.best_config, par.best_config);
    assert_eq!(seq.best_score, par.best_score);
}

#[test]
fn test_opt_path_records_every_evaluation_in_order() {
    let task = noisy_linear_task();
    let params = ParamSet::new().log_float("lambda", 1e-4, 1e2);
    let mut strategy = GridSearch::new(4);
    let result = tune(
        ridge_factory,
        &task,
        &Resampling::cv(3).with_random_state(1),
        Measure::Mse,
        &params,
        &mut strategy,
        &ExecConfig::sequential(),
    )
    .unwrap();
    let entries = result.opt_path.entries();
    assert_eq!(entries.len(), 4);
    for (i, e) in entries.iter().enumerate() {
        assert_eq!(e.index, i);
        assert!(e.score.is_finite());
        assert!(e.error_message.is_none());
        assert!(e.exec_time_secs >= 0.0);
    }
}
