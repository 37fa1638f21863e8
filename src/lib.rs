//! # mlexp
//!
//! A framework for machine-learning experiments: tasks wrap a dataset with
//! its target and metadata, learners train and predict through a uniform
//! interface, and resampling, hyperparameter tuning and feature selection
//! estimate and optimize performance on top of that interface.
//!
//! ## Quick start
//!
//! ```no_run
//! use mlexp::learner::RidgeRegression;
//! use mlexp::measure::Measure;
//! use mlexp::parallel::ExecConfig;
//! use mlexp::resample::{resample, Resampling};
//! use mlexp::task::TaskBuilder;
//! use polars::prelude::*;
//!
//! # fn main() -> mlexp::Result<()> {
//! let df = df!("x" => &[1.0, 2.0, 3.0, 4.0], "y" => &[2.0, 4.0, 6.0, 8.0])?;
//! let task = TaskBuilder::regr(df, "y").build()?;
//! let result = resample(
//!     &RidgeRegression::new(0.1),
//!     &task,
//!     &Resampling::cv(2).with_random_state(42),
//!     Measure::Mse,
//!     &ExecConfig::sequential(),
//! )?;
//! println!("mse = {:.4}", result.aggr.mean);
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod featsel;
pub mod learner;
pub mod measure;
pub mod parallel;
pub mod resample;
pub mod task;
pub mod tune;

pub use error::{MlexpError, Result};
