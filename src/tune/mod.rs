//! Hyperparameter tuning
//!
//! Provides the parameter-set definition, pluggable search strategies
//! (grid, random), the optimization path and the tuning driver.

mod driver;
mod opt_path;
mod param;
mod strategy;

pub use driver::{tune, TuneResult};
pub use opt_path::{OptPath, OptPathEntry};
pub use param::{Param, ParamConfig, ParamKind, ParamSet, ParamValue};
pub use strategy::{GridSearch, RandomSearch, SearchStrategy};
