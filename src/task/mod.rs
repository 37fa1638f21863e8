//! Task abstraction: a dataset bundled with its learning target
//!
//! A [`Task`] wraps a Polars `DataFrame` together with target-column
//! metadata, optional per-observation weights and an optional blocking
//! factor. Construction goes through [`TaskBuilder`] and is fail-fast:
//! every shape and content check runs up front, and the only permitted
//! fix-up is dropping empty factor levels per [`FixupPolicy`].
//!
//! The data table is held behind an `Arc` and shared between clones;
//! subsetting copies the affected rows into a new task.

pub mod description;
mod validate;

pub use description::{FeatureKind, FixupPolicy, FixupReport, TaskDesc, TaskType};

use crate::error::{MlexpError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use tracing::warn;

/// Builder for [`Task`] construction
#[derive(Debug, Clone)]
pub struct TaskBuilder {
    id: Option<String>,
    task_type: TaskType,
    data: DataFrame,
    target: String,
    weights: Option<Vec<f64>>,
    blocking: Option<Vec<String>>,
    positive: Option<String>,
    factor_levels: BTreeMap<String, Vec<String>>,
    fixup: FixupPolicy,
    check: bool,
}

impl TaskBuilder {
    /// Start a builder for the given task type
    pub fn new(task_type: TaskType, data: DataFrame, target: &str) -> Self {
        Self {
            id: None,
            task_type,
            data,
            target: target.to_string(),
            weights: None,
            blocking: None,
            positive: None,
            factor_levels: BTreeMap::new(),
            fixup: FixupPolicy::default(),
            check: true,
        }
    }

    /// Start a classification task builder
    pub fn classif(data: DataFrame, target: &str) -> Self {
        Self::new(TaskType::Classif, data, target)
    }

    /// Start a regression task builder
    pub fn regr(data: DataFrame, target: &str) -> Self {
        Self::new(TaskType::Regr, data, target)
    }

    /// Set an explicit task id
    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    /// Attach per-observation weights
    pub fn with_weights(mut self, weights: Vec<f64>) -> Self {
        self.weights = Some(weights);
        self
    }

    /// Attach a blocking factor grouping observations that must stay
    /// together across resampling folds
    pub fn with_blocking(mut self, blocking: Vec<String>) -> Self {
        self.blocking = Some(blocking);
        self
    }

    /// Set the positive class label (binary classification only)
    pub fn with_positive(mut self, positive: &str) -> Self {
        self.positive = Some(positive.to_string());
        self
    }

    /// Declare the full level set of a factor column. Declared levels with
    /// no observations are subject to fix-up.
    pub fn with_factor_levels(mut self, column: &str, levels: Vec<String>) -> Self {
        self.factor_levels.insert(column.to_string(), levels);
        self
    }

    /// Set the empty-level fix-up policy
    pub fn with_fixup(mut self, fixup: FixupPolicy) -> Self {
        self.fixup = fixup;
        self
    }

    /// Enable or disable content validation (shape errors are always fatal)
    pub fn with_checks(mut self, check: bool) -> Self {
        self.check = check;
        self
    }

    /// Validate and construct the task
    pub fn build(self) -> Result<Task> {
        let TaskBuilder {
            id,
            task_type,
            data,
            target,
            weights,
            blocking,
            positive,
            factor_levels: declared,
            fixup,
            check,
        } = self;

        let id = match id {
            Some(s) => {
                let trimmed = s.trim().to_string();
                if trimmed.is_empty() {
                    return Err(MlexpError::IdInference(
                        "explicit task id is blank".to_string(),
                    ));
                }
                trimmed
            }
            None => {
                if target.trim().is_empty() {
                    return Err(MlexpError::IdInference(
                        "cannot deduce a task id from a blank target name".to_string(),
                    ));
                }
                format!("task.{}", target)
            }
        };

        validate::check_column_names(&data)?;

        let n_obs = data.height();
        if n_obs == 0 {
            return Err(MlexpError::DataShape("data table has no rows".to_string()));
        }
        if data.column(&target).is_err() {
            return Err(MlexpError::DataShape(format!(
                "target column `{}` not found in data table",
                target
            )));
        }

        if let Some(w) = &weights {
            validate::check_weights(w, n_obs)?;
        }
        if let Some(b) = &blocking {
            validate::check_blocking(b, n_obs)?;
        }

        let feature_names: Vec<String> = data
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .filter(|n| n != &target)
            .collect();

        let mut factor_levels = BTreeMap::new();
        let mut report = FixupReport::default();
        let mut n_numeric = 0;
        let mut n_factor = 0;
        let mut has_missing = false;

        for name in &feature_names {
            let series = data.column(name)?;
            if series.null_count() > 0 {
                has_missing = true;
            }
            let kind = validate::feature_kind(series.dtype()).ok_or_else(|| {
                MlexpError::UnsupportedColumn {
                    column: name.clone(),
                    dtype: series.dtype().to_string(),
                }
            })?;
            match kind {
                FeatureKind::Numeric => {
                    n_numeric += 1;
                    if check {
                        validate::check_numeric_column(series, name)?;
                    }
                }
                FeatureKind::Factor => {
                    n_factor += 1;
                    let observed = validate::observed_levels(series, name)?;
                    let resolved = if !check && fixup == FixupPolicy::Off {
                        declared.get(name).cloned().unwrap_or_else(|| observed.clone())
                    } else {
                        let (levels, dropped) =
                            validate::resolve_levels(name, declared.get(name), &observed, fixup)?;
                        if !dropped.is_empty() {
                            report.changed.push((name.clone(), dropped));
                        }
                        levels
                    };
                    factor_levels.insert(name.clone(), resolved);
                }
            }
        }

        if fixup == FixupPolicy::Warn && !report.is_empty() {
            warn!(
                task = %id,
                columns = ?report.columns(),
                "dropped empty factor levels during task construction"
            );
        }

        let target_series = data.column(&target)?;
        let mut class_levels = Vec::new();
        match task_type {
            TaskType::Classif => {
                if check && target_series.null_count() > 0 {
                    return Err(MlexpError::DataContent(format!(
                        "target column `{}` contains missing values",
                        target
                    )));
                }
                class_levels = validate::observed_levels(target_series, &target)?;
                if check && class_levels.is_empty() {
                    return Err(MlexpError::DataContent(
                        "classification target has no observed classes".to_string(),
                    ));
                }
                if let Some(pos) = &positive {
                    if class_levels.len() > 2 {
                        return Err(MlexpError::ConfigError(format!(
                            "positive class requires a binary target, found {} classes",
                            class_levels.len()
                        )));
                    }
                    // a single-class view (e.g. a resampling subset) keeps its
                    // positive label even when only the other class survived
                    if class_levels.contains(pos) {
                        // classes ordered [negative, positive] so positive encodes as 1.0
                        class_levels.retain(|c| c != pos);
                        class_levels.push(pos.clone());
                    } else if class_levels.len() == 2 {
                        return Err(MlexpError::ConfigError(format!(
                            "positive class `{}` is not an observed target level",
                            pos
                        )));
                    }
                }
            }
            TaskType::Regr => {
                if validate::feature_kind(target_series.dtype()) != Some(FeatureKind::Numeric) {
                    return Err(MlexpError::DataContent(format!(
                        "regression target `{}` must be numeric, found {}",
                        target,
                        target_series.dtype()
                    )));
                }
                if check {
                    if target_series.null_count() > 0 {
                        return Err(MlexpError::DataContent(format!(
                            "target column `{}` contains missing values",
                            target
                        )));
                    }
                    validate::check_numeric_column(target_series, &target)?;
                }
            }
        }

        let desc = TaskDesc {
            id: id.clone(),
            task_type,
            n_obs,
            n_feats: feature_names.len(),
            n_numeric,
            n_factor,
            has_missing,
            has_weights: weights.is_some(),
            has_blocking: blocking.is_some(),
            positive: positive.clone(),
            class_levels,
        };

        Ok(Task {
            id,
            task_type,
            data: Arc::new(data),
            target,
            weights: weights.map(Arc::new),
            blocking: blocking.map(Arc::new),
            factor_levels,
            positive,
            desc,
            fixup_report: report,
            check,
        })
    }
}

/// A dataset plus target/weight/blocking metadata, the unit of work for
/// learning algorithms
#[derive(Debug, Clone)]
pub struct Task {
    id: String,
    task_type: TaskType,
    data: Arc<DataFrame>,
    target: String,
    weights: Option<Arc<Vec<f64>>>,
    blocking: Option<Arc<Vec<String>>>,
    factor_levels: BTreeMap<String, Vec<String>>,
    positive: Option<String>,
    desc: TaskDesc,
    fixup_report: FixupReport,
    check: bool,
}

impl Task {
    /// Task identifier
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Task type
    pub fn task_type(&self) -> TaskType {
        self.task_type
    }

    /// Underlying data table
    pub fn data(&self) -> &DataFrame {
        &self.data
    }

    /// Target column name
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Number of observations
    pub fn nrow(&self) -> usize {
        self.desc.n_obs
    }

    /// Computed task description
    pub fn desc(&self) -> &TaskDesc {
        &self.desc
    }

    /// Record of the level fix-up applied at construction
    pub fn fixup_report(&self) -> &FixupReport {
        &self.fixup_report
    }

    /// Per-observation weights, if attached
    pub fn weights(&self) -> Option<&[f64]> {
        self.weights.as_ref().map(|w| w.as_slice())
    }

    /// Blocking factor, if attached
    pub fn blocking(&self) -> Option<&[String]> {
        self.blocking.as_ref().map(|b| b.as_slice())
    }

    /// Positive class label, if set
    pub fn positive(&self) -> Option<&str> {
        self.positive.as_deref()
    }

    /// Level set of a factor feature
    pub fn factor_levels(&self, column: &str) -> Option<&[String]> {
        self.factor_levels.get(column).map(|l| l.as_slice())
    }

    /// Feature column names, in table order
    pub fn feature_names(&self) -> Vec<String> {
        self.data
            .get_column_names()
            .iter()
            .map(|s| s.to_string())
            .filter(|n| n != &self.target)
            .collect()
    }

    /// Formula representation, e.g. `y ~ f1 + f2`
    pub fn formula(&self) -> String {
        let feats = self.feature_names();
        if feats.is_empty() {
            format!("{} ~ 1", self.target)
        } else {
            format!("{} ~ {}", self.target, feats.join(" + "))
        }
    }

    /// Label for a class index (classification only)
    pub fn class_label(&self, index: usize) -> Option<&str> {
        self.desc.class_levels.get(index).map(String::as_str)
    }

    /// Observed target labels as strings (classification only)
    pub fn target_labels(&self) -> Result<Vec<String>> {
        if self.task_type != TaskType::Classif {
            return Err(MlexpError::ConfigError(
                "target labels are only defined for classification tasks".to_string(),
            ));
        }
        let casted = self.data.column(&self.target)?.cast(&DataType::String)?;
        let ca = casted
            .str()
            .map_err(|e| MlexpError::DataContent(e.to_string()))?;
        let mut out = Vec::with_capacity(self.nrow());
        for v in ca.into_iter() {
            match v {
                Some(s) => out.push(s.to_string()),
                None => {
                    return Err(MlexpError::DataContent(format!(
                        "target column `{}` contains missing values",
                        self.target
                    )))
                }
            }
        }
        Ok(out)
    }

    /// Numeric target vector: raw values for regression, class indices for
    /// classification (per the class ordering in the task description)
    pub fn target_values(&self) -> Result<Array1<f64>> {
        match self.task_type {
            TaskType::Regr => {
                let casted = self.data.column(&self.target)?.cast(&DataType::Float64)?;
                let ca = casted
                    .f64()
                    .map_err(|e| MlexpError::DataContent(e.to_string()))?;
                let mut out = Vec::with_capacity(self.nrow());
                for v in ca.into_iter() {
                    match v {
                        Some(x) => out.push(x),
                        None => {
                            return Err(MlexpError::DataContent(format!(
                                "target column `{}` contains missing values",
                                self.target
                            )))
                        }
                    }
                }
                Ok(Array1::from_vec(out))
            }
            TaskType::Classif => {
                let labels = self.target_labels()?;
                let index: BTreeMap<&str, usize> = self
                    .desc
                    .class_levels
                    .iter()
                    .enumerate()
                    .map(|(i, l)| (l.as_str(), i))
                    .collect();
                let mut out = Vec::with_capacity(labels.len());
                for label in &labels {
                    match index.get(label.as_str()) {
                        Some(&i) => out.push(i as f64),
                        None => {
                            return Err(MlexpError::DataContent(format!(
                                "target value `{}` outside observed class levels",
                                label
                            )))
                        }
                    }
                }
                Ok(Array1::from_vec(out))
            }
        }
    }

    /// Feature matrix with factor columns level-coded as their level index.
    /// Missing values become NaN; learners decide how to handle them.
    pub fn features_array(&self) -> Result<Array2<f64>> {
        let names = self.feature_names();
        let n_rows = self.nrow();
        let mut cols: Vec<Vec<f64>> = Vec::with_capacity(names.len());

        for name in &names {
            let series = self.data.column(name)?;
            match self.factor_levels.get(name) {
                None => {
                    let casted = series.cast(&DataType::Float64)?;
                    let ca = casted
                        .f64()
                        .map_err(|e| MlexpError::DataContent(e.to_string()))?;
                    cols.push(ca.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect());
                }
                Some(levels) => {
                    let casted = series.cast(&DataType::String)?;
                    let ca = casted
                        .str()
                        .map_err(|e| MlexpError::DataContent(e.to_string()))?;
                    let index: BTreeMap<&str, usize> = levels
                        .iter()
                        .enumerate()
                        .map(|(i, l)| (l.as_str(), i))
                        .collect();
                    let mut out = Vec::with_capacity(n_rows);
                    for v in ca.into_iter() {
                        match v {
                            None => out.push(f64::NAN),
                            Some(s) => match index.get(s) {
                                Some(&i) => out.push(i as f64),
                                None => {
                                    return Err(MlexpError::DataContent(format!(
                                        "factor column `{}` contains value `{}` outside its levels",
                                        name, s
                                    )))
                                }
                            },
                        }
                    }
                    cols.push(out);
                }
            }
        }

        let col_refs: Vec<&[f64]> = cols.iter().map(|c| c.as_slice()).collect();
        Ok(Array2::from_shape_fn((n_rows, names.len()), |(r, c)| {
            col_refs[c][r]
        }))
    }

    /// New task restricted to the given rows. Weights and blocking are
    /// subset alongside, factor levels re-derived and the description
    /// recomputed.
    pub fn subset(&self, rows: &[usize]) -> Result<Task> {
        if rows.is_empty() {
            return Err(MlexpError::DataShape(
                "subset row index set is empty".to_string(),
            ));
        }
        let n = self.nrow();
        for &r in rows {
            if r >= n {
                return Err(MlexpError::DataShape(format!(
                    "subset row index {} out of range for {} observations",
                    r, n
                )));
            }
        }

        let idx = IdxCa::from_vec(
            "idx".into(),
            rows.iter().map(|&r| r as IdxSize).collect::<Vec<_>>(),
        );
        let data = self.data.take(&idx)?;

        let mut builder = TaskBuilder::new(self.task_type, data, &self.target)
            .with_id(&self.id)
            .with_fixup(FixupPolicy::Quiet)
            .with_checks(self.check);
        for (col, levels) in &self.factor_levels {
            builder = builder.with_factor_levels(col, levels.clone());
        }
        if let Some(w) = &self.weights {
            builder = builder.with_weights(rows.iter().map(|&r| w[r]).collect());
        }
        if let Some(b) = &self.blocking {
            builder = builder.with_blocking(rows.iter().map(|&r| b[r].clone()).collect());
        }
        if let Some(p) = &self.positive {
            builder = builder.with_positive(p);
        }
        builder.build()
    }

    /// New task without the given feature columns
    pub fn drop_features(&self, drop: &[&str]) -> Result<Task> {
        for d in drop {
            if *d == self.target {
                return Err(MlexpError::ConfigError(
                    "cannot drop the target column".to_string(),
                ));
            }
            if self.data.column(d).is_err() {
                return Err(MlexpError::DataShape(format!(
                    "unknown feature column `{}`",
                    d
                )));
            }
        }
        let dropset: BTreeSet<&str> = drop.iter().copied().collect();
        let cols: Vec<Series> = self
            .data
            .get_columns()
            .iter()
            .filter(|s| !dropset.contains(s.name().as_str()))
            .cloned()
            .collect();
        let data = DataFrame::new(cols)?;

        let mut builder = TaskBuilder::new(self.task_type, data, &self.target)
            .with_id(&self.id)
            .with_fixup(FixupPolicy::Quiet)
            .with_checks(self.check);
        for (col, levels) in &self.factor_levels {
            if !dropset.contains(col.as_str()) {
                builder = builder.with_factor_levels(col, levels.clone());
            }
        }
        if let Some(w) = &self.weights {
            builder = builder.with_weights(w.as_ref().clone());
        }
        if let Some(b) = &self.blocking {
            builder = builder.with_blocking(b.as_ref().clone());
        }
        if let Some(p) = &self.positive {
            builder = builder.with_positive(p);
        }
        builder.build()
    }

    /// New task keeping only the given feature columns
    pub fn keep_features(&self, keep: &[&str]) -> Result<Task> {
        let keepset: BTreeSet<&str> = keep.iter().copied().collect();
        let all = self.feature_names();
        let drop: Vec<&str> = all
            .iter()
            .map(String::as_str)
            .filter(|n| !keepset.contains(n))
            .collect();
        self.drop_features(&drop)
    }
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Task: {} ({})", self.id, self.task_type)?;
        writeln!(f, "Observations: {}", self.desc.n_obs)?;
        writeln!(
            f,
            "Features: {} (numeric: {}, factor: {})",
            self.desc.n_feats, self.desc.n_numeric, self.desc.n_factor
        )?;
        writeln!(f, "Missing values: {}", self.desc.has_missing)?;
        writeln!(f, "Weights: {}", self.desc.has_weights)?;
        write!(f, "Blocking: {}", self.desc.has_blocking)?;
        if self.task_type == TaskType::Classif {
            write!(
                f,
                "\nClasses ({}): {}",
                self.desc.class_levels.len(),
                self.desc.class_levels.join(", ")
            )?;
            if let Some(pos) = &self.positive {
                write!(f, " [positive: {}]", pos)?;
            }
        }
        Ok(())
    }
}
