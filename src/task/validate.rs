//! Construction-time validation of task data
//!
//! All checks here are fail-fast: a task either passes every check or is
//! never constructed. Fix-up of empty factor levels is the one permitted
//! mutation, controlled by [`FixupPolicy`](super::FixupPolicy).

use crate::error::{MlexpError, Result};
use crate::task::FixupPolicy;
use crate::task::description::FeatureKind;
use polars::prelude::*;
use std::collections::BTreeSet;

/// Map a Polars dtype onto a feature kind, or `None` if unsupported.
pub(crate) fn feature_kind(dtype: &DataType) -> Option<FeatureKind> {
    match dtype {
        DataType::Float64
        | DataType::Float32
        | DataType::Int64
        | DataType::Int32
        | DataType::Int16
        | DataType::Int8
        | DataType::UInt64
        | DataType::UInt32
        | DataType::UInt16
        | DataType::UInt8 => Some(FeatureKind::Numeric),
        DataType::String | DataType::Boolean => Some(FeatureKind::Factor),
        _ => None,
    }
}

/// Reject duplicate or blank column names.
pub(crate) fn check_column_names(df: &DataFrame) -> Result<()> {
    let mut seen = BTreeSet::new();
    for name in df.get_column_names() {
        let name = name.as_str();
        if name.trim().is_empty() {
            return Err(MlexpError::DataShape(
                "data table contains a blank column name".to_string(),
            ));
        }
        if !seen.insert(name.to_string()) {
            return Err(MlexpError::DataShape(format!(
                "duplicate column name `{}` in data table",
                name
            )));
        }
    }
    Ok(())
}

/// Reject infinite or NaN values in a numeric feature column. Nulls are
/// allowed here and surface as missingness in the task description.
pub(crate) fn check_numeric_column(series: &Series, name: &str) -> Result<()> {
    let casted = series.cast(&DataType::Float64)?;
    let ca = casted
        .f64()
        .map_err(|e| MlexpError::DataContent(e.to_string()))?;
    for value in ca.into_iter().flatten() {
        if !value.is_finite() {
            return Err(MlexpError::DataContent(format!(
                "feature column `{}` contains an infinite or NaN value",
                name
            )));
        }
    }
    Ok(())
}

/// Observed (non-null) values of a factor column, sorted and deduplicated.
pub(crate) fn observed_levels(series: &Series, name: &str) -> Result<Vec<String>> {
    let casted = series.cast(&DataType::String)?;
    let ca = casted
        .str()
        .map_err(|_| MlexpError::DataContent(format!("column `{}` is not categorical", name)))?;
    let set: BTreeSet<String> = ca.into_iter().flatten().map(str::to_string).collect();
    Ok(set.into_iter().collect())
}

/// Weights must match the row count and contain only finite, non-negative values.
pub(crate) fn check_weights(weights: &[f64], n_obs: usize) -> Result<()> {
    if weights.len() != n_obs {
        return Err(MlexpError::DataShape(format!(
            "weights length {} does not match row count {}",
            weights.len(),
            n_obs
        )));
    }
    for (i, &w) in weights.iter().enumerate() {
        if !w.is_finite() || w < 0.0 {
            return Err(MlexpError::DataContent(format!(
                "weight at row {} is {} but weights must be finite and non-negative",
                i, w
            )));
        }
    }
    Ok(())
}

/// Blocking must match the row count.
pub(crate) fn check_blocking(blocking: &[String], n_obs: usize) -> Result<()> {
    if blocking.len() != n_obs {
        return Err(MlexpError::DataShape(format!(
            "blocking length {} does not match row count {}",
            blocking.len(),
            n_obs
        )));
    }
    Ok(())
}

/// Resolve the final level set of one factor column.
///
/// Returns `(levels, dropped)` where `dropped` holds the declared-but-unused
/// levels removed under the `Quiet`/`Warn` policies. Under `Off` any empty
/// level is an error; an observed value outside the declared set is always
/// an error.
pub(crate) fn resolve_levels(
    column: &str,
    declared: Option<&Vec<String>>,
    observed: &[String],
    policy: FixupPolicy,
) -> Result<(Vec<String>, Vec<String>)> {
    let declared = match declared {
        None => return Ok((observed.to_vec(), Vec::new())),
        Some(d) => d,
    };

    let declared_set: BTreeSet<&str> = declared.iter().map(String::as_str).collect();
    for value in observed {
        if !declared_set.contains(value.as_str()) {
            return Err(MlexpError::DataContent(format!(
                "factor column `{}` contains value `{}` outside its declared levels",
                column, value
            )));
        }
    }

    let observed_set: BTreeSet<&str> = observed.iter().map(String::as_str).collect();
    let dropped: Vec<String> = declared
        .iter()
        .filter(|l| !observed_set.contains(l.as_str()))
        .cloned()
        .collect();

    if dropped.is_empty() {
        return Ok((declared.clone(), Vec::new()));
    }

    match policy {
        FixupPolicy::Off => Err(MlexpError::DataContent(format!(
            "factor column `{}` has empty levels: {}",
            column,
            dropped.join(", ")
        ))),
        FixupPolicy::Quiet | FixupPolicy::Warn => {
            let levels: Vec<String> = declared
                .iter()
                .filter(|l| observed_set.contains(l.as_str()))
                .cloned()
                .collect();
            Ok((levels, dropped))
        }
    }
}
