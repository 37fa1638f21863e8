//! End-to-end tests for task construction and views

use mlexp::task::{FixupPolicy, TaskBuilder, TaskType};
use mlexp::MlexpError;
use polars::prelude::*;

fn toy_classif() -> DataFrame {
    df!(
        "x1" => &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        "x2" => &[0.5, 0.4, 0.9, 1.1, 0.2, 0.7],
        "color" => &["red", "blue", "red", "blue", "red", "blue"],
        "label" => &["yes", "no", "yes", "no", "yes", "no"]
    )
    .unwrap()
}

#[test]
fn test_classif_task_describes_itself() {
    let task = TaskBuilder::classif(toy_classif(), "label")
        .with_id("toy")
        .build()
        .unwrap();
    assert_eq!(task.id(), "toy");
    assert_eq!(task.task_type(), TaskType::Classif);
    assert_eq!(task.nrow(), 6);
    assert_eq!(task.desc().n_numeric, 2);
    assert_eq!(task.desc().n_factor, 1);
    assert_eq!(task.desc().class_levels, vec!["no", "yes"]);
    assert_eq!(task.formula(), "label ~ x1 + x2 + color");
}

#[test]
fn test_fixup_drops_unused_declared_level_and_names_column() {
    let task = TaskBuilder::classif(toy_classif(), "label")
        .with_factor_levels("color", vec!["red".into(), "blue".into(), "green".into()])
        .with_fixup(FixupPolicy::Warn)
        .build()
        .unwrap();
    let report = task.fixup_report();
    assert!(!report.is_empty());
    assert_eq!(report.columns(), vec!["color"]);
    assert_eq!(report.changed[0].1, vec!["green"]);
    // the retained level set is the observed one
    let mut levels = task.factor_levels("color").unwrap().to_vec();
    levels.sort();
    assert_eq!(levels, vec!["blue", "red"]);
}

#[test]
fn test_fixup_off_rejects_unused_levels() {
    let err = TaskBuilder::classif(toy_classif(), "label")
        .with_factor_levels("color", vec!["red".into(), "blue".into(), "green".into()])
        .with_fixup(FixupPolicy::Off)
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("color"));
}

#[test]
fn test_observed_value_outside_declared_levels_fails() {
    let err = TaskBuilder::classif(toy_classif(), "label")
        .with_factor_levels("color", vec!["red".into()])
        .build()
        .unwrap_err();
    assert!(err.to_string().contains("color"));
}

#[test]
fn test_weights_must_match_row_count() {
    let err = TaskBuilder::classif(toy_classif(), "label")
        .with_weights(vec![1.0, 2.0])
        .build()
        .unwrap_err();
    assert!(matches!(err, MlexpError::DataShape(_)));
}

#[test]
fn test_negative_weight_rejected() {
    let err = TaskBuilder::classif(toy_classif(), "label")
        .with_weights(vec![1.0, 1.0, 1.0, -0.5, 1.0, 1.0])
        .build()
        .unwrap_err();
    assert!(matches!(err, MlexpError::DataContent(_)));
}

#[test]
fn test_blocking_must_match_row_count() {
    let err = TaskBuilder::classif(toy_classif(), "label")
        .with_blocking(vec!["a".into(), "b".into()])
        .build()
        .unwrap_err();
    assert!(matches!(err, MlexpError::DataShape(_)));
}

#[test]
fn test_infinite_feature_value_names_the_column() {
    let df = df!(
        "good" => &[1.0, 2.0, 3.0],
        "bad" => &[1.0, f64::INFINITY, 3.0],
        "y" => &[0.1, 0.2, 0.3]
    )
    .unwrap();
    let err = TaskBuilder::regr(df, "y").build().unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("bad"), "error should name the column: {}", msg);
}

#[test]
fn test_nan_feature_value_names_the_column() {
    let df = df!(
        "z" => &[1.0, f64::NAN, 3.0],
        "y" => &[0.1, 0.2, 0.3]
    )
    .unwrap();
    let err = TaskBuilder::regr(df, "y").build().unwrap_err();
    assert!(err.to_string().contains("z"));
}

#[test]
fn test_checks_off_admits_questionable_content() {
    let df = df!(
        "z" => &[1.0, f64::NAN, 3.0],
        "y" => &[0.1, 0.2, 0.3]
    )
    .unwrap();
    let task = TaskBuilder::regr(df, "y").with_checks(false).build().unwrap();
    assert_eq!(task.nrow(), 3);
}

#[test]
fn test_unsupported_column_type_rejected() {
    let dates = Series::new(
        "when".into(),
        &[1i64, 2, 3],
    )
    .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
    .unwrap();
    let y = Series::new("y".into(), &[0.1f64, 0.2, 0.3]);
    let df = DataFrame::new(vec![dates, y]).unwrap();
    let err = TaskBuilder::regr(df, "y").build().unwrap_err();
    assert!(matches!(err, MlexpError::UnsupportedColumn { .. }));
}

#[test]
fn test_subset_carries_weights_and_blocking() {
    let task = TaskBuilder::classif(toy_classif(), "label")
        .with_weights(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
        .with_blocking(vec![
            "a".into(),
            "a".into(),
            "b".into(),
            "b".into(),
            "c".into(),
            "c".into(),
        ])
        .build()
        .unwrap();
    let sub = task.subset(&[2, 3]).unwrap();
    assert_eq!(sub.nrow(), 2);
    assert_eq!(sub.weights().unwrap(), &[3.0, 4.0]);
    assert_eq!(sub.blocking().unwrap(), &["b".to_string(), "b".to_string()]);
}

#[test]
fn test_keep_features_view() {
    let task = TaskBuilder::classif(toy_classif(), "label").build().unwrap();
    let view = task.keep_features(&["x1"]).unwrap();
    assert_eq!(view.feature_names(), vec!["x1"]);
    assert_eq!(view.nrow(), task.nrow());
    // the original task is untouched
    assert_eq!(task.desc().n_feats, 3);
}
