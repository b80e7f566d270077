mod common;

use chrono::Duration;
use pretty_assertions::assert_eq;
use sales_forecast::ensemble::{EnsembleForecastModel, TimePeriod};
use sales_forecast::error::ForecastError;
use serde_json::Value;
use std::fs;

fn trained_model() -> EnsembleForecastModel {
    let table = common::synthetic_table(&["Books", "Toys"], 140, 42);
    let mut model = EnsembleForecastModel::new(common::fast_config());
    model.train(&table).unwrap();
    model
}

#[test]
fn save_load_round_trip_reproduces_predictions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("models/ensemble.json");

    let model = trained_model();
    model.save(&path).unwrap();
    let reloaded = EnsembleForecastModel::load(&path).unwrap();

    assert!(reloaded.is_trained());
    assert_eq!(model.metadata().category_count, reloaded.metadata().category_count);

    let start = common::start_date() + Duration::days(140);
    let categories = vec!["Books".to_string(), "Toys".to_string()];

    let original = model
        .predict(&categories, TimePeriod::Month, Some(start))
        .unwrap();
    let restored = reloaded
        .predict(&categories, TimePeriod::Month, Some(start))
        .unwrap();

    assert_eq!(original, restored);
}

#[test]
fn v1_bundle_loads_with_defaulted_fields() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ensemble.json");

    trained_model().save(&path).unwrap();

    // Rewrite the artifact as a v1 bundle: older writers knew nothing of
    // residual dispersion or holdout metrics.
    let mut value: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let object = value.as_object_mut().unwrap();
    object.insert("schema_version".to_string(), Value::from(1));
    object.remove("residual_std");
    object.remove("holdout");
    fs::write(&path, serde_json::to_string(&value).unwrap()).unwrap();

    let reloaded = EnsembleForecastModel::load(&path).unwrap();
    assert!(reloaded.is_trained());
    assert!(reloaded.metadata().holdout.is_none());

    // Interval widths fall back to the configured default.
    let start = common::start_date() + Duration::days(140);
    let results = reloaded
        .predict(&["Books".to_string()], TimePeriod::Week, Some(start))
        .unwrap();
    for point in &results["Books"] {
        assert!(point.confidence_lower >= 0.0);
        assert!(point.confidence_upper >= point.predicted_sales);
    }
}

#[test]
fn unknown_schema_version_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ensemble.json");

    trained_model().save(&path).unwrap();

    let mut value: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    value
        .as_object_mut()
        .unwrap()
        .insert("schema_version".to_string(), Value::from(99));
    fs::write(&path, serde_json::to_string(&value).unwrap()).unwrap();

    let err = EnsembleForecastModel::load(&path).unwrap_err();
    assert!(matches!(err, ForecastError::BundleError(_)));
}

#[test]
fn bundle_with_empty_feature_list_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ensemble.json");

    trained_model().save(&path).unwrap();

    // A bundle that parses but carries no feature list cannot serve
    // predictions; loading must fail outright rather than limp along.
    let mut value: Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    value
        .as_object_mut()
        .unwrap()
        .insert("feature_names".to_string(), Value::Array(Vec::new()));
    fs::write(&path, serde_json::to_string(&value).unwrap()).unwrap();

    let err = EnsembleForecastModel::load(&path).unwrap_err();
    assert!(matches!(err, ForecastError::BundleError(_)));
}

#[test]
fn corrupt_artifact_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ensemble.json");
    fs::write(&path, "definitely not json").unwrap();

    let err = EnsembleForecastModel::load(&path).unwrap_err();
    assert!(matches!(err, ForecastError::BundleError(_)));
}

#[test]
fn missing_artifact_is_fatal() {
    let err = EnsembleForecastModel::load("/nonexistent/ensemble.json").unwrap_err();
    assert!(matches!(err, ForecastError::BundleError(_)));
}

#[test]
fn untrained_model_cannot_be_saved() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ensemble.json");

    let model = EnsembleForecastModel::new(common::fast_config());
    let err = model.save(&path).unwrap_err();
    assert!(matches!(err, ForecastError::NotTrained));
}
