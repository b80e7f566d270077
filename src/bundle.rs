//! Versioned persistence of the trained model state.
//!
//! Everything a serving process needs is serialized as one JSON artifact:
//! the boosting forest, every seasonal fit (or its explicit absence marker),
//! the category encoding, the ordered feature list, the trend anchor, the
//! retained training table, and per-category residual dispersion. A bundle
//! is created by a training run, immutable afterwards, and replaced
//! wholesale by retraining.
//!
//! Older schema versions are loaded through explicit per-version migration
//! functions; newly introduced fields get safe defaults instead of failing
//! the load. An unreadable artifact or an unknown version is a fatal error.

use crate::config::ForecastConfig;
use crate::data::SalesRecord;
use crate::error::{ForecastError, Result};
use crate::features::CategoryEncoding;
use crate::models::{FitSummary, GradientBoostingModel, SeasonalFit};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::info;

/// The complete persisted trained-model artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelBundle {
    pub(crate) schema_version: u32,
    pub(crate) config: ForecastConfig,
    pub(crate) boosting: GradientBoostingModel,
    pub(crate) seasonal: BTreeMap<String, SeasonalFit>,
    pub(crate) encoding: CategoryEncoding,
    pub(crate) feature_names: Vec<String>,
    pub(crate) trained: bool,
    pub(crate) train_start: NaiveDate,
    pub(crate) training_table: Vec<SalesRecord>,
    pub(crate) residual_std: BTreeMap<String, f64>,
    pub(crate) holdout: Option<FitSummary>,
}

/// Schema version 1: before per-category residual dispersion and holdout
/// metrics were persisted.
#[derive(Debug, Deserialize)]
struct ModelBundleV1 {
    config: ForecastConfig,
    boosting: GradientBoostingModel,
    seasonal: BTreeMap<String, SeasonalFit>,
    encoding: CategoryEncoding,
    feature_names: Vec<String>,
    trained: bool,
    train_start: NaiveDate,
    training_table: Vec<SalesRecord>,
}

impl ModelBundle {
    pub const SCHEMA_VERSION: u32 = 2;

    /// Write the bundle to `path` as one JSON artifact.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = File::create(path)?;
        serde_json::to_writer(BufWriter::new(file), self)?;

        info!(path = %path.display(), categories = self.encoding.len(), "model bundle saved");
        Ok(())
    }

    /// Load a bundle, migrating older schema versions.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            ForecastError::BundleError(format!("Cannot open bundle {}: {}", path.display(), e))
        })?;

        let value: Value = serde_json::from_reader(BufReader::new(file)).map_err(|e| {
            ForecastError::BundleError(format!("Unreadable bundle {}: {}", path.display(), e))
        })?;

        let bundle = Self::from_value(value)?;

        info!(
            path = %path.display(),
            categories = bundle.encoding.len(),
            features = bundle.feature_names.len(),
            "model bundle loaded"
        );
        Ok(bundle)
    }

    fn from_value(value: Value) -> Result<Self> {
        let version = value
            .get("schema_version")
            .and_then(Value::as_u64)
            .ok_or_else(|| {
                ForecastError::BundleError("Bundle has no schema_version field".to_string())
            })?;

        let bundle = match version {
            1 => migrate_v1(serde_json::from_value(value)?),
            2 => serde_json::from_value(value)?,
            other => {
                return Err(ForecastError::BundleError(format!(
                    "Unsupported bundle schema version {}",
                    other
                )))
            }
        };

        bundle.validate()?;
        Ok(bundle)
    }

    /// A bundle missing its feature list would be internally inconsistent;
    /// that is fatal, unlike missing per-category statistics.
    fn validate(&self) -> Result<()> {
        if self.feature_names.is_empty() {
            return Err(ForecastError::BundleError(
                "Bundle has an empty feature list".to_string(),
            ));
        }
        if self.encoding.is_empty() {
            return Err(ForecastError::BundleError(
                "Bundle has an empty category encoding".to_string(),
            ));
        }
        Ok(())
    }
}

/// v1 → v2: residual dispersion was not persisted, so interval widths fall
/// back to the configured default per category; holdout metrics are absent.
fn migrate_v1(v1: ModelBundleV1) -> ModelBundle {
    ModelBundle {
        schema_version: ModelBundle::SCHEMA_VERSION,
        config: v1.config,
        boosting: v1.boosting,
        seasonal: v1.seasonal,
        encoding: v1.encoding,
        feature_names: v1.feature_names,
        trained: v1.trained,
        train_start: v1.train_start,
        training_table: v1.training_table,
        residual_std: BTreeMap::new(),
        holdout: None,
    }
}
