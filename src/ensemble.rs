//! Ensemble coordinator blending the boosting and seasonal legs.
//!
//! One [`EnsembleForecastModel`] is trained per offline run and treated as
//! read-only shared state afterwards: prediction takes `&self` and mutates
//! nothing, so a loaded model can serve many concurrent requests.

use crate::bundle::ModelBundle;
use crate::config::ForecastConfig;
use crate::data::{fill_daily, SalesRecord, SalesTable};
use crate::error::{ForecastError, Result};
use crate::features::{self, CategoryEncoding, FEATURE_NAMES};
use crate::models::{FitSummary, GradientBoostingModel, HoltWinters, SeasonalFit};
use crate::rolling::RollingForecaster;
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use tracing::{info, warn};

/// Length of the seasonal-series tail retained for buffer resumption.
const RECENT_TAIL: usize = 30;

/// Train/validation R² gap beyond which the fit is flagged as overfit.
const OVERFIT_GAP: f64 = 0.15;

/// Requested forecast horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimePeriod {
    Week,
    Month,
    Year,
}

impl TimePeriod {
    /// Horizon length in days.
    pub fn horizon(&self) -> usize {
        match self {
            TimePeriod::Week => 7,
            TimePeriod::Month => 30,
            TimePeriod::Year => 365,
        }
    }
}

impl FromStr for TimePeriod {
    type Err = ForecastError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "week" => Ok(TimePeriod::Week),
            "month" => Ok(TimePeriod::Month),
            "year" => Ok(TimePeriod::Year),
            other => Err(ForecastError::InvalidParameter(format!(
                "Invalid time period: {} (expected week, month, or year)",
                other
            ))),
        }
    }
}

/// One forecast day for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub predicted_sales: f64,
    pub confidence_lower: f64,
    pub confidence_upper: f64,
}

/// Prediction request as consumed from the API layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastRequest {
    pub time_period: TimePeriod,
    /// Categories to forecast; all trained categories when absent.
    #[serde(default)]
    pub categories: Option<Vec<String>>,
    /// When false, the interval columns collapse onto the point forecast.
    #[serde(default = "default_true")]
    pub include_confidence: bool,
}

fn default_true() -> bool {
    true
}

/// Outcome of one training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Rows that survived the lag window and fed the boosting fit.
    pub samples: usize,
    pub feature_count: usize,
    pub category_count: usize,
    pub boosting: FitSummary,
    /// Categories whose seasonal leg is unavailable (boosting-only).
    pub degraded_categories: Vec<String>,
}

/// Informational model state, no side effects.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub trained: bool,
    pub feature_count: usize,
    pub category_count: usize,
    pub holdout: Option<FitSummary>,
    pub degraded_categories: Vec<String>,
}

/// Ensemble of a gradient-boosting regressor and per-category Holt-Winters
/// smoothers, blended with fixed weights.
#[derive(Debug, Clone)]
pub struct EnsembleForecastModel {
    config: ForecastConfig,
    boosting: Option<GradientBoostingModel>,
    seasonal: BTreeMap<String, SeasonalFit>,
    encoding: CategoryEncoding,
    feature_names: Vec<String>,
    trained: bool,
    /// Retained training table; lag/rolling features at inference are
    /// reconstructed from it.
    training_table: Vec<SalesRecord>,
    /// Anchor for the trend feature, fixed at first training.
    train_start: Option<NaiveDate>,
    /// In-sample residual standard deviation per category.
    residual_std: BTreeMap<String, f64>,
    holdout: Option<FitSummary>,
    degraded: Vec<String>,
}

impl EnsembleForecastModel {
    pub fn new(config: ForecastConfig) -> Self {
        Self {
            config,
            boosting: None,
            seasonal: BTreeMap::new(),
            encoding: CategoryEncoding::default(),
            feature_names: Vec::new(),
            trained: false,
            training_table: Vec::new(),
            train_start: None,
            residual_std: BTreeMap::new(),
            holdout: None,
            degraded: Vec::new(),
        }
    }

    /// Train both legs on a raw sales table.
    ///
    /// The boosting fit is a single serial step producing one shared model;
    /// seasonal fits are per category and a failed one degrades that category
    /// to boosting-only instead of failing the run.
    pub fn train(&mut self, table: &SalesTable) -> Result<TrainingReport> {
        let records = table.records()?;
        if records.is_empty() {
            return Err(ForecastError::DataError(
                "Cannot train on an empty sales table".to_string(),
            ));
        }

        let anchor = records.iter().map(|r| r.date).min().expect("non-empty");
        let categories: Vec<&str> = records.iter().map(|r| r.category.as_str()).collect();
        let encoding = CategoryEncoding::fit(&categories);

        let rows = features::build_training_rows(&records, &encoding, anchor)?;
        if rows.is_empty() {
            return Err(ForecastError::DataError(format!(
                "No rows survive the {}-day lag window; need longer category histories",
                features::MAX_LAG
            )));
        }

        // Chronological order for the split; the matrix arrives grouped by
        // category, which would otherwise put whole categories in validation.
        let mut order: Vec<usize> = (0..rows.len()).collect();
        order.sort_by_key(|&i| rows[i].date);

        let x: Vec<Vec<f64>> = order.iter().map(|&i| rows[i].features.to_vec()).collect();
        let y: Vec<f64> = order.iter().map(|&i| rows[i].target).collect();

        info!(samples = x.len(), features = FEATURE_NAMES.len(), "training gradient boosting");
        let (boosting, summary) = GradientBoostingModel::fit(&self.config.boosting, &x, &y)?;

        if summary.train_r2 - summary.validation_r2 > OVERFIT_GAP {
            warn!(
                train_r2 = summary.train_r2,
                validation_r2 = summary.validation_r2,
                "large train/validation gap; boosting fit may be overfit"
            );
        }

        // In-sample residual dispersion per category drives interval widths.
        let predictions = boosting.predict(&x);
        let mut residuals_by_category: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        for (pos, &i) in order.iter().enumerate() {
            residuals_by_category
                .entry(rows[i].category.as_str())
                .or_default()
                .push(rows[i].target - predictions[pos]);
        }

        let mut residual_std = BTreeMap::new();
        for category in encoding.categories() {
            let std = match residuals_by_category.get(category) {
                Some(res) if res.len() > 1 => res.population_std_dev(),
                _ => self.config.ensemble.fallback_residual_std,
            };
            residual_std.insert(category.to_string(), std);
        }

        // Per-category seasonal fits; each is independent of the others.
        let smoother = HoltWinters::new(
            self.config.seasonal.period,
            self.config.seasonal.min_cycles,
        )?;
        let mut seasonal = BTreeMap::new();
        let mut degraded = Vec::new();

        for (category, group) in group_by_category(&records) {
            let dates: Vec<NaiveDate> = group.iter().map(|r| r.date).collect();
            let values: Vec<f64> = group.iter().map(|r| r.sales).collect();
            let (daily_dates, daily_values) = fill_daily(&dates, &values);

            let fit = match smoother.fit(&daily_values) {
                Ok(model) => SeasonalFit::Fitted {
                    model,
                    last_date: *daily_dates.last().expect("non-empty group"),
                    recent: daily_values
                        [daily_values.len().saturating_sub(RECENT_TAIL)..]
                        .to_vec(),
                },
                Err(e) => {
                    warn!(category, error = %e, "seasonal fit unavailable, using boosting only");
                    degraded.push(category.to_string());
                    SeasonalFit::Unavailable {
                        reason: e.to_string(),
                    }
                }
            };
            seasonal.insert(category.to_string(), fit);
        }

        let report = TrainingReport {
            samples: x.len(),
            feature_count: FEATURE_NAMES.len(),
            category_count: encoding.len(),
            boosting: summary.clone(),
            degraded_categories: degraded.clone(),
        };

        info!(
            samples = report.samples,
            categories = report.category_count,
            degraded = degraded.len(),
            "ensemble training complete"
        );

        self.boosting = Some(boosting);
        self.seasonal = seasonal;
        self.encoding = encoding;
        self.feature_names = FEATURE_NAMES.iter().map(|s| s.to_string()).collect();
        self.trained = true;
        self.training_table = records;
        self.train_start = Some(anchor);
        self.residual_std = residual_std;
        self.holdout = Some(summary);
        self.degraded = degraded;

        Ok(report)
    }

    /// Forecast the requested categories over the given horizon.
    ///
    /// Returns one entry per forecastable category; categories absent from
    /// the trained encoding are skipped with a warning, and their absence
    /// from the result map means "could not forecast", not an error. The
    /// default start date is the day after now, truncated to midnight.
    pub fn predict(
        &self,
        categories: &[String],
        period: TimePeriod,
        start_date: Option<NaiveDate>,
    ) -> Result<BTreeMap<String, Vec<ForecastPoint>>> {
        let boosting = match (&self.boosting, self.trained) {
            (Some(model), true) => model,
            _ => return Err(ForecastError::NotTrained),
        };
        let anchor = self.train_start.ok_or(ForecastError::NotTrained)?;

        let horizon = period.horizon();
        let start = start_date.unwrap_or_else(|| Utc::now().date_naive() + Duration::days(1));

        let roller =
            RollingForecaster::new(boosting, &self.encoding, anchor, &self.config.ensemble);
        let weights = &self.config.ensemble;

        let mut results = BTreeMap::new();

        for category in categories {
            if !self.encoding.contains(category) {
                warn!(category = category.as_str(), "unknown category, skipping");
                continue;
            }

            let history = self.category_history(category);
            let boosting_leg = roller.forecast(category, &history, start, horizon);

            let seasonal_leg: Option<Vec<f64>> = match self.seasonal.get(category.as_str()) {
                Some(SeasonalFit::Fitted { model, .. }) => Some(model.forecast(horizon)),
                _ => None,
            };

            let blended: Vec<f64> = match seasonal_leg {
                Some(hw) if hw.len() == horizon => boosting_leg
                    .iter()
                    .zip(hw.iter())
                    .map(|(b, s)| weights.boosting_weight * b + weights.seasonal_weight * s)
                    .collect(),
                _ => boosting_leg,
            };

            let std = self
                .residual_std
                .get(category.as_str())
                .copied()
                .unwrap_or(weights.fallback_residual_std);
            let half_width = weights.confidence_z * std;

            let mut points = Vec::with_capacity(horizon);
            let mut date = start;
            for value in blended {
                let prediction = value.max(0.0);
                points.push(ForecastPoint {
                    date,
                    predicted_sales: round2(prediction),
                    confidence_lower: round2((prediction - half_width).max(0.0)),
                    confidence_upper: round2(prediction + half_width),
                });
                date = date.succ_opt().expect("date overflow");
            }

            results.insert(category.clone(), points);
        }

        Ok(results)
    }

    /// Serve a request from the API layer.
    pub fn forecast(
        &self,
        request: &ForecastRequest,
    ) -> Result<BTreeMap<String, Vec<ForecastPoint>>> {
        let categories: Vec<String> = match &request.categories {
            Some(list) => list.clone(),
            None => self.encoding.categories().map(|c| c.to_string()).collect(),
        };

        let mut results = self.predict(&categories, request.time_period, None)?;

        if !request.include_confidence {
            for points in results.values_mut() {
                for point in points {
                    point.confidence_lower = point.predicted_sales;
                    point.confidence_upper = point.predicted_sales;
                }
            }
        }

        Ok(results)
    }

    /// Informational state query; never fails, never mutates.
    pub fn metadata(&self) -> ModelMetadata {
        ModelMetadata {
            trained: self.trained,
            feature_count: self.feature_names.len(),
            category_count: self.encoding.len(),
            holdout: self.holdout.clone(),
            degraded_categories: self.degraded.clone(),
        }
    }

    pub fn is_trained(&self) -> bool {
        self.trained
    }

    /// Save the trained state as one versioned bundle artifact.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.to_bundle()?.save(path)
    }

    /// Load a bundle artifact produced by [`save`](Self::save), tolerating
    /// older schema versions via migration.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_bundle(ModelBundle::load(path)?)
    }

    pub(crate) fn to_bundle(&self) -> Result<ModelBundle> {
        let boosting = self
            .boosting
            .as_ref()
            .ok_or(ForecastError::NotTrained)?
            .clone();
        let train_start = self.train_start.ok_or(ForecastError::NotTrained)?;

        Ok(ModelBundle {
            schema_version: ModelBundle::SCHEMA_VERSION,
            config: self.config.clone(),
            boosting,
            seasonal: self.seasonal.clone(),
            encoding: self.encoding.clone(),
            feature_names: self.feature_names.clone(),
            trained: self.trained,
            train_start,
            training_table: self.training_table.clone(),
            residual_std: self.residual_std.clone(),
            holdout: self.holdout.clone(),
        })
    }

    pub(crate) fn from_bundle(bundle: ModelBundle) -> Result<Self> {
        let degraded = bundle
            .seasonal
            .iter()
            .filter(|(_, fit)| !fit.is_fitted())
            .map(|(category, _)| category.clone())
            .collect();

        Ok(Self {
            config: bundle.config,
            boosting: Some(bundle.boosting),
            seasonal: bundle.seasonal,
            encoding: bundle.encoding,
            feature_names: bundle.feature_names,
            trained: bundle.trained,
            training_table: bundle.training_table,
            train_start: Some(bundle.train_start),
            residual_std: bundle.residual_std,
            holdout: bundle.holdout,
            degraded,
        })
    }

    /// Observed sales for one category, date-sorted.
    fn category_history(&self, category: &str) -> Vec<f64> {
        self.training_table
            .iter()
            .filter(|r| r.category == category)
            .map(|r| r.sales)
            .collect()
    }
}

/// Iterate (category, rows) groups of a (category, date)-sorted slice.
fn group_by_category(records: &[SalesRecord]) -> Vec<(&str, &[SalesRecord])> {
    let mut groups = Vec::new();
    let mut start = 0;
    while start < records.len() {
        let category = records[start].category.as_str();
        let end = records[start..]
            .iter()
            .position(|r| r.category != category)
            .map(|offset| start + offset)
            .unwrap_or(records.len());
        groups.push((category, &records[start..end]));
        start = end;
    }
    groups
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
