//! Feature engineering for the boosting leg.
//!
//! All per-row feature formulas live in [`feature_vector`]. The training
//! matrix builder and the rolling forecaster both call it, so a row computed
//! at training time and a row computed while rolling a forecast forward agree
//! by construction. Window statistics are always taken over the trailing
//! buffer of values strictly before the row's date; the row's own sales value
//! is the prediction target and never leaks into its features.

use crate::data::SalesRecord;
use crate::error::{ForecastError, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::BTreeMap;
use std::f64::consts::PI;
use tracing::warn;

/// Number of engineered features per row.
pub const FEATURE_COUNT: usize = 25;

/// Longest lag window; rows with fewer prior values are dropped at training.
pub const MAX_LAG: usize = 30;

/// Feature names in matrix column order.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "dow_sin",
    "dow_cos",
    "month_sin",
    "month_cos",
    "doy_sin",
    "doy_cos",
    "quarter",
    "is_weekend",
    "day_of_month",
    "week_of_year",
    "days_since_start",
    "sales_lag_7",
    "sales_lag_14",
    "sales_lag_30",
    "rolling_mean_7",
    "rolling_std_7",
    "rolling_mean_14",
    "rolling_std_14",
    "rolling_mean_30",
    "rolling_std_30",
    "momentum_7_30",
    "momentum_7_14",
    "category_encoded",
    "weekend_x_cat",
    "volatility_ratio",
];

/// Stable mapping from category name to integer code.
///
/// Built once from the sorted distinct training categories and persisted with
/// the bundle; it is never rebuilt from a subset of categories at inference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryEncoding {
    codes: BTreeMap<String, i64>,
}

impl CategoryEncoding {
    /// Derive the encoding from the training categories.
    pub fn fit<S: AsRef<str>>(categories: &[S]) -> Self {
        let mut names: Vec<&str> = categories.iter().map(|c| c.as_ref()).collect();
        names.sort_unstable();
        names.dedup();

        let codes = names
            .into_iter()
            .enumerate()
            .map(|(i, name)| (name.to_string(), i as i64))
            .collect();

        Self { codes }
    }

    /// Map a category to its code. Unseen categories get the default code 0
    /// with a warning; this is a degradation signal, not an error.
    pub fn code_of(&self, category: &str) -> i64 {
        match self.codes.get(category) {
            Some(code) => *code,
            None => {
                warn!(category, "unseen category encoded with default code 0");
                0
            }
        }
    }

    /// Whether the category was part of the training set.
    pub fn contains(&self, category: &str) -> bool {
        self.codes.contains_key(category)
    }

    /// Known categories in sorted order.
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.codes.keys().map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// Lag value with the buffer's most recent value as fallback when the
/// history is shorter than the lag.
fn lag(history: &[f64], steps: usize) -> f64 {
    if history.len() >= steps {
        history[history.len() - steps]
    } else {
        history[history.len() - 1]
    }
}

/// Mean and population standard deviation of the trailing `window` values.
/// A single-sample window has standard deviation 0.
fn rolling_stats(history: &[f64], window: usize) -> (f64, f64) {
    let start = history.len().saturating_sub(window);
    let tail = &history[start..];
    let mean = tail.mean();
    let std = if tail.len() > 1 {
        tail.population_std_dev()
    } else {
        0.0
    };
    (mean, std)
}

/// Ratio with a non-positive denominator substituted by 1.
fn safe_ratio(numerator: f64, denominator: f64) -> f64 {
    numerator / if denominator > 0.0 { denominator } else { 1.0 }
}

/// Compute the full feature vector for one (category, date) row.
///
/// `history` is the category's sales series strictly before `date`, oldest
/// first, and must be non-empty. `anchor` is the training start date that
/// pins the trend feature across training and inference.
pub fn feature_vector(
    date: NaiveDate,
    anchor: NaiveDate,
    history: &[f64],
    category_code: i64,
) -> [f64; FEATURE_COUNT] {
    debug_assert!(!history.is_empty());

    let dow = date.weekday().num_days_from_monday() as f64;
    let month = date.month() as f64;
    let doy = date.ordinal() as f64;
    let is_weekend = if dow >= 5.0 { 1.0 } else { 0.0 };

    let (rm7, rs7) = rolling_stats(history, 7);
    let (rm14, rs14) = rolling_stats(history, 14);
    let (rm30, rs30) = rolling_stats(history, 30);

    let code = category_code as f64;

    [
        (2.0 * PI * dow / 7.0).sin(),
        (2.0 * PI * dow / 7.0).cos(),
        (2.0 * PI * (month - 1.0) / 12.0).sin(),
        (2.0 * PI * (month - 1.0) / 12.0).cos(),
        (2.0 * PI * doy / 365.25).sin(),
        (2.0 * PI * doy / 365.25).cos(),
        ((date.month() - 1) / 3 + 1) as f64,
        is_weekend,
        date.day() as f64,
        date.iso_week().week() as f64,
        (date - anchor).num_days() as f64,
        lag(history, 7),
        lag(history, 14),
        lag(history, 30),
        rm7,
        rs7,
        rm14,
        rs14,
        rm30,
        rs30,
        safe_ratio(rm7, rm30),
        safe_ratio(rm7, rm14),
        code,
        is_weekend * code,
        safe_ratio(rs7, rm7),
    ]
}

/// One row of the training matrix with its provenance.
#[derive(Debug, Clone)]
pub struct FeatureRow {
    pub category: String,
    pub date: NaiveDate,
    pub features: [f64; FEATURE_COUNT],
    pub target: f64,
}

/// Build the training matrix from (category, date)-sorted records.
///
/// Rows without the full 30-day lag window (the earliest 30 rows of each
/// category) are dropped, never imputed. The output keeps the input's
/// (category, date) order; callers wanting a chronological split re-sort by
/// date.
pub fn build_training_rows(
    records: &[SalesRecord],
    encoding: &CategoryEncoding,
    anchor: NaiveDate,
) -> Result<Vec<FeatureRow>> {
    if records.is_empty() {
        return Err(ForecastError::DataError(
            "Cannot build features from zero records".to_string(),
        ));
    }

    let mut rows = Vec::new();

    let mut start = 0;
    while start < records.len() {
        let category = records[start].category.as_str();
        let end = records[start..]
            .iter()
            .position(|r| r.category != category)
            .map(|offset| start + offset)
            .unwrap_or(records.len());

        let group = &records[start..end];
        let code = encoding.code_of(category);
        let values: Vec<f64> = group.iter().map(|r| r.sales).collect();

        for i in MAX_LAG..group.len() {
            rows.push(FeatureRow {
                category: category.to_string(),
                date: group[i].date,
                features: feature_vector(group[i].date, anchor, &values[..i], code),
                target: values[i],
            });
        }

        start = end;
    }

    Ok(rows)
}
