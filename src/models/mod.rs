//! Forecasting models: the two legs of the ensemble.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub mod gradient_boosting;
pub mod holt_winters;

pub use gradient_boosting::{FitSummary, GradientBoostingModel};
pub use holt_winters::{HoltWinters, TrainedHoltWinters};

/// Per-category outcome of the seasonal fit.
///
/// A category whose series is too short or degenerate records the reason
/// instead of a model, so downstream code cannot forget to check; the
/// ensemble then serves that category from the boosting leg alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SeasonalFit {
    Fitted {
        model: TrainedHoltWinters,
        /// Last day of the fitted daily series.
        last_date: NaiveDate,
        /// Tail of the fitted series, kept so rolling buffers can be resumed
        /// after a bundle reload.
        recent: Vec<f64>,
    },
    Unavailable {
        reason: String,
    },
}

impl SeasonalFit {
    pub fn is_fitted(&self) -> bool {
        matches!(self, SeasonalFit::Fitted { .. })
    }
}
