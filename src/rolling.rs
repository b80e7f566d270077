//! Rolling-horizon forecasting for the boosting leg.
//!
//! No real future sales exist, so lag and rolling features for day `t+1` are
//! derived from the model's own prediction at day `t`: each step recomputes
//! the full feature vector from the buffer tail, predicts, clips to
//! non-negative, and appends the prediction before moving on. The walk is
//! inherently sequential within a category; categories are independent of
//! each other and a forecaster only takes `&self`, so different categories
//! may run on separate worker tasks.

use crate::config::EnsembleConfig;
use crate::features::{self, CategoryEncoding};
use crate::models::GradientBoostingModel;
use chrono::NaiveDate;

/// Steps the boosting leg forward day by day from a seeded sales buffer.
#[derive(Debug)]
pub struct RollingForecaster<'a> {
    model: &'a GradientBoostingModel,
    encoding: &'a CategoryEncoding,
    /// Training start date anchoring the trend feature.
    anchor: NaiveDate,
    config: &'a EnsembleConfig,
}

impl<'a> RollingForecaster<'a> {
    pub fn new(
        model: &'a GradientBoostingModel,
        encoding: &'a CategoryEncoding,
        anchor: NaiveDate,
        config: &'a EnsembleConfig,
    ) -> Self {
        Self {
            model,
            encoding,
            anchor,
            config,
        }
    }

    /// Predict `horizon` consecutive days starting at `start`.
    ///
    /// `history` is the category's observed sales, oldest first; only the
    /// most recent `history_window` values seed the buffer. A cold category
    /// with no history degrades to a constant placeholder series instead of
    /// failing.
    pub fn forecast(
        &self,
        category: &str,
        history: &[f64],
        start: NaiveDate,
        horizon: usize,
    ) -> Vec<f64> {
        let mut buffer: Vec<f64> = if history.is_empty() {
            vec![self.config.fallback_level; self.config.history_window]
        } else {
            let tail = history.len().saturating_sub(self.config.history_window);
            history[tail..].to_vec()
        };

        let code = self.encoding.code_of(category);
        let mut predictions = Vec::with_capacity(horizon);
        let mut date = start;

        for _ in 0..horizon {
            let x = features::feature_vector(date, self.anchor, &buffer, code);
            let prediction = self.model.predict_row(&x).max(0.0);

            predictions.push(prediction);
            buffer.push(prediction);
            date = date.succ_opt().expect("date overflow");
        }

        predictions
    }
}
