//! Configuration for the forecasting pipeline.
//!
//! All tunables live in explicit config structs handed to the model at
//! construction time. Nothing in the crate reads global state, so two models
//! with different configurations can coexist in one process.

use serde::{Deserialize, Serialize};

/// Configuration for the gradient-boosting predictor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoostingConfig {
    /// Maximum number of trees; early stopping usually keeps fewer.
    pub n_estimators: usize,
    /// Shrinkage applied to every leaf weight.
    pub learning_rate: f64,
    /// Maximum tree depth.
    pub max_depth: usize,
    /// Fraction of training rows sampled per tree.
    pub subsample: f64,
    /// Fraction of feature columns sampled per tree.
    pub colsample: f64,
    /// L1 regularization on leaf weights.
    pub reg_alpha: f64,
    /// L2 regularization on leaf weights.
    pub reg_lambda: f64,
    /// Minimum number of samples allowed in a leaf.
    pub min_child_weight: f64,
    /// Stop after this many rounds without validation improvement.
    pub early_stopping_rounds: usize,
    /// Chronological tail fraction held out for early stopping.
    pub validation_fraction: f64,
    /// Seed for row/column subsampling; pinned for reproducible fits.
    pub seed: u64,
}

impl Default for BoostingConfig {
    fn default() -> Self {
        Self {
            n_estimators: 500,
            learning_rate: 0.05,
            max_depth: 7,
            subsample: 0.85,
            colsample: 0.85,
            reg_alpha: 0.05,
            reg_lambda: 1.0,
            min_child_weight: 5.0,
            early_stopping_rounds: 30,
            validation_fraction: 0.2,
            seed: 42,
        }
    }
}

/// Configuration for the per-category seasonal smoother.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonalConfig {
    /// Length of one seasonal cycle in days.
    pub period: usize,
    /// Minimum number of full cycles required to attempt a fit.
    pub min_cycles: usize,
}

impl Default for SeasonalConfig {
    fn default() -> Self {
        Self {
            period: 7,
            min_cycles: 2,
        }
    }
}

/// Configuration for the ensemble coordinator and rolling forecaster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleConfig {
    /// Weight of the boosting leg in the blend.
    pub boosting_weight: f64,
    /// Weight of the seasonal leg in the blend.
    pub seasonal_weight: f64,
    /// Interval half-width multiplier. 1.96 approximates a 95% interval
    /// under a normality assumption on residuals; this is a simplification,
    /// not a calibrated guarantee.
    pub confidence_z: f64,
    /// Number of recent observed values used to seed the rolling buffer.
    pub history_window: usize,
    /// Placeholder sales level for categories with no observed history.
    pub fallback_level: f64,
    /// Residual standard deviation used when a category has no residuals.
    pub fallback_residual_std: f64,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            boosting_weight: 0.6,
            seasonal_weight: 0.4,
            confidence_z: 1.96,
            history_window: 60,
            fallback_level: 1000.0,
            fallback_residual_std: 100.0,
        }
    }
}

/// Top-level configuration handed to [`crate::EnsembleForecastModel::new`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForecastConfig {
    pub boosting: BoostingConfig,
    pub seasonal: SeasonalConfig,
    pub ensemble: EnsembleConfig,
}
