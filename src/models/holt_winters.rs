//! Additive Holt-Winters smoothing for the seasonal leg.
//!
//! Triple exponential smoothing with additive trend and additive weekly
//! seasonality, one model per category. The model equations:
//!
//! - Level: `l_t = α(y_t - s_{t-m}) + (1-α)(l_{t-1} + b_{t-1})`
//! - Trend: `b_t = β(l_t - l_{t-1}) + (1-β)b_{t-1}`
//! - Seasonal: `s_t = γ(y_t - l_t) + (1-γ)s_{t-m}`
//! - Forecast: `ŷ_{t+h} = l_t + h·b_t + s_{t+h-m}`
//!
//! Smoothing parameters are picked by a deterministic grid search minimizing
//! in-sample squared error.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};

const ALPHA_GRID: [f64; 8] = [0.05, 0.1, 0.2, 0.3, 0.4, 0.5, 0.65, 0.8];
const BETA_GRID: [f64; 4] = [0.01, 0.05, 0.1, 0.2];
const GAMMA_GRID: [f64; 4] = [0.05, 0.1, 0.2, 0.3];

/// Holt-Winters model specification.
#[derive(Debug, Clone)]
pub struct HoltWinters {
    /// Seasonal period in observations (7 for a weekly cycle on daily data).
    period: usize,
    /// Minimum number of full cycles required to fit.
    min_cycles: usize,
}

/// Fitted smoothing state, ready to forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedHoltWinters {
    alpha: f64,
    beta: f64,
    gamma: f64,
    period: usize,
    level: f64,
    trend: f64,
    seasonals: Vec<f64>,
    /// Length of the fitted series; anchors the seasonal phase of forecasts.
    n: usize,
}

impl HoltWinters {
    pub fn new(period: usize, min_cycles: usize) -> Result<Self> {
        if period < 2 {
            return Err(ForecastError::InvalidParameter(format!(
                "Seasonal period must be at least 2, got {}",
                period
            )));
        }
        if min_cycles < 1 {
            return Err(ForecastError::InvalidParameter(
                "Seasonal fit requires at least 1 full cycle".to_string(),
            ));
        }
        Ok(Self { period, min_cycles })
    }

    /// Fit on a strictly-daily series (gaps must be filled beforehand).
    ///
    /// Fails for series shorter than `min_cycles` full cycles, constant
    /// series, and series containing non-finite values. The failure is
    /// per-category by design; callers record it and fall back to the
    /// boosting leg alone.
    pub fn fit(&self, values: &[f64]) -> Result<TrainedHoltWinters> {
        let needed = self.min_cycles * self.period;
        if values.len() < needed {
            return Err(ForecastError::DataError(format!(
                "Series too short for seasonal fit: {} observations, {} needed",
                values.len(),
                needed
            )));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ForecastError::DataError(
                "Series contains non-finite values".to_string(),
            ));
        }
        let first = values[0];
        if values.iter().all(|&v| v == first) {
            return Err(ForecastError::DataError(
                "Series is constant; seasonal fit is degenerate".to_string(),
            ));
        }

        let (alpha, beta, gamma) = self.search_params(values);

        let mut state = initialize_state(values, self.period);
        run_smoothing(values, self.period, alpha, beta, gamma, &mut state);

        Ok(TrainedHoltWinters {
            alpha,
            beta,
            gamma,
            period: self.period,
            level: state.level,
            trend: state.trend,
            seasonals: state.seasonals,
            n: values.len(),
        })
    }

    /// Grid search over the smoothing parameters minimizing in-sample SSE.
    fn search_params(&self, values: &[f64]) -> (f64, f64, f64) {
        let mut best = (ALPHA_GRID[0], BETA_GRID[0], GAMMA_GRID[0]);
        let mut best_sse = f64::INFINITY;

        for &alpha in &ALPHA_GRID {
            for &beta in &BETA_GRID {
                for &gamma in &GAMMA_GRID {
                    let mut state = initialize_state(values, self.period);
                    let sse =
                        run_smoothing(values, self.period, alpha, beta, gamma, &mut state);
                    if sse < best_sse {
                        best_sse = sse;
                        best = (alpha, beta, gamma);
                    }
                }
            }
        }

        best
    }
}

impl TrainedHoltWinters {
    /// Produce exactly `steps` future values, continuing from the end of the
    /// fitted series. No interval of its own; the ensemble derives intervals
    /// from residual statistics uniformly.
    pub fn forecast(&self, steps: usize) -> Vec<f64> {
        (1..=steps)
            .map(|h| {
                let season_idx = (self.n + h - 1) % self.period;
                self.level + (h as f64) * self.trend + self.seasonals[season_idx]
            })
            .collect()
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

struct SmoothingState {
    level: f64,
    trend: f64,
    seasonals: Vec<f64>,
}

/// Level from the first cycle's mean, trend from cycle-over-cycle
/// differences, seasonal indices from first-cycle deviations (normalized to
/// sum to zero).
fn initialize_state(values: &[f64], period: usize) -> SmoothingState {
    let first_cycle = &values[..period];
    let level = first_cycle.iter().sum::<f64>() / period as f64;

    let trend = if values.len() >= 2 * period {
        let sum: f64 = (0..period)
            .map(|i| (values[period + i] - values[i]) / period as f64)
            .sum();
        sum / period as f64
    } else {
        0.0
    };

    let mut seasonals: Vec<f64> = first_cycle.iter().map(|y| y - level).collect();
    let adjustment = seasonals.iter().sum::<f64>() / period as f64;
    for s in seasonals.iter_mut() {
        *s -= adjustment;
    }

    SmoothingState {
        level,
        trend,
        seasonals,
    }
}

/// Run the smoothing recursion over the series, returning the SSE of
/// one-step-ahead errors past the first cycle.
fn run_smoothing(
    values: &[f64],
    period: usize,
    alpha: f64,
    beta: f64,
    gamma: f64,
    state: &mut SmoothingState,
) -> f64 {
    let mut sse = 0.0;

    for (t, &y) in values.iter().enumerate().skip(period) {
        let season_idx = t % period;
        let s = state.seasonals[season_idx];

        let one_step = state.level + state.trend + s;
        let error = y - one_step;
        sse += error * error;

        let level_prev = state.level;
        state.level = alpha * (y - s) + (1.0 - alpha) * (level_prev + state.trend);
        state.trend = beta * (state.level - level_prev) + (1.0 - beta) * state.trend;
        state.seasonals[season_idx] = gamma * (y - state.level) + (1.0 - gamma) * s;
    }

    sse
}
