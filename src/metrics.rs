//! Accuracy metrics reported by the boosting trainer.

/// Coefficient of determination. Returns 0 for empty input or a
/// zero-variance target.
pub fn r_squared(forecast: &[f64], actual: &[f64]) -> f64 {
    if forecast.is_empty() || forecast.len() != actual.len() {
        return 0.0;
    }

    let mean = actual.iter().sum::<f64>() / actual.len() as f64;
    let ss_tot: f64 = actual.iter().map(|a| (a - mean).powi(2)).sum();
    if ss_tot == 0.0 {
        return 0.0;
    }

    let ss_res: f64 = forecast
        .iter()
        .zip(actual.iter())
        .map(|(f, a)| (a - f).powi(2))
        .sum();

    1.0 - ss_res / ss_tot
}

/// Mean absolute error. Returns 0 for empty input.
pub fn mean_absolute_error(forecast: &[f64], actual: &[f64]) -> f64 {
    if forecast.is_empty() || forecast.len() != actual.len() {
        return 0.0;
    }

    forecast
        .iter()
        .zip(actual.iter())
        .map(|(f, a)| (a - f).abs())
        .sum::<f64>()
        / forecast.len() as f64
}

/// Root mean squared error. Returns 0 for empty input.
pub fn root_mean_squared_error(forecast: &[f64], actual: &[f64]) -> f64 {
    if forecast.is_empty() || forecast.len() != actual.len() {
        return 0.0;
    }

    let mse = forecast
        .iter()
        .zip(actual.iter())
        .map(|(f, a)| (a - f).powi(2))
        .sum::<f64>()
        / forecast.len() as f64;

    mse.sqrt()
}
