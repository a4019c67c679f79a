//! Point-forecast error metrics.

use peak_core::{PeakError, PeakResult};

fn check_lengths(truth: &[f64], predicted: &[f64]) -> PeakResult<()> {
    if truth.len() != predicted.len() {
        return Err(PeakError::Validation(format!(
            "length mismatch: {} observed vs {} predicted",
            truth.len(),
            predicted.len()
        )));
    }
    if truth.is_empty() {
        return Err(PeakError::Validation("cannot score an empty series".into()));
    }
    Ok(())
}

/// Mean squared error. `NaN` inputs propagate.
pub fn mse(truth: &[f64], predicted: &[f64]) -> PeakResult<f64> {
    check_lengths(truth, predicted)?;
    let sum: f64 = truth
        .iter()
        .zip(predicted)
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    Ok(sum / truth.len() as f64)
}

/// Mean absolute percentage error as a fraction; zero observations are
/// divided by machine epsilon instead.
pub fn mape(truth: &[f64], predicted: &[f64]) -> PeakResult<f64> {
    check_lengths(truth, predicted)?;
    let sum: f64 = truth
        .iter()
        .zip(predicted)
        .map(|(t, p)| (t - p).abs() / t.abs().max(f64::EPSILON))
        .sum();
    Ok(sum / truth.len() as f64)
}
