//! Sigma-based outlier clipping for substation load.

use std::collections::BTreeSet;

use peak_core::{StationId, TimeSeries};
use tracing::debug;

pub const DEFAULT_OUTLIER_SIGMA: f64 = 3.0;

/// Mean and population standard deviation over the finite values.
pub fn mean_and_std(values: &[f64]) -> Option<(f64, f64)> {
    let finite: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if finite.is_empty() {
        return None;
    }
    let n = finite.len() as f64;
    let mean = finite.iter().sum::<f64>() / n;
    let variance = finite.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    Some((mean, variance.sqrt()))
}

/// Replace values strictly outside `mean ± n_sigma · std` with `NaN`.
pub fn clip_outliers(series: &TimeSeries, n_sigma: f64) -> TimeSeries {
    let Some((mean, std)) = mean_and_std(series.values()) else {
        return series.clone();
    };
    let upper = mean + n_sigma * std;
    let lower = mean - n_sigma * std;
    let clipped = series.map(|v| if v > upper || v < lower { f64::NAN } else { v });
    debug!(
        mean,
        std,
        removed = clipped.missing_count() - series.missing_count(),
        "clipped outliers"
    );
    clipped
}

/// Clip only when `station` is in the eligible set; everything else passes
/// through untouched.
pub fn clip_station_outliers(
    station: &StationId,
    series: &TimeSeries,
    eligible: &BTreeSet<StationId>,
    n_sigma: f64,
) -> TimeSeries {
    if eligible.contains(station) {
        clip_outliers(series, n_sigma)
    } else {
        series.clone()
    }
}
