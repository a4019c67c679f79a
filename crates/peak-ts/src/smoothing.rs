//! Convolution and exponential smoothing filters.
//!
//! Both convolution filters use "same"-mode convolution: output sample `i` is
//! sample `i + (window - 1) / 2` of the full convolution, so the output keeps
//! the input length and the edges see a zero-padded partial window. A `NaN`
//! anywhere under the kernel makes the output `NaN`.

use peak_core::{Diagnostics, PeakError, PeakResult, TimeSeries};
use tracing::debug;

pub const DEFAULT_MOVING_AVERAGE_WINDOW: usize = 7;
pub const DEFAULT_TRIANGULAR_WINDOW: usize = 5;

/// Accept a positive window or fall back to `default`, recording the substitution.
pub fn resolve_window(window: Option<usize>, default: usize, diag: &mut Diagnostics) -> usize {
    match window {
        Some(w) if w >= 1 => w,
        _ => {
            diag.warn("window", &format!("window size set to {default} by default"));
            default
        }
    }
}

/// "Same"-mode discrete convolution; output length equals `values.len()`.
pub fn convolve_same(values: &[f64], kernel: &[f64]) -> Vec<f64> {
    let n = values.len() as isize;
    let offset = ((kernel.len().max(1) - 1) / 2) as isize;
    (0..n)
        .map(|i| {
            let centre = i + offset;
            kernel
                .iter()
                .enumerate()
                .filter_map(|(j, w)| {
                    let k = centre - j as isize;
                    (0..n).contains(&k).then(|| w * values[k as usize])
                })
                .sum()
        })
        .collect()
}

/// Centered moving average with uniform weights `1 / window`.
pub fn moving_average(
    series: &TimeSeries,
    window: Option<usize>,
    diag: &mut Diagnostics,
) -> TimeSeries {
    let window = resolve_window(window, DEFAULT_MOVING_AVERAGE_WINDOW, diag);
    let kernel = vec![1.0 / window as f64; window];
    debug!(window, samples = series.len(), "moving-average smoothing");
    smooth_with(series, &kernel)
}

/// Symmetric triangular kernel rising `1, 2, ...` to a peak and mirroring back,
/// normalized to sum to one. `window = 5` gives `[1, 2, 3, 2, 1] / 9`.
pub fn triangular_weights(window: usize) -> Vec<f64> {
    let raw: Vec<f64> = (0..window)
        .map(|i| (i + 1).min(window - i) as f64)
        .collect();
    let total: f64 = raw.iter().sum();
    raw.into_iter().map(|w| w / total).collect()
}

/// Centered convolution with [`triangular_weights`].
pub fn triangular_smoothing(
    series: &TimeSeries,
    window: Option<usize>,
    diag: &mut Diagnostics,
) -> TimeSeries {
    let window = resolve_window(window, DEFAULT_TRIANGULAR_WINDOW, diag);
    debug!(window, samples = series.len(), "triangular smoothing");
    smooth_with(series, &triangular_weights(window))
}

fn smooth_with(series: &TimeSeries, kernel: &[f64]) -> TimeSeries {
    let values = convolve_same(series.values(), kernel);
    series
        .with_values(values)
        .unwrap_or_else(|_| series.clone())
}

/// Simple exponential smoothing with a fixed level `alpha` in `(0, 1]`.
///
/// Returns the one-step-ahead fitted values on the input index. The initial
/// level is the first finite observation; missing observations carry the
/// level forward. With `cubic`, each value `v` becomes `v + v² + v³` first.
pub fn exponential_smoothing(series: &TimeSeries, alpha: f64, cubic: bool) -> PeakResult<TimeSeries> {
    if !(alpha > 0.0 && alpha <= 1.0) {
        return Err(PeakError::Config(format!(
            "smoothing level must lie in (0, 1], got {alpha}"
        )));
    }
    let transformed: Vec<f64> = if cubic {
        series.values().iter().map(|v| v + v * v + v * v * v).collect()
    } else {
        series.values().to_vec()
    };

    let mut level = match transformed.iter().find(|v| v.is_finite()) {
        Some(first) => *first,
        None => return series.with_values(vec![f64::NAN; series.len()]),
    };
    let mut fitted = Vec::with_capacity(transformed.len());
    for y in transformed {
        fitted.push(level);
        if y.is_finite() {
            level = alpha * y + (1.0 - alpha) * level;
        }
    }
    series.with_values(fitted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use peak_core::load_step;

    fn series(values: Vec<f64>) -> TimeSeries {
        let start = NaiveDate::from_ymd_opt(2021, 3, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        TimeSeries::regular(start, load_step(), values)
    }

    fn assert_close(actual: &[f64], expected: &[f64]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-9, "{actual:?} != {expected:?}");
        }
    }

    #[test]
    fn convolve_same_matches_centered_window() {
        let out = convolve_same(&[1.0, 2.0, 3.0], &[0.0, 1.0, 0.5]);
        assert_close(&out, &[1.0, 2.5, 4.0]);
    }

    #[test]
    fn convolve_same_even_kernel_offset() {
        // full convolution of [1,2,3,4] with [1,1] is [1,3,5,7,4]; offset 0
        let out = convolve_same(&[1.0, 2.0, 3.0, 4.0], &[1.0, 1.0]);
        assert_close(&out, &[1.0, 3.0, 5.0, 7.0]);
    }

    #[test]
    fn moving_average_keeps_length_and_index() {
        let input = series((0..20).map(f64::from).collect());
        let mut diag = Diagnostics::new();
        let out = moving_average(&input, Some(7), &mut diag);
        assert_eq!(out.len(), input.len());
        assert_eq!(out.index(), input.index());
        assert!((out.values()[10] - 10.0).abs() < 1e-9);
        // partial overlap at the edge: (0+1+2+3)/7
        assert!((out.values()[0] - 6.0 / 7.0).abs() < 1e-9);
        assert!(!diag.has_issues());
    }

    #[test]
    fn invalid_window_falls_back_and_reports() {
        let input = series(vec![1.0; 10]);
        let mut diag = Diagnostics::new();
        let defaulted = moving_average(&input, Some(0), &mut diag);
        let explicit = moving_average(&input, Some(7), &mut Diagnostics::new());
        assert_eq!(defaulted.values(), explicit.values());
        assert_eq!(diag.in_category("window").count(), 1);

        moving_average(&input, None, &mut diag);
        assert_eq!(diag.warning_count(), 2);
    }

    #[test]
    fn triangular_weights_shape() {
        assert_close(
            &triangular_weights(5),
            &[1.0 / 9.0, 2.0 / 9.0, 3.0 / 9.0, 2.0 / 9.0, 1.0 / 9.0],
        );
        assert_close(&triangular_weights(1), &[1.0]);
        let even = triangular_weights(4);
        assert_close(&even, &[1.0 / 6.0, 2.0 / 6.0, 2.0 / 6.0, 1.0 / 6.0]);
    }

    #[test]
    fn triangular_smoothing_keeps_length() {
        let input = series(vec![2.0; 13]);
        let out = triangular_smoothing(&input, Some(5), &mut Diagnostics::new());
        assert_eq!(out.len(), 13);
        assert!((out.values()[6] - 2.0).abs() < 1e-9);
    }

    #[test]
    fn nan_spreads_over_kernel_support() {
        let mut values = vec![1.0; 11];
        values[5] = f64::NAN;
        let out = moving_average(&series(values), Some(3), &mut Diagnostics::new());
        let nan_positions: Vec<usize> = out
            .values()
            .iter()
            .enumerate()
            .filter(|(_, v)| v.is_nan())
            .map(|(i, _)| i)
            .collect();
        assert_eq!(nan_positions, vec![4, 5, 6]);
    }

    #[test]
    fn exponential_smoothing_fitted_values() {
        let input = series(vec![10.0, 20.0, 20.0]);
        let out = exponential_smoothing(&input, 0.5, false).unwrap();
        assert_close(out.values(), &[10.0, 10.0, 15.0]);
    }

    #[test]
    fn exponential_smoothing_cubic_transform() {
        let input = series(vec![1.0, 2.0]);
        let out = exponential_smoothing(&input, 1.0, true).unwrap();
        // 1 -> 3, 2 -> 14; with alpha = 1 fitted is the previous transformed value
        assert_close(out.values(), &[3.0, 3.0]);
    }

    #[test]
    fn exponential_smoothing_rejects_bad_alpha() {
        let input = series(vec![1.0]);
        assert!(exponential_smoothing(&input, 0.0, false).is_err());
        assert!(exponential_smoothing(&input, 1.5, false).is_err());
    }
}
