//! Signal transforms for substation time series.
//!
//! Every function here is pure: it takes a [`TimeSeries`](peak_core::TimeSeries)
//! and returns a new one, leaving the input untouched.
//!
//! - [`smoothing`] - moving-average, triangular and exponential smoothing
//! - [`outlier`] - sigma clipping restricted to eligible stations
//! - [`resample`] - anchored bucket resampling, daily maxima, aligned differences

pub mod outlier;
pub mod resample;
pub mod smoothing;

pub use outlier::{clip_outliers, clip_station_outliers, mean_and_std, DEFAULT_OUTLIER_SIGMA};
pub use resample::{daily_max, resample_anchored, subtract_aligned, Aggregation};
pub use smoothing::{
    convolve_same, exponential_smoothing, moving_average, resolve_window, triangular_smoothing,
    triangular_weights, DEFAULT_MOVING_AVERAGE_WINDOW, DEFAULT_TRIANGULAR_WINDOW,
};
