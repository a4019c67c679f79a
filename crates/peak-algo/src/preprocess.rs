//! Signal preparation over all stations of a run.

use std::collections::BTreeMap;

use peak_core::{Diagnostics, PipelineConfig, StationId, StationRecord, TimeSeries};
use peak_ts::{clip_station_outliers, exponential_smoothing, moving_average, triangular_smoothing};
use tracing::{info, warn};

/// Exponentially smooth each configured weather variable of every station.
///
/// Variables a station lacks are reported and skipped; variables that are
/// not configured are dropped from the record.
pub fn smooth_weather(
    records: &mut BTreeMap<StationId, StationRecord>,
    config: &PipelineConfig,
    diag: &mut Diagnostics,
) {
    for (station, record) in records.iter_mut() {
        let mut smoothed = BTreeMap::new();
        for variable in &config.weather {
            let Some(series) = record.weather.get(&variable.name) else {
                diag.warn_for(
                    "weather",
                    &format!("missing weather variable '{}'", variable.name),
                    station.as_str(),
                );
                continue;
            };
            match exponential_smoothing(series, variable.alpha, variable.cubic) {
                Ok(series) => {
                    smoothed.insert(variable.name.clone(), series);
                }
                Err(err) => diag.error_for("weather", &err.to_string(), station.as_str()),
            }
        }
        record.weather = smoothed;
    }
}

pub fn remove_load_outliers(
    records: &mut BTreeMap<StationId, StationRecord>,
    config: &PipelineConfig,
) {
    for (station, record) in records.iter_mut() {
        let before = record.load.missing_count();
        record.load = clip_station_outliers(
            station,
            &record.load,
            &config.outlier_stations,
            config.outlier_sigma,
        );
        let removed = record.load.missing_count() - before;
        if removed > 0 {
            info!(station = %station, removed, "removed load outliers");
        }
    }
}

pub fn smooth_loads(
    records: &mut BTreeMap<StationId, StationRecord>,
    window: usize,
    diag: &mut Diagnostics,
) {
    for record in records.values_mut() {
        record.load = moving_average(&record.load, Some(window), diag);
    }
}

pub fn smooth_national_demand(
    national: &TimeSeries,
    window: usize,
    diag: &mut Diagnostics,
) -> TimeSeries {
    triangular_smoothing(national, Some(window), diag)
}

/// Run the full preparation stage and return the smoothed national demand.
///
/// Order: weather, national demand, outlier removal, then load smoothing when
/// `config.smooth_input` is set.
pub fn preprocess(
    records: &mut BTreeMap<StationId, StationRecord>,
    national: &TimeSeries,
    config: &PipelineConfig,
    diag: &mut Diagnostics,
) -> TimeSeries {
    smooth_weather(records, config, diag);
    let national = smooth_national_demand(national, config.national_window, diag);
    remove_load_outliers(records, config);
    if config.smooth_input {
        smooth_loads(records, config.load_window, diag);
    }
    if diag.has_errors() {
        warn!(summary = %diag.summary(), "preprocessing reported issues");
    }
    national
}
