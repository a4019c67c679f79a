//! # peak-core: Substation Forecasting Core Types
//!
//! Shared data structures for the peak-demand forecasting pipeline.
//!
//! ## Data Model
//!
//! - [`TimeSeries`] - strictly increasing timestamps with one `f64` each; `NaN` marks a missing sample
//! - [`StationId`] - substation identifier (e.g. `BOURNVILLE CB 7`)
//! - [`StationRecord`] - one station's load, smoothed weather variables and nearby stations
//! - [`PipelineConfig`] - immutable configuration tables passed into every stage
//!
//! ## Sampling
//!
//! Each source keeps its native frequency: load every 15 minutes, weather
//! hourly, national demand every 30 minutes. Nothing is resampled when
//! features are assembled; lookups are exact timestamp matches and
//! non-matching rows are later dropped.
//!
//! ## Modules
//!
//! - [`config`] - pipeline configuration and TOML persistence
//! - [`diagnostics`] - collected non-fatal issues
//! - [`error`] - [`PeakError`] and [`PeakResult`]
//! - [`series`] - [`TimeSeries`] and native sampling steps

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod series;

pub use config::{
    CandidateMethod, EvaluationConfig, GamParams, NearbyGraph, PipelineConfig, TermLayout,
    WeatherVariable, MW_UNIT_CODE,
};
pub use diagnostics::{DiagnosticIssue, Diagnostics, Severity};
pub use error::{PeakError, PeakResult};
pub use series::{load_step, national_demand_step, weather_step, TimeSeries};

/// Substation identifier, stored exactly as it appears in the roster.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StationId(String);

impl StationId {
    #[inline]
    pub fn new(name: impl Into<String>) -> Self {
        StationId(name.into())
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything the dataset builder needs for one station.
#[derive(Debug, Clone, Default)]
pub struct StationRecord {
    /// Load at 15-minute resolution.
    pub load: TimeSeries,
    /// Weather variable name → hourly series.
    pub weather: BTreeMap<String, TimeSeries>,
    /// Stations whose load becomes a feature of this one, in column order.
    pub nearby: Vec<StationId>,
}

impl StationRecord {
    pub fn new(load: TimeSeries) -> Self {
        Self {
            load,
            ..Self::default()
        }
    }

    pub fn with_weather(mut self, name: impl Into<String>, series: TimeSeries) -> Self {
        self.weather.insert(name.into(), series);
        self
    }

    pub fn with_nearby(mut self, nearby: Vec<StationId>) -> Self {
        self.nearby = nearby;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn station_id_roundtrips_as_plain_string() {
        let id = StationId::new("STRATTON CB 4041");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"STRATTON CB 4041\"");
        let back: StationId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn station_record_builder() {
        let record = StationRecord::new(TimeSeries::default())
            .with_weather("temperature", TimeSeries::default())
            .with_nearby(vec![StationId::new("BOURNVILLE CB 7")]);
        assert!(record.weather.contains_key("temperature"));
        assert_eq!(record.nearby.len(), 1);
    }
}
