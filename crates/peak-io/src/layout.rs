//! Data folder layout and whole-phase loading.
//!
//! ```text
//! <root>/
//!   phase-<n>/
//!     <STATION> Training Data.csv
//!     <STATION> Combined Load <suffix>.csv
//!     template_<n>.csv
//!     solution_phase<n>.csv
//!   weather_data/df_weather_<site>_hourly.csv
//!   national_demand/demanddata_<year>.csv
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use peak_core::{Diagnostics, PipelineConfig, StationId, StationRecord, TimeSeries};
use tracing::{info, warn};

use crate::national::load_national_demand;
use crate::station::{read_combined_load, read_training_data};
use crate::weather::read_weather;

pub const TRAINING_DATA_MARKER: &str = "Training Data";
pub const COMBINED_LOAD_MARKER: &str = "Combined Load";

#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn phase_dir(&self, phase: u8) -> PathBuf {
        self.root.join(format!("phase-{phase}"))
    }

    pub fn weather_file(&self, site: u32) -> PathBuf {
        self.root
            .join("weather_data")
            .join(format!("df_weather_{site}_hourly.csv"))
    }

    pub fn national_dir(&self) -> PathBuf {
        self.root.join("national_demand")
    }

    pub fn template_file(&self, phase: u8) -> PathBuf {
        self.phase_dir(phase).join(format!("template_{phase}.csv"))
    }

    pub fn solution_file(&self, phase: u8) -> PathBuf {
        self.phase_dir(phase)
            .join(format!("solution_phase{phase}.csv"))
    }

    /// First `.csv` in the phase folder that starts with the station name
    /// and contains `marker`. Files are checked in name order; a missing
    /// phase folder finds nothing.
    pub fn station_file(&self, phase: u8, station: &StationId, marker: &str) -> Result<Option<PathBuf>> {
        let dir = self.phase_dir(phase);
        if !dir.is_dir() {
            return Ok(None);
        }
        let mut names = fs::read_dir(&dir)
            .with_context(|| format!("listing '{}'", dir.display()))?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .collect::<Vec<_>>();
        names.sort();
        Ok(names
            .into_iter()
            .find(|name| {
                name.starts_with(station.as_str()) && name.contains(marker) && name.ends_with(".csv")
            })
            .map(|name| dir.join(name)))
    }
}

/// Everything one run needs from disk.
#[derive(Debug, Clone)]
pub struct PhaseData {
    pub stations: Vec<StationId>,
    pub records: BTreeMap<StationId, StationRecord>,
    pub national: TimeSeries,
}

/// Load the requested stations of a phase with their weather and the
/// national demand series.
///
/// Stations whose training data is missing are reported and left out. A
/// missing weather file leaves the station without weather. Nearby stations
/// are taken from the configured graph and loaded too, from whichever phase
/// folder lists them, so their lags are available to the dataset builder.
pub fn load_phase(
    layout: &DataLayout,
    phase: u8,
    requested: &[String],
    config: &PipelineConfig,
    diag: &mut Diagnostics,
) -> Result<PhaseData> {
    let stations = config.resolve_stations(phase, requested, diag);
    let mut to_load: Vec<(StationId, u8)> = stations.iter().map(|s| (s.clone(), phase)).collect();
    for station in &stations {
        for nearby in config.nearby.neighbours(station) {
            if to_load.iter().any(|(s, _)| s == nearby) {
                continue;
            }
            match home_phase(config, nearby) {
                Some(home) => to_load.push((nearby.clone(), home)),
                None => diag.warn_for(
                    "station",
                    &format!("nearby station {nearby} is on no phase roster"),
                    station.as_str(),
                ),
            }
        }
    }

    let mut records = BTreeMap::new();
    for (station, home) in &to_load {
        let Some(path) = layout.station_file(*home, station, TRAINING_DATA_MARKER)? else {
            warn!(station = %station, "no training data file");
            diag.error_for("file", "no training data file", station.as_str());
            continue;
        };
        let load = read_training_data(&path, station.as_str(), config.mw_unit_code, diag)?;
        let mut record = StationRecord::new(load)
            .with_nearby(config.nearby.neighbours(station).to_vec());
        match config.weather_sites.get(station) {
            Some(site) => {
                let path = layout.weather_file(*site);
                if path.exists() {
                    for (name, series) in read_weather(&path, station.as_str(), diag)? {
                        record = record.with_weather(name, series);
                    }
                } else {
                    diag.warn_for(
                        "file",
                        &format!("missing weather file '{}'", path.display()),
                        station.as_str(),
                    );
                }
            }
            None => diag.warn_for("file", "no weather site configured", station.as_str()),
        }
        records.insert(station.clone(), record);
    }

    let national = load_national_demand(&layout.national_dir(), &config.national_years, diag)?;
    let stations = stations
        .into_iter()
        .filter(|s| records.contains_key(s))
        .collect::<Vec<_>>();
    info!(phase, stations = stations.len(), records = records.len(), "loaded phase data");
    Ok(PhaseData {
        stations,
        records,
        national,
    })
}

fn home_phase(config: &PipelineConfig, station: &StationId) -> Option<u8> {
    config
        .phases
        .iter()
        .find(|(_, roster)| roster.contains(station))
        .and_then(|(phase, _)| phase.parse().ok())
}

/// Combined-load reference series for the given stations; missing files are
/// reported.
pub fn load_combined_loads(
    layout: &DataLayout,
    phase: u8,
    stations: &[StationId],
    diag: &mut Diagnostics,
) -> Result<BTreeMap<StationId, TimeSeries>> {
    let mut combined = BTreeMap::new();
    for station in stations {
        match layout.station_file(phase, station, COMBINED_LOAD_MARKER)? {
            Some(path) => {
                combined.insert(station.clone(), read_combined_load(&path, station.as_str(), diag)?);
            }
            None => diag.error_for("file", "no combined load file", station.as_str()),
        }
    }
    Ok(combined)
}
