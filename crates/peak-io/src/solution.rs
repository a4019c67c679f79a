//! Ground-truth daily values and external forecasts.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{Duration, NaiveTime};
use csv::ReaderBuilder;
use peak_core::{Diagnostics, StationId, TimeSeries};
use serde::Deserialize;

use crate::station::into_series;
use crate::timestamp::{parse_solution_date, parse_timestamp, parse_value};

#[derive(Deserialize)]
struct SolutionRecord {
    date: String,
    value: String,
}

#[derive(Deserialize)]
struct PredictionRecord {
    station: String,
    timestamp: String,
    value: String,
}

/// Read a solution file as consecutive per-station blocks.
///
/// Rows are taken in file order, `days_per_station` per station in roster
/// order; each block is indexed by its dates at midnight. A row count that
/// does not match the roster is reported and short blocks are kept as-is.
pub fn read_solution(
    path: &Path,
    stations: &[StationId],
    days_per_station: usize,
    diag: &mut Diagnostics,
) -> Result<BTreeMap<StationId, TimeSeries>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("opening solution '{}'", path.display()))?;
    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let record: SolutionRecord = result.context("parsing solution record")?;
        let day = parse_solution_date(&record.date)?.and_time(NaiveTime::default());
        rows.push((day, parse_value(&record.value)?));
    }

    let expected = stations.len() * days_per_station;
    if rows.len() != expected {
        diag.warn(
            "solution",
            &format!(
                "{} solution rows, expected {expected} for {} stations",
                rows.len(),
                stations.len()
            ),
        );
    }

    let mut blocks = BTreeMap::new();
    for (station, chunk) in stations.iter().zip(rows.chunks(days_per_station.max(1))) {
        let series = into_series(chunk.to_vec(), station.as_str(), diag)?;
        if series.step().is_some_and(|step| step != Duration::days(1)) {
            diag.warn_for("solution", "solution dates are not daily", station.as_str());
        }
        blocks.insert(station.clone(), series);
    }
    Ok(blocks)
}

/// Read long-format forecasts: `station,timestamp,value`.
pub fn read_predictions(path: &Path, diag: &mut Diagnostics) -> Result<BTreeMap<StationId, TimeSeries>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("opening predictions '{}'", path.display()))?;
    let mut grouped: BTreeMap<StationId, Vec<_>> = BTreeMap::new();
    for result in rdr.deserialize() {
        let record: PredictionRecord = result.context("parsing prediction record")?;
        grouped
            .entry(StationId::new(record.station.trim()))
            .or_default()
            .push((parse_timestamp(&record.timestamp)?, parse_value(&record.value)?));
    }
    grouped
        .into_iter()
        .map(|(station, rows)| {
            let series = into_series(rows, station.as_str(), diag)?;
            Ok((station, series))
        })
        .collect()
}
