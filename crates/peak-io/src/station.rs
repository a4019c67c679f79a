//! Per-station load files.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use csv::ReaderBuilder;
use peak_core::{Diagnostics, TimeSeries};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::timestamp::{parse_timestamp, parse_value};

/// Row of a `<STATION> Training Data.csv` file. Extra columns are ignored.
#[derive(Deserialize)]
struct TrainingRecord {
    time: String,
    value: String,
    #[serde(default)]
    units: Option<i64>,
}

/// Row of a combined-load file.
#[derive(Deserialize)]
struct ValueRecord {
    time: String,
    value: String,
}

/// Read a station's training load.
///
/// Every row must carry the MW unit code; if any does not, a warning is
/// recorded and the non-MW rows are masked to `NaN`.
pub fn read_training_data(
    path: &Path,
    station: &str,
    mw_unit_code: i64,
    diag: &mut Diagnostics,
) -> Result<TimeSeries> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("opening training data '{}'", path.display()))?;
    let mut rows = Vec::new();
    let mut foreign_units = 0usize;
    for result in rdr.deserialize() {
        let record: TrainingRecord = result.context("parsing training data record")?;
        let ts = parse_timestamp(&record.time)?;
        let mut value = parse_value(&record.value)?;
        if record.units.is_some_and(|code| code != mw_unit_code) {
            foreign_units += 1;
            value = f64::NAN;
        }
        rows.push((ts, value));
    }
    if foreign_units > 0 {
        warn!(station, foreign_units, "non-MW unit codes in training data");
        diag.warn_for(
            "units",
            &format!("{foreign_units} rows with a unit code other than {mw_unit_code} masked"),
            station,
        );
    }
    let series = into_series(rows, station, diag)?;
    debug!(station, samples = series.len(), "read training data");
    Ok(series)
}

/// Read a `time,value` combined-load file.
pub fn read_combined_load(path: &Path, station: &str, diag: &mut Diagnostics) -> Result<TimeSeries> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("opening combined load '{}'", path.display()))?;
    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let record: ValueRecord = result.context("parsing combined load record")?;
        rows.push((parse_timestamp(&record.time)?, parse_value(&record.value)?));
    }
    into_series(rows, station, diag)
}

/// Sort rows and keep the first of any duplicated timestamp.
pub(crate) fn into_series(
    mut rows: Vec<(NaiveDateTime, f64)>,
    entity: &str,
    diag: &mut Diagnostics,
) -> Result<TimeSeries> {
    rows.sort_by_key(|(ts, _)| *ts);
    let before = rows.len();
    rows.dedup_by_key(|(ts, _)| *ts);
    if rows.len() < before {
        diag.warn_for(
            "data",
            &format!("{} duplicate timestamps dropped", before - rows.len()),
            entity,
        );
    }
    let (index, values) = rows.into_iter().unzip();
    Ok(TimeSeries::new(index, values)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn csv_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn reads_training_data_with_index_column() {
        let file = csv_file(
            ",time,value,units\n\
             0,2021-01-01 00:15:00,4.5,9\n\
             1,2021-01-01 00:00:00,4.0,9\n\
             2,2021-01-01 00:30:00,,9\n",
        );
        let mut diag = Diagnostics::new();
        let series = read_training_data(file.path(), "STRATTON CB 4041", 9, &mut diag).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.values()[0], 4.0);
        assert!(series.values()[2].is_nan());
        assert!(!diag.has_issues());
    }

    #[test]
    fn masks_foreign_units() {
        let file = csv_file(
            "time,value,units\n\
             2021-01-01 00:00:00,4.0,9\n\
             2021-01-01 00:15:00,4000.0,7\n",
        );
        let mut diag = Diagnostics::new();
        let series = read_training_data(file.path(), "STRATTON CB 4041", 9, &mut diag).unwrap();
        assert!(series.values()[1].is_nan());
        assert_eq!(diag.in_category("units").count(), 1);
    }

    #[test]
    fn duplicate_timestamps_are_reported() {
        let file = csv_file(
            "time,value\n\
             2021-01-01 00:00:00,1\n\
             2021-01-01 00:00:00,2\n",
        );
        let mut diag = Diagnostics::new();
        let series = read_combined_load(file.path(), "X", &mut diag).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(diag.warning_count(), 1);
    }
}
