use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use csv::ReaderBuilder;
use peak_core::{Diagnostics, TimeSeries};

use crate::station::into_series;
use crate::timestamp::{parse_timestamp, parse_value};

pub const WEATHER_TIME_COLUMN: &str = "datetime";

/// Read an hourly weather file into one series per variable column.
///
/// Unnamed columns (a written index) are skipped; unparsable cells read as
/// `NaN`.
pub fn read_weather(
    path: &Path,
    entity: &str,
    diag: &mut Diagnostics,
) -> Result<BTreeMap<String, TimeSeries>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("opening weather file '{}'", path.display()))?;
    let headers = rdr.headers().context("reading weather header")?.clone();
    let time_col = headers
        .iter()
        .position(|h| h == WEATHER_TIME_COLUMN)
        .ok_or_else(|| anyhow!("{} has no '{WEATHER_TIME_COLUMN}' column", path.display()))?;
    let variables: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(i, h)| *i != time_col && !h.is_empty() && !h.starts_with("Unnamed"))
        .map(|(i, h)| (i, h.to_string()))
        .collect();

    let mut columns: Vec<Vec<(chrono::NaiveDateTime, f64)>> = vec![Vec::new(); variables.len()];
    let mut bad_cells = 0usize;
    for result in rdr.records() {
        let record = result.context("parsing weather record")?;
        let ts = parse_timestamp(record.get(time_col).unwrap_or_default())?;
        for (slot, (col, _)) in columns.iter_mut().zip(&variables) {
            let value = parse_value(record.get(*col).unwrap_or_default()).unwrap_or_else(|_| {
                bad_cells += 1;
                f64::NAN
            });
            slot.push((ts, value));
        }
    }
    if bad_cells > 0 {
        diag.warn_for(
            "weather",
            &format!("{bad_cells} unparsable weather cells read as missing"),
            entity,
        );
    }

    variables
        .into_iter()
        .zip(columns)
        .map(|((_, name), rows)| Ok((name, into_series(rows, entity, diag)?)))
        .collect()
}
