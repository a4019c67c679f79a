use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use csv::ReaderBuilder;
use peak_core::{national_demand_step, Diagnostics, TimeSeries};
use tracing::{info, warn};

use crate::timestamp::parse_value;

pub const NATIONAL_DEMAND_COLUMN: &str = "ENGLAND_WALES_DEMAND";

/// The 30-minute grid covering `[year-01-01, (year+1)-01-01)`.
pub fn year_grid(year: i32) -> Result<Vec<NaiveDateTime>> {
    let start = NaiveDate::from_ymd_opt(year, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| anyhow!("invalid year {year}"))?;
    let end = NaiveDate::from_ymd_opt(year + 1, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| anyhow!("invalid year {}", year + 1))?;
    let step = national_demand_step();
    let mut grid = Vec::new();
    let mut ts = start;
    while ts < end {
        grid.push(ts);
        ts += step;
    }
    Ok(grid)
}

/// Read one year's demand column and place it on that year's grid.
///
/// The file's own settlement-period columns are ignored: rows are assigned
/// to grid slots in order. A row count that differs from the grid is
/// reported; extra rows are dropped and missing slots are `NaN`.
pub fn read_national_year(path: &Path, year: i32, diag: &mut Diagnostics) -> Result<TimeSeries> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .with_context(|| format!("opening national demand '{}'", path.display()))?;
    let column = rdr
        .headers()
        .context("reading national demand header")?
        .iter()
        .position(|h| h == NATIONAL_DEMAND_COLUMN)
        .ok_or_else(|| anyhow!("{} has no '{NATIONAL_DEMAND_COLUMN}' column", path.display()))?;
    let mut values = Vec::new();
    for result in rdr.records() {
        let record = result.context("parsing national demand record")?;
        values.push(parse_value(record.get(column).unwrap_or_default())?);
    }

    let grid = year_grid(year)?;
    if values.len() != grid.len() {
        warn!(year, rows = values.len(), slots = grid.len(), "national demand row count mismatch");
        diag.warn_for(
            "national",
            &format!("{} rows for {} half-hour slots", values.len(), grid.len()),
            &year.to_string(),
        );
        values.resize(grid.len(), f64::NAN);
    }
    Ok(TimeSeries::new(grid, values)?)
}

/// Concatenate the per-year series for `years`, in order. A year without a
/// file is reported and left as `NaN` on its grid.
pub fn load_national_demand(
    folder: &Path,
    years: &[i32],
    diag: &mut Diagnostics,
) -> Result<TimeSeries> {
    let mut parts = Vec::with_capacity(years.len());
    for &year in years {
        let path = folder.join(format!("demanddata_{year}.csv"));
        if !path.is_file() {
            warn!(year, path = %path.display(), "national demand file missing");
            diag.warn_for(
                "file",
                &format!("missing national demand file {}", path.display()),
                &year.to_string(),
            );
            let grid = year_grid(year)?;
            let missing = vec![f64::NAN; grid.len()];
            parts.push(TimeSeries::new(grid, missing)?);
            continue;
        }
        parts.push(read_national_year(&path, year, diag)?);
    }
    let series = TimeSeries::concat(parts)?;
    info!(samples = series.len(), years = years.len(), "loaded national demand");
    Ok(series)
}
