use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use peak_core::{StationId, TimeSeries};
use tracing::info;

/// Fill a template's last column with per-station daily predictions.
///
/// Row blocks of `days_per_station` are assigned to `stations` in order.
/// With `clamp_negative`, negative predictions become zero. The file is
/// written as `phase-<phase>_<UTC timestamp>.csv` under `output_dir`.
pub fn write_submission(
    template: &Path,
    output_dir: &Path,
    phase: u8,
    stations: &[StationId],
    predictions: &BTreeMap<StationId, TimeSeries>,
    days_per_station: usize,
    clamp_negative: bool,
) -> Result<PathBuf> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .from_path(template)
        .with_context(|| format!("opening template '{}'", template.display()))?;
    let headers = rdr.headers().context("reading template header")?.clone();
    if headers.is_empty() {
        bail!("template '{}' has no columns", template.display());
    }
    let rows = rdr
        .records()
        .collect::<Result<Vec<_>, _>>()
        .context("reading template rows")?;
    let expected = stations.len() * days_per_station;
    if rows.len() != expected {
        bail!(
            "template has {} rows, expected {expected} ({} stations × {days_per_station} days)",
            rows.len(),
            stations.len()
        );
    }

    let mut filled = Vec::with_capacity(expected);
    for (station, block) in stations.iter().zip(rows.chunks(days_per_station.max(1))) {
        let values = predictions
            .get(station)
            .ok_or_else(|| anyhow!("no predictions for station {station}"))?
            .values();
        if values.len() < block.len() {
            bail!(
                "station {station} has {} daily predictions, template needs {}",
                values.len(),
                block.len()
            );
        }
        for (row, value) in block.iter().zip(values) {
            let value = if clamp_negative && *value < 0.0 { 0.0 } else { *value };
            filled.push(replace_last(row, &value.to_string()));
        }
    }

    fs::create_dir_all(output_dir)
        .with_context(|| format!("creating output directory '{}'", output_dir.display()))?;
    let output = output_dir.join(format!(
        "phase-{phase}_{}.csv",
        Utc::now().format("%Y-%m-%d_%H-%M-%S")
    ));
    let mut wtr = WriterBuilder::new()
        .from_path(&output)
        .with_context(|| format!("creating submission '{}'", output.display()))?;
    wtr.write_record(&headers)?;
    for row in &filled {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    info!(output = %output.display(), rows = filled.len(), "submission written");
    Ok(output)
}

fn replace_last(row: &StringRecord, value: &str) -> StringRecord {
    let last = row.len().saturating_sub(1);
    row.iter()
        .enumerate()
        .map(|(i, field)| if i == last { value } else { field })
        .collect()
}
