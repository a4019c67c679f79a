//! Persistence of feature tables through polars DataFrames.
//!
//! Tables are written under a per-stage directory next to the requested
//! output (`out/dataset-train/x.csv` for `out/x.csv`) and then copied into
//! place. Timestamps travel as text in the `timestamp` column.

use std::{
    ffi::OsStr,
    fs::{self, File},
    path::{Path, PathBuf},
};

use anyhow::{anyhow, bail, Context, Result};
use chrono::NaiveDateTime;
use polars::prelude::*;
use tracing::info;

use crate::table::FeatureTable;

/// Column holding the row timestamps in persisted tables.
pub const TIMESTAMP_COLUMN: &str = "timestamp";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy)]
pub enum OutputStage {
    DatasetTrain,
    DatasetTest,
}

impl OutputStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputStage::DatasetTrain => "dataset-train",
            OutputStage::DatasetTest => "dataset-test",
        }
    }
}

/// On-disk format, chosen by file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameFormat {
    Csv,
    Parquet,
}

impl FrameFormat {
    fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(OsStr::to_str)
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(FrameFormat::Csv),
            "parquet" if cfg!(feature = "parquet") => Ok(FrameFormat::Parquet),
            "parquet" => bail!("parquet support is disabled; rebuild with the 'parquet' feature"),
            other => bail!(
                "unsupported table extension '{other}' for {}; use .csv or .parquet",
                path.display()
            ),
        }
    }
}

pub fn staged_output_path(output: &Path, stage: &str) -> PathBuf {
    let dir = output.parent().unwrap_or_else(|| Path::new("."));
    let name = output.file_name().unwrap_or_else(|| OsStr::new("output"));
    dir.join(stage).join(name)
}

pub fn table_to_dataframe(table: &FeatureTable) -> Result<DataFrame> {
    let stamps: Vec<String> = table
        .index()
        .iter()
        .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string())
        .collect();
    let columns = std::iter::once(Series::new(TIMESTAMP_COLUMN, stamps))
        .chain(
            table
                .columns()
                .iter()
                .map(|c| Series::new(&c.name, c.values.as_slice())),
        )
        .collect::<Vec<_>>();
    DataFrame::new(columns).context("building feature DataFrame")
}

/// Write a table to `output` via its stage directory; returns the staged path.
pub fn persist_table(table: &FeatureTable, output: &Path, stage: OutputStage) -> Result<PathBuf> {
    let format = FrameFormat::from_path(output)?;
    let mut df = table_to_dataframe(table)?;
    let staged = staged_output_path(output, stage.as_str());
    ensure_parent(&staged)?;
    write_frame(&mut df, &staged, format)?;
    ensure_parent(output)?;
    fs::copy(&staged, output)
        .with_context(|| format!("copying {} to {}", staged.display(), output.display()))?;
    info!(
        stage = stage.as_str(),
        rows = table.height(),
        columns = table.width(),
        output = %output.display(),
        "persisted feature table"
    );
    Ok(staged)
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => fs::create_dir_all(dir)
            .with_context(|| format!("creating output directory '{}'", dir.display())),
        _ => Ok(()),
    }
}

fn write_frame(df: &mut DataFrame, path: &Path, format: FrameFormat) -> Result<()> {
    let mut file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    match format {
        FrameFormat::Csv => CsvWriter::new(&mut file)
            .finish(df)
            .with_context(|| format!("writing CSV table {}", path.display())),
        #[cfg(feature = "parquet")]
        FrameFormat::Parquet => ParquetWriter::new(&mut file)
            .finish(df)
            .map(|_| ())
            .with_context(|| format!("writing Parquet table {}", path.display())),
        #[cfg(not(feature = "parquet"))]
        FrameFormat::Parquet => Err(anyhow!("parquet support is disabled")),
    }
}

fn read_frame(path: &Path) -> Result<DataFrame> {
    let format = FrameFormat::from_path(path)?;
    let mut file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    match format {
        FrameFormat::Csv => CsvReader::new(&mut file)
            .has_header(true)
            .finish()
            .with_context(|| format!("reading CSV table {}", path.display())),
        #[cfg(feature = "parquet")]
        FrameFormat::Parquet => ParquetReader::new(&mut file)
            .finish()
            .with_context(|| format!("reading Parquet table {}", path.display())),
        #[cfg(not(feature = "parquet"))]
        FrameFormat::Parquet => Err(anyhow!("parquet support is disabled")),
    }
}

/// Read a table written by [`persist_table`]. Nulls become `NaN`.
pub fn read_table(path: &Path) -> Result<FeatureTable> {
    let df = read_frame(path)?;
    let timestamps = df
        .column(TIMESTAMP_COLUMN)
        .with_context(|| format!("{} has no '{TIMESTAMP_COLUMN}' column", path.display()))?
        .cast(&DataType::Utf8)?;
    let index = timestamps
        .utf8()?
        .into_iter()
        .map(|raw| {
            let raw = raw.ok_or_else(|| anyhow!("null timestamp in {}", path.display()))?;
            NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT)
                .with_context(|| format!("parsing timestamp '{raw}'"))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut table = FeatureTable::new(index);
    for series in df.get_columns() {
        if series.name() == TIMESTAMP_COLUMN {
            continue;
        }
        let values = series
            .cast(&DataType::Float64)
            .with_context(|| format!("casting column '{}' to Float64", series.name()))?
            .f64()?
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect();
        table.push_column(series.name(), values)?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use tempfile::tempdir;

    fn table() -> FeatureTable {
        let start = NaiveDate::from_ymd_opt(2021, 7, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let mut table =
            FeatureTable::new((0..3).map(|i| start + Duration::minutes(15 * i)).collect());
        table.push_column("prev_2_mo", vec![1.0, 2.0, 3.5]).unwrap();
        table
            .push_column("BRADLEY STOKE CB 8", vec![4.0, 5.0, 6.0])
            .unwrap();
        table
    }

    #[test]
    fn staged_path_nests_under_stage() {
        let staged = staged_output_path(Path::new("out/train.csv"), "dataset-train");
        assert_eq!(staged, Path::new("out/dataset-train/train.csv"));
    }

    #[test]
    fn csv_persist_and_reload() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("stratton_train.csv");
        let staged = persist_table(&table(), &output, OutputStage::DatasetTrain).unwrap();
        assert!(staged.exists());
        assert!(output.exists());

        let back = read_table(&output).unwrap();
        assert_eq!(back.column_names(), vec!["prev_2_mo", "BRADLEY STOKE CB 8"]);
        assert_eq!(back.index(), table().index());
        assert_eq!(back.column("prev_2_mo").unwrap(), &[1.0, 2.0, 3.5]);
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempdir().unwrap();
        let output = dir.path().join("table.json");
        assert!(persist_table(&table(), &output, OutputStage::DatasetTest).is_err());
    }
}
