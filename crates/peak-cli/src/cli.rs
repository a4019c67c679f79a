use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Substation peak-demand forecasting pipeline", long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info", global = true)]
    pub log_level: tracing::Level,

    /// Pipeline configuration (TOML); built-in defaults when omitted
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load, preprocess and write per-station train/test feature tables
    Prepare(PrepareArgs),
    /// Print the tensor terms for a feature table
    Terms(TermsArgs),
    /// Score daily-peak methods for external forecasts
    Evaluate(EvaluateArgs),
    /// Print or write the pipeline configuration
    Config {
        /// Write the TOML to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TableFormat {
    #[default]
    Csv,
    Parquet,
}

impl TableFormat {
    pub fn extension(self) -> &'static str {
        match self {
            TableFormat::Csv => "csv",
            TableFormat::Parquet => "parquet",
        }
    }
}

#[derive(Args, Debug)]
pub struct PrepareArgs {
    /// Data folder containing phase-*/, weather_data/ and national_demand/
    #[arg(long)]
    pub data: PathBuf,

    #[arg(long, default_value_t = 1)]
    pub phase: u8,

    /// Station name prefix (repeatable); all phase stations when omitted
    #[arg(long = "station")]
    pub stations: Vec<String>,

    /// Output directory for tables and term specs
    #[arg(short, long)]
    pub out: PathBuf,

    #[arg(long, value_enum, default_value_t = TableFormat::Csv)]
    pub format: TableFormat,

    /// Skip load smoothing regardless of the configuration
    #[arg(long)]
    pub raw_input: bool,
}

#[derive(Args, Debug)]
pub struct TermsArgs {
    /// Feature table written by `prepare`
    pub table: PathBuf,

    /// Feature columns before the nearby-station columns; inferred from the
    /// station rosters when omitted
    #[arg(long)]
    pub num_fixed_col: Option<usize>,

    /// Write the JSON to a file instead of stdout
    #[arg(short, long)]
    pub out: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    #[arg(long)]
    pub data: PathBuf,

    #[arg(long, default_value_t = 1)]
    pub phase: u8,

    /// Station name prefix (repeatable); all phase stations when omitted
    #[arg(long = "station")]
    pub stations: Vec<String>,

    /// Long-format forecasts: station,timestamp,value
    #[arg(long)]
    pub predictions: PathBuf,

    /// Ground truth; defaults to phase-<n>/solution_phase<n>.csv
    #[arg(long)]
    pub solution: Option<PathBuf>,

    /// Write the error table as CSV
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Also write a submission into this directory
    #[arg(long)]
    pub submission: Option<PathBuf>,

    /// Post-process method used for the submission
    #[arg(long, default_value = "averaged_smoothed_max")]
    pub method: String,

    /// Window for the submission method
    #[arg(long)]
    pub window: Option<usize>,
}
