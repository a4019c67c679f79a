//! Unified error types for the forecasting pipeline
//!
//! [`PeakError`] is the common error representation used at crate boundaries.
//! Most pipeline conditions are not errors at all: unknown stations, unknown
//! post-processing methods and bad window sizes degrade to defaults and are
//! recorded in [`crate::Diagnostics`] instead. `PeakError` is reserved for
//! conditions where an operation cannot produce any meaningful output.
//!
//! # Example
//!
//! ```ignore
//! use peak_core::{PeakError, PeakResult};
//!
//! fn build(path: &str) -> PeakResult<()> {
//!     let config = PipelineConfig::load_from(path)?;
//!     run_pipeline(&config)?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Unified error type for pipeline operations.
#[derive(Error, Debug)]
pub enum PeakError {
    /// I/O errors (file access, directory listing, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Structural validation errors (mismatched lengths, unordered index)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors (missing column, invalid coefficient)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data errors (too few samples, empty series)
    #[error("Data error: {0}")]
    Data(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using PeakError.
pub type PeakResult<T> = Result<T, PeakError>;

impl From<anyhow::Error> for PeakError {
    fn from(err: anyhow::Error) -> Self {
        PeakError::Other(err.to_string())
    }
}

impl From<String> for PeakError {
    fn from(s: String) -> Self {
        PeakError::Other(s)
    }
}

impl From<&str> for PeakError {
    fn from(s: &str) -> Self {
        PeakError::Other(s.to_string())
    }
}

impl From<serde_json::Error> for PeakError {
    fn from(err: serde_json::Error) -> Self {
        PeakError::Parse(err.to_string())
    }
}

impl From<toml::de::Error> for PeakError {
    fn from(err: toml::de::Error) -> Self {
        PeakError::Parse(err.to_string())
    }
}

impl From<toml::ser::Error> for PeakError {
    fn from(err: toml::ser::Error) -> Self {
        PeakError::Other(err.to_string())
    }
}
