//! CSV loaders and writers for the substation forecasting data folder.
//!
//! Readers use the `csv` crate and return [`TimeSeries`](peak_core::TimeSeries)
//! values; anything that can be skipped (masked units, short years,
//! duplicated rows) is recorded in [`Diagnostics`](peak_core::Diagnostics)
//! rather than failing the read.

pub mod layout;
pub mod national;
pub mod solution;
pub mod station;
pub mod submission;
pub mod timestamp;
pub mod weather;

pub use layout::{load_combined_loads, load_phase, DataLayout, PhaseData};
pub use national::{load_national_demand, read_national_year, year_grid};
pub use solution::{read_predictions, read_solution};
pub use station::{read_combined_load, read_training_data};
pub use submission::write_submission;
pub use timestamp::parse_timestamp;
pub use weather::read_weather;
