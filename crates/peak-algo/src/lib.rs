//! Dataset building, term assembly and forecast evaluation for substation
//! peak-demand models.
//!
//! The crate stops at the model boundary: [`model::ModelFitter`] is the seam
//! to whatever fits the additive model. Everything before it (feature tables,
//! tensor terms) and after it (daily-peak post-processing, scoring) lives here.

pub mod dataset;
pub mod evaluate;
pub mod io;
pub mod metrics;
pub mod model;
pub mod preprocess;
pub mod table;
pub mod terms;

pub use dataset::{pack_datasets, DatasetBuilder, StationDataset, LAG};
pub use evaluate::{
    generate_predictions, score_methods, ErrorRow, ErrorTable, MethodCall, SmoothingMethod,
    StationEvaluation, DEFAULT_POSTPROCESS_WINDOW,
};
pub use io::{persist_table, read_table, OutputStage};
pub use metrics::{mape, mse};
pub use model::{train_all, train_station, FittedModel, ModelFitter, TrainedStation};
pub use preprocess::preprocess;
pub use table::{Column, FeatureTable, TARGET_COLUMN};
pub use terms::{assemble_terms, TensorTerm, TensorTermSpec};
