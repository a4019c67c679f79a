//! Seam to the external model-fitting routine.
//!
//! The pipeline never fits a model itself. A [`ModelFitter`] receives the
//! train features, labels and the assembled [`TensorTermSpec`]; the model it
//! returns predicts over the test features.

use std::collections::BTreeMap;

use peak_core::{Diagnostics, GamParams, PeakError, PeakResult, StationId, TermLayout, TimeSeries};
use tracing::{info, warn};

use crate::dataset::StationDataset;
use crate::metrics::mape;
use crate::table::FeatureTable;
use crate::terms::{assemble_terms, TensorTermSpec};

pub trait FittedModel {
    /// One prediction per row of `features`.
    fn predict(&self, features: &FeatureTable) -> PeakResult<Vec<f64>>;
}

pub trait ModelFitter {
    type Model: FittedModel;

    fn fit(
        &self,
        terms: &TensorTermSpec,
        features: &FeatureTable,
        labels: &[f64],
    ) -> PeakResult<Self::Model>;
}

/// A fitted model with its predictions for one station.
#[derive(Debug)]
pub struct TrainedStation<M> {
    pub model: M,
    pub terms: TensorTermSpec,
    /// MAPE of the model on its own train rows.
    pub train_mape: f64,
    /// In-sample predictions, when requested.
    pub fitted: Option<TimeSeries>,
    /// Predictions over the test window.
    pub forecast: TimeSeries,
}

/// Assemble terms, fit, score on the train rows and predict the test window.
pub fn train_station<F: ModelFitter>(
    fitter: &F,
    dataset: &StationDataset,
    layout: &TermLayout,
    params: GamParams,
    return_fitted: bool,
) -> PeakResult<TrainedStation<F::Model>> {
    let features = dataset.train.features();
    let labels = dataset
        .train
        .target()
        .ok_or_else(|| PeakError::Data("train table has no target column".into()))?;
    if features.column_names() != dataset.test.column_names() {
        return Err(PeakError::Data(
            "train and test feature columns differ".into(),
        ));
    }

    let terms = assemble_terms(
        &features.column_names(),
        dataset.num_fixed_col,
        layout,
        params,
    )?;
    let model = fitter.fit(&terms, &features, labels)?;

    let in_sample = model.predict(&features)?;
    let train_mape = mape(labels, &in_sample)?;
    let fitted = if return_fitted {
        Some(TimeSeries::new(features.index().to_vec(), in_sample)?)
    } else {
        None
    };
    let forecast = TimeSeries::new(dataset.test.index().to_vec(), model.predict(&dataset.test)?)?;

    Ok(TrainedStation {
        model,
        terms,
        train_mape,
        fitted,
        forecast,
    })
}

/// Train every station; failures are reported and the station left out.
pub fn train_all<F: ModelFitter>(
    fitter: &F,
    datasets: &BTreeMap<StationId, StationDataset>,
    layout: &TermLayout,
    params: GamParams,
    return_fitted: bool,
    diag: &mut Diagnostics,
) -> BTreeMap<StationId, TrainedStation<F::Model>> {
    let mut trained = BTreeMap::new();
    for (station, dataset) in datasets {
        match train_station(fitter, dataset, layout, params, return_fitted) {
            Ok(result) => {
                info!(station = %station, train_mape = result.train_mape, "trained station");
                trained.insert(station.clone(), result);
            }
            Err(err) => {
                warn!(station = %station, error = %err, "training failed");
                diag.error_for("training", &err.to_string(), station.as_str());
            }
        }
    }
    trained
}
