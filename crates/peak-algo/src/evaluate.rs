//! Daily-peak post-processing and method scoring.
//!
//! Each [`SmoothingMethod`] turns a per-timestamp forecast `p` and the
//! combined-load reference `c` into one value per calendar day, the daily
//! maximum of `c − p` after an optional transform of `c`.

use std::collections::BTreeMap;
use std::fmt;

use chrono::Duration;
use peak_core::{CandidateMethod, Diagnostics, StationId, TimeSeries};
use peak_ts::{
    daily_max, moving_average, resample_anchored, resolve_window, subtract_aligned,
    triangular_smoothing, Aggregation,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::metrics::mse;

/// Window used by the smoothed methods when none (or zero) is given.
pub const DEFAULT_POSTPROCESS_WINDOW: usize = 13;

/// Label of the cross-station mean row in an [`ErrorTable`].
pub const OVERALL_ROW: &str = "overall";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SmoothingMethod {
    DailyMax,
    HourlyMean,
    HourlyMax,
    AveragedSmoothedMax,
    WeightedSmoothedMax,
}

type PeakFn = fn(&TimeSeries, &TimeSeries, Option<usize>, &mut Diagnostics) -> TimeSeries;

static METHOD_TABLE: [(SmoothingMethod, &str, PeakFn); 5] = [
    (SmoothingMethod::DailyMax, "daily_max", daily_max_of_difference),
    (SmoothingMethod::HourlyMean, "hourly_mean", hourly_mean_then_max),
    (SmoothingMethod::HourlyMax, "hourly_max", hourly_max_then_max),
    (
        SmoothingMethod::AveragedSmoothedMax,
        "averaged_smoothed_max",
        averaged_smoothed_max,
    ),
    (
        SmoothingMethod::WeightedSmoothedMax,
        "weighted_smoothed_max",
        weighted_smoothed_max,
    ),
];

impl SmoothingMethod {
    pub const ALL: [SmoothingMethod; 5] = [
        SmoothingMethod::DailyMax,
        SmoothingMethod::HourlyMean,
        SmoothingMethod::HourlyMax,
        SmoothingMethod::AveragedSmoothedMax,
        SmoothingMethod::WeightedSmoothedMax,
    ];

    pub fn name(self) -> &'static str {
        self.entry().1
    }

    pub fn from_name(name: &str) -> Option<Self> {
        METHOD_TABLE
            .iter()
            .find(|(_, n, _)| *n == name)
            .map(|(method, _, _)| *method)
    }

    /// Whether the method smooths `c` and so takes a window.
    pub fn takes_window(self) -> bool {
        matches!(
            self,
            SmoothingMethod::AveragedSmoothedMax | SmoothingMethod::WeightedSmoothedMax
        )
    }

    fn entry(self) -> &'static (SmoothingMethod, &'static str, PeakFn) {
        // every variant has a row
        &METHOD_TABLE[self as usize]
    }
}

impl fmt::Display for SmoothingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A method together with its optional window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodCall {
    pub method: SmoothingMethod,
    pub window: Option<usize>,
}

impl MethodCall {
    pub fn new(method: SmoothingMethod, window: Option<usize>) -> Self {
        Self { method, window }
    }

    /// The fallback for unrecognized method names.
    pub fn fallback() -> Self {
        Self::new(
            SmoothingMethod::AveragedSmoothedMax,
            Some(DEFAULT_POSTPROCESS_WINDOW),
        )
    }

    /// Look a method up by name; unknown names fall back to
    /// `averaged_smoothed_max` with window 13.
    pub fn resolve(name: &str, window: Option<usize>, diag: &mut Diagnostics) -> Self {
        match SmoothingMethod::from_name(name) {
            Some(method) => Self::new(method, window),
            None => {
                let fallback = Self::fallback();
                warn!(method = name, fallback = %fallback.key(), "unknown post-process method");
                diag.warn_for(
                    "method",
                    &format!(
                        "unknown post-process method, switching to default: {}",
                        fallback.key()
                    ),
                    name,
                );
                fallback
            }
        }
    }

    /// Column key: `method` or `method-window`.
    pub fn key(&self) -> String {
        candidate_key(self.method.name(), self.window)
    }

    /// Daily peak estimates for one station.
    pub fn apply(
        &self,
        combined: &TimeSeries,
        prediction: &TimeSeries,
        diag: &mut Diagnostics,
    ) -> TimeSeries {
        if self.window.is_some() && !self.method.takes_window() {
            diag.warn("window", "window size not needed");
        }
        let (_, _, peak_fn) = self.method.entry();
        peak_fn(combined, prediction, self.window, diag)
    }
}

fn candidate_key(method: &str, window: Option<usize>) -> String {
    match window {
        Some(w) => format!("{method}-{w}"),
        None => method.to_string(),
    }
}

fn daily_max_of_difference(
    combined: &TimeSeries,
    prediction: &TimeSeries,
    _window: Option<usize>,
    _diag: &mut Diagnostics,
) -> TimeSeries {
    daily_max(&subtract_aligned(combined, prediction))
}

fn hourly_then_max(
    combined: &TimeSeries,
    prediction: &TimeSeries,
    agg: Aggregation,
) -> TimeSeries {
    let hourly = resample_anchored(combined, Duration::minutes(60), agg);
    daily_max(&subtract_aligned(&hourly, prediction))
}

fn hourly_mean_then_max(
    combined: &TimeSeries,
    prediction: &TimeSeries,
    _window: Option<usize>,
    _diag: &mut Diagnostics,
) -> TimeSeries {
    hourly_then_max(combined, prediction, Aggregation::Mean)
}

fn hourly_max_then_max(
    combined: &TimeSeries,
    prediction: &TimeSeries,
    _window: Option<usize>,
    _diag: &mut Diagnostics,
) -> TimeSeries {
    hourly_then_max(combined, prediction, Aggregation::Max)
}

fn averaged_smoothed_max(
    combined: &TimeSeries,
    prediction: &TimeSeries,
    window: Option<usize>,
    diag: &mut Diagnostics,
) -> TimeSeries {
    let window = resolve_window(window, DEFAULT_POSTPROCESS_WINDOW, diag);
    let smoothed = moving_average(combined, Some(window), diag);
    daily_max(&subtract_aligned(&smoothed, prediction))
}

fn weighted_smoothed_max(
    combined: &TimeSeries,
    prediction: &TimeSeries,
    window: Option<usize>,
    diag: &mut Diagnostics,
) -> TimeSeries {
    let window = resolve_window(window, DEFAULT_POSTPROCESS_WINDOW, diag);
    let smoothed = triangular_smoothing(combined, Some(window), diag);
    daily_max(&subtract_aligned(&smoothed, prediction))
}

/// Apply one method to every station that has both a forecast and a
/// combined-load series.
pub fn generate_predictions(
    call: &MethodCall,
    forecasts: &BTreeMap<StationId, TimeSeries>,
    combined: &BTreeMap<StationId, TimeSeries>,
    diag: &mut Diagnostics,
) -> BTreeMap<StationId, TimeSeries> {
    let mut out = BTreeMap::new();
    for (station, forecast) in forecasts {
        match combined.get(station) {
            Some(c) => {
                out.insert(station.clone(), call.apply(c, forecast, diag));
            }
            None => diag.error_for(
                "evaluate",
                "no combined load for station",
                station.as_str(),
            ),
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorRow {
    pub label: String,
    pub errors: Vec<f64>,
}

/// Station × method MSE table with a trailing `overall` row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorTable {
    pub methods: Vec<String>,
    pub rows: Vec<ErrorRow>,
}

impl ErrorTable {
    pub fn overall(&self) -> Option<&ErrorRow> {
        self.rows.iter().find(|r| r.label == OVERALL_ROW)
    }

    /// Method with the lowest finite overall error.
    pub fn best_method(&self) -> Option<(&str, f64)> {
        let overall = self.overall()?;
        self.methods
            .iter()
            .zip(&overall.errors)
            .filter(|(_, e)| e.is_finite())
            .min_by(|a, b| a.1.total_cmp(b.1))
            .map(|(m, e)| (m.as_str(), *e))
    }
}

/// Everything needed to score one station.
pub struct StationEvaluation<'a> {
    pub station: &'a StationId,
    pub forecast: &'a TimeSeries,
    pub combined: &'a TimeSeries,
    /// Ground-truth daily values indexed at midnight.
    pub truth: &'a TimeSeries,
}

/// Score every candidate on every station.
///
/// Daily estimates are matched to the truth by date; a truth day with no
/// estimate counts as `NaN`, which makes that cell `NaN`.
pub fn score_methods(
    stations: &[StationEvaluation<'_>],
    candidates: &[CandidateMethod],
    apply_abs: bool,
    diag: &mut Diagnostics,
) -> ErrorTable {
    let calls: Vec<(String, MethodCall)> = candidates
        .iter()
        .map(|c| {
            (
                candidate_key(&c.method, c.window),
                MethodCall::resolve(&c.method, c.window, diag),
            )
        })
        .collect();

    let mut rows = Vec::with_capacity(stations.len() + 1);
    for eval in stations {
        let errors = calls
            .iter()
            .map(|(key, call)| {
                let peaks = call.apply(eval.combined, eval.forecast, diag);
                let predicted: Vec<f64> = eval
                    .truth
                    .index()
                    .iter()
                    .map(|day| peaks.get(day).unwrap_or(f64::NAN))
                    .map(|v| if apply_abs { v.abs() } else { v })
                    .collect();
                mse(eval.truth.values(), &predicted).unwrap_or_else(|err| {
                    diag.error_for(
                        "evaluate",
                        &format!("{key}: {err}"),
                        eval.station.as_str(),
                    );
                    f64::NAN
                })
            })
            .collect();
        rows.push(ErrorRow {
            label: eval.station.to_string(),
            errors,
        });
    }

    let overall = (0..calls.len())
        .map(|j| {
            if rows.is_empty() {
                return f64::NAN;
            }
            rows.iter().map(|r| r.errors[j]).sum::<f64>() / rows.len() as f64
        })
        .collect();
    rows.push(ErrorRow {
        label: OVERALL_ROW.to_string(),
        errors: overall,
    });

    let table = ErrorTable {
        methods: calls.into_iter().map(|(key, _)| key).collect(),
        rows,
    };
    if let Some((method, error)) = table.best_method() {
        info!(method, error, "best post-process method");
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use peak_core::load_step;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 9, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    /// Two days of 15-minute samples with a daily bump at noon.
    fn combined() -> TimeSeries {
        let values = (0..192)
            .map(|i| if i % 96 == 48 { 50.0 } else { 10.0 + (i % 7) as f64 })
            .collect();
        TimeSeries::regular(start(), load_step(), values)
    }

    fn forecast() -> TimeSeries {
        TimeSeries::regular(start(), load_step(), vec![5.0; 192])
    }

    #[test]
    fn lookup_table_round_trips_names() {
        for method in SmoothingMethod::ALL {
            assert_eq!(SmoothingMethod::from_name(method.name()), Some(method));
        }
        assert_eq!(SmoothingMethod::from_name("bogus_method"), None);
    }

    #[test]
    fn daily_max_of_difference_per_day() {
        let mut diag = Diagnostics::new();
        let peaks = MethodCall::new(SmoothingMethod::DailyMax, None).apply(
            &combined(),
            &forecast(),
            &mut diag,
        );
        assert_eq!(peaks.len(), 2);
        assert_eq!(peaks.values(), &[45.0, 45.0]);
        assert!(!diag.has_issues());
    }

    #[test]
    fn unneeded_window_is_reported() {
        let mut diag = Diagnostics::new();
        MethodCall::new(SmoothingMethod::HourlyMax, Some(9)).apply(
            &combined(),
            &forecast(),
            &mut diag,
        );
        assert_eq!(diag.in_category("window").count(), 1);
    }

    #[test]
    fn hourly_mean_dampens_single_sample_peak() {
        let mut diag = Diagnostics::new();
        let hourly = MethodCall::new(SmoothingMethod::HourlyMean, None).apply(
            &combined(),
            &forecast(),
            &mut diag,
        );
        let hourly_max = MethodCall::new(SmoothingMethod::HourlyMax, None).apply(
            &combined(),
            &forecast(),
            &mut diag,
        );
        assert!(hourly.values()[0] < 45.0);
        assert_eq!(hourly_max.values()[0], 45.0);
    }

    #[test]
    fn unknown_method_matches_default_smoothed_max() {
        let mut diag = Diagnostics::new();
        let call = MethodCall::resolve("bogus_method", Some(3), &mut diag);
        assert_eq!(call, MethodCall::fallback());
        assert_eq!(diag.in_category("method").count(), 1);

        let fallback = call.apply(&combined(), &forecast(), &mut diag);
        let explicit = MethodCall::new(SmoothingMethod::AveragedSmoothedMax, Some(13)).apply(
            &combined(),
            &forecast(),
            &mut diag,
        );
        assert_eq!(fallback.index(), explicit.index());
        assert!(fallback
            .values()
            .iter()
            .zip(explicit.values())
            .all(|(a, b)| a.to_bits() == b.to_bits()));
    }

    #[test]
    fn missing_window_defaults_to_thirteen() {
        let mut diag = Diagnostics::new();
        let unset = MethodCall::new(SmoothingMethod::WeightedSmoothedMax, None).apply(
            &combined(),
            &forecast(),
            &mut diag,
        );
        assert_eq!(diag.in_category("window").count(), 1);
        let explicit = MethodCall::new(SmoothingMethod::WeightedSmoothedMax, Some(13)).apply(
            &combined(),
            &forecast(),
            &mut diag,
        );
        assert_eq!(unset.values(), explicit.values());
    }

    #[test]
    fn keys_follow_candidate_names() {
        let call = MethodCall::new(SmoothingMethod::AveragedSmoothedMax, Some(9));
        assert_eq!(call.key(), "averaged_smoothed_max-9");
        assert_eq!(
            MethodCall::new(SmoothingMethod::DailyMax, None).key(),
            "daily_max"
        );
    }

    #[test]
    fn error_table_has_overall_row() {
        let station_a = StationId::new("A");
        let station_b = StationId::new("B");
        let c = combined();
        let p = forecast();
        let days = TimeSeries::regular(start(), Duration::days(1), vec![45.0, 45.0]);
        let off = TimeSeries::regular(start(), Duration::days(1), vec![47.0, 43.0]);
        let stations = [
            StationEvaluation {
                station: &station_a,
                forecast: &p,
                combined: &c,
                truth: &days,
            },
            StationEvaluation {
                station: &station_b,
                forecast: &p,
                combined: &c,
                truth: &off,
            },
        ];
        let candidates = vec![
            CandidateMethod {
                method: "daily_max".into(),
                window: None,
            },
            CandidateMethod {
                method: "bogus".into(),
                window: None,
            },
        ];
        let mut diag = Diagnostics::new();
        let table = score_methods(&stations, &candidates, true, &mut diag);
        assert_eq!(table.methods, vec!["daily_max", "bogus"]);
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.rows[0].errors[0], 0.0);
        assert_eq!(table.rows[1].errors[0], 4.0);
        assert_eq!(table.overall().unwrap().errors[0], 2.0);
        assert_eq!(table.best_method().unwrap().0, "daily_max");
    }

    #[test]
    fn missing_combined_load_is_reported() {
        let forecasts = BTreeMap::from([(StationId::new("A"), forecast())]);
        let mut diag = Diagnostics::new();
        let out = generate_predictions(
            &MethodCall::fallback(),
            &forecasts,
            &BTreeMap::new(),
            &mut diag,
        );
        assert!(out.is_empty());
        assert!(diag.has_errors());
    }
}
