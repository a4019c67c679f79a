//! Per-station train/test feature tables.
//!
//! Train rows pair the load at position `i` with the load `LAG` samples
//! earlier; test rows carry the final `LAG` loads forward onto the `LAG`
//! timestamps after the series ends. National demand and weather are looked
//! up by exact timestamp, so rows whose timestamp has no match end up with a
//! `NaN` and are dropped with every other incomplete row.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use chrono::{Datelike, NaiveDateTime, Timelike};
use peak_core::{
    load_step, Diagnostics, PeakError, PeakResult, PipelineConfig, StationId, StationRecord,
    TimeSeries,
};
use tracing::{debug, info, warn};

use crate::table::{FeatureTable, TARGET_COLUMN};

/// Lookback in 15-minute samples: 56 days.
pub const LAG: usize = 5376;

pub const LAG_COLUMN: &str = "prev_2_mo";
pub const NATIONAL_COLUMN: &str = "national";
pub const CALENDAR_COLUMNS: [&str; 5] = ["month", "hour", "day", "doW_x", "doW_y"];

/// Train and test tables for one station.
#[derive(Debug, Clone)]
pub struct StationDataset {
    pub train: FeatureTable,
    pub test: FeatureTable,
    /// Count of feature columns that precede the nearby-station columns.
    pub num_fixed_col: usize,
}

impl StationDataset {
    /// Names of the nearby-station columns, in table order.
    pub fn nearby_columns(&self) -> Vec<&str> {
        self.test.column_names()[self.num_fixed_col..].to_vec()
    }
}

/// Builds [`StationDataset`]s from preprocessed station records.
pub struct DatasetBuilder<'a> {
    config: &'a PipelineConfig,
    input_smoothed: bool,
}

impl<'a> DatasetBuilder<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self {
            config,
            input_smoothed: config.smooth_input,
        }
    }

    /// Whether the load handed in was smoothed; drops the first train row.
    pub fn input_smoothed(mut self, smoothed: bool) -> Self {
        self.input_smoothed = smoothed;
        self
    }

    /// Build one station's dataset, or report why it cannot be built.
    pub fn build(
        &self,
        station: &StationId,
        records: &BTreeMap<StationId, StationRecord>,
        national: &TimeSeries,
        diag: &mut Diagnostics,
    ) -> Option<StationDataset> {
        let Some(record) = records.get(station) else {
            diag.error_for("station", "no record for station", station.as_str());
            return None;
        };
        let load = &record.load;
        if load.len() < LAG {
            diag.error_for(
                "station",
                &format!("load has {} samples, fewer than the {LAG}-sample lag", load.len()),
                station.as_str(),
            );
            return None;
        }

        match self.build_tables(station, record, records, national, diag) {
            Ok(dataset) => {
                info!(
                    station = %station,
                    train_rows = dataset.train.height(),
                    test_rows = dataset.test.height(),
                    num_fixed_col = dataset.num_fixed_col,
                    "built station dataset"
                );
                Some(dataset)
            }
            Err(err) => {
                diag.error_for("dataset", &err.to_string(), station.as_str());
                None
            }
        }
    }

    fn build_tables(
        &self,
        station: &StationId,
        record: &StationRecord,
        records: &BTreeMap<StationId, StationRecord>,
        national: &TimeSeries,
        diag: &mut Diagnostics,
    ) -> PeakResult<StationDataset> {
        let load = record.load.values();
        let split = load.len() - LAG;

        let train_index = record.load.index()[LAG..].to_vec();
        let test_index = future_index(&record.load);

        let mut train = FeatureTable::new(train_index);
        train.push_column(LAG_COLUMN, load[..split].to_vec())?;
        train.push_column(TARGET_COLUMN, load[LAG..].to_vec())?;
        let mut test = FeatureTable::new(test_index);
        test.push_column(LAG_COLUMN, load[split..].to_vec())?;

        for table in [&mut train, &mut test] {
            self.attach_context(table, station, record, national, diag)?;
        }
        let num_fixed_col = test.width();

        for nearby in &record.nearby {
            let (train_values, test_values) = match records.get(nearby) {
                Some(other) => {
                    if other.load.len() != record.load.len() {
                        diag.warn_for(
                            "nearby",
                            &format!(
                                "nearby station {nearby} has {} samples, station has {}",
                                other.load.len(),
                                record.load.len()
                            ),
                            station.as_str(),
                        );
                    }
                    nearby_lag_values(other.load.values(), train.height())
                }
                None => {
                    diag.error_for(
                        "nearby",
                        &format!("nearby station {nearby} has no record"),
                        station.as_str(),
                    );
                    (vec![f64::NAN; train.height()], vec![f64::NAN; LAG])
                }
            };
            train.push_column(nearby.as_str(), train_values)?;
            test.push_column(nearby.as_str(), test_values)?;
        }

        let dropped_train = train.drop_incomplete_rows();
        let dropped_test = test.drop_incomplete_rows();
        if self.input_smoothed {
            train.drop_first_row();
        }
        debug!(
            station = %station,
            dropped_train,
            dropped_test,
            "dropped incomplete rows"
        );
        if train.is_empty() {
            warn!(station = %station, dropped_train, "train table is empty");
            return Err(PeakError::Data(format!(
                "no complete train rows after dropping {dropped_train} incomplete rows"
            )));
        }

        Ok(StationDataset {
            train,
            test,
            num_fixed_col,
        })
    }

    /// National demand, calendar features and weather, in column order.
    fn attach_context(
        &self,
        table: &mut FeatureTable,
        station: &StationId,
        record: &StationRecord,
        national: &TimeSeries,
        diag: &mut Diagnostics,
    ) -> PeakResult<()> {
        let index = table.index().to_vec();
        table.push_column(NATIONAL_COLUMN, lookup(national, &index))?;
        for (name, values) in CALENDAR_COLUMNS.iter().zip(calendar_features(&index)) {
            table.push_column(*name, values)?;
        }
        for variable in &self.config.weather {
            let values = match record.weather.get(&variable.name) {
                Some(series) => lookup(series, &index),
                None => {
                    diag.warn_for(
                        "weather",
                        &format!("missing weather variable '{}'", variable.name),
                        station.as_str(),
                    );
                    vec![f64::NAN; index.len()]
                }
            };
            table.push_column(variable.name.as_str(), values)?;
        }
        Ok(())
    }
}

/// Build every station's dataset; stations that fail are reported and left out.
pub fn pack_datasets(
    builder: &DatasetBuilder<'_>,
    stations: &[StationId],
    records: &BTreeMap<StationId, StationRecord>,
    national: &TimeSeries,
    diag: &mut Diagnostics,
) -> BTreeMap<StationId, StationDataset> {
    let build_one = |station: &StationId| {
        let mut local = Diagnostics::new();
        let dataset = builder.build(station, records, national, &mut local);
        (station.clone(), dataset, local)
    };

    #[cfg(feature = "parallel")]
    let built: Vec<_> = {
        use rayon::prelude::*;
        stations.par_iter().map(build_one).collect()
    };
    #[cfg(not(feature = "parallel"))]
    let built: Vec<_> = stations.iter().map(build_one).collect();

    let mut datasets = BTreeMap::new();
    for (station, dataset, local) in built {
        diag.merge(local);
        if let Some(dataset) = dataset {
            datasets.insert(station, dataset);
        }
    }
    datasets
}

/// `LAG` timestamps following the last sample at the native load step.
fn future_index(load: &TimeSeries) -> Vec<NaiveDateTime> {
    let step = load_step();
    let Some(last) = load.last_timestamp() else {
        return Vec::new();
    };
    (1..=LAG as i32).map(|k| last + step * k).collect()
}

/// Positional lag values from a nearby station: train takes its pre-test
/// samples, test takes its final `LAG`.
fn nearby_lag_values(values: &[f64], train_rows: usize) -> (Vec<f64>, Vec<f64>) {
    let split = values.len().saturating_sub(LAG);
    let head = &values[..split];
    let train = (0..train_rows)
        .map(|i| head.get(i).copied().unwrap_or(f64::NAN))
        .collect();
    let tail = &values[split..];
    let test = (0..LAG)
        .map(|i| tail.get(i).copied().unwrap_or(f64::NAN))
        .collect();
    (train, test)
}

fn lookup(series: &TimeSeries, index: &[NaiveDateTime]) -> Vec<f64> {
    index
        .iter()
        .map(|ts| series.get(ts).unwrap_or(f64::NAN))
        .collect()
}

/// Month, hour, day-of-year and the day-of-week sine/cosine pair.
fn calendar_features(index: &[NaiveDateTime]) -> [Vec<f64>; 5] {
    let mut columns: [Vec<f64>; 5] = Default::default();
    for ts in index {
        let angle = ts.weekday().num_days_from_monday() as f64 / 7.0 * 2.0 * PI;
        columns[0].push(ts.month() as f64);
        columns[1].push(ts.hour() as f64);
        columns[2].push(ts.ordinal() as f64);
        columns[3].push(angle.sin());
        columns[4].push(angle.cos());
    }
    columns
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use peak_core::{national_demand_step, weather_step};

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn config_without_weather() -> PipelineConfig {
        PipelineConfig {
            weather: Vec::new(),
            ..PipelineConfig::default()
        }
    }

    fn national(len: usize) -> TimeSeries {
        TimeSeries::regular(start(), national_demand_step(), vec![30_000.0; len])
    }

    fn ramp(len: usize) -> TimeSeries {
        TimeSeries::regular(start(), load_step(), (0..len).map(|i| i as f64).collect())
    }

    #[test]
    fn short_series_is_reported_and_skipped() {
        let config = config_without_weather();
        let station = StationId::new("STRATTON CB 4041");
        let records = BTreeMap::from([(station.clone(), StationRecord::new(ramp(100)))]);
        let mut diag = Diagnostics::new();
        let built = DatasetBuilder::new(&config).build(&station, &records, &national(100), &mut diag);
        assert!(built.is_none());
        assert_eq!(diag.error_count(), 1);
    }

    #[test]
    fn unknown_station_is_reported() {
        let config = config_without_weather();
        let mut diag = Diagnostics::new();
        let built = pack_datasets(
            &DatasetBuilder::new(&config),
            &[StationId::new("NOWHERE")],
            &BTreeMap::new(),
            &national(10),
            &mut diag,
        );
        assert!(built.is_empty());
        assert!(diag.has_errors());
    }

    #[test]
    fn lag_alignment_and_split() {
        let config = config_without_weather();
        let len = LAG + 200;
        let station = StationId::new("STRATTON CB 4041");
        let records = BTreeMap::from([(station.clone(), StationRecord::new(ramp(len)))]);
        // national covers everything at 30-minute spacing, including the future window
        let national = national(len);
        let mut diag = Diagnostics::new();
        let dataset = DatasetBuilder::new(&config)
            .input_smoothed(false)
            .build(&station, &records, &national, &mut diag)
            .unwrap();

        let train = &dataset.train;
        // only on-the-half-hour rows have a national value
        assert_eq!(train.height(), 100);
        let lag = train.column(LAG_COLUMN).unwrap();
        let target = train.target().unwrap();
        for (l, t) in lag.iter().zip(target) {
            assert_eq!(t - l, LAG as f64);
        }
        let test_start = start() + load_step() * len as i32;
        assert!(train.index().iter().all(|ts| *ts < test_start));
        assert!(dataset.test.index().iter().all(|ts| *ts >= test_start));
        assert!(dataset.test.height() <= LAG);
        assert!(dataset.test.target().is_none());
        assert_eq!(dataset.num_fixed_col, dataset.test.width());
    }

    #[test]
    fn smoothed_input_drops_leading_row() {
        let config = config_without_weather();
        let len = LAG + 8;
        let station = StationId::new("STRATTON CB 4041");
        let records = BTreeMap::from([(station.clone(), StationRecord::new(ramp(len)))]);
        let national = TimeSeries::regular(start(), load_step(), vec![1.0; len]);
        let mut diag = Diagnostics::new();
        let raw = DatasetBuilder::new(&config)
            .input_smoothed(false)
            .build(&station, &records, &national, &mut diag)
            .unwrap();
        let smoothed = DatasetBuilder::new(&config)
            .input_smoothed(true)
            .build(&station, &records, &national, &mut diag)
            .unwrap();
        assert_eq!(raw.train.height(), 8);
        assert_eq!(smoothed.train.height(), 7);
        assert_eq!(smoothed.train.index()[0], raw.train.index()[1]);
    }

    #[test]
    fn column_order_with_weather_and_nearby() {
        let config = PipelineConfig::default();
        let len = LAG + 16;
        let bournville = StationId::new("BOURNVILLE CB 7");
        let bradley = StationId::new("BRADLEY STOKE CB 8");
        let hourly = TimeSeries::regular(start(), weather_step(), vec![10.0; len]);
        let mut record = StationRecord::new(ramp(len)).with_nearby(vec![bradley.clone()]);
        for variable in &config.weather {
            record = record.with_weather(variable.name.clone(), hourly.clone());
        }
        let records = BTreeMap::from([
            (bournville.clone(), record),
            (bradley.clone(), StationRecord::new(ramp(len))),
        ]);
        let national = TimeSeries::regular(start(), load_step(), vec![1.0; len + LAG]);
        let mut diag = Diagnostics::new();
        let dataset = DatasetBuilder::new(&config)
            .build(&bournville, &records, &national, &mut diag)
            .unwrap();

        assert_eq!(
            dataset.train.column_names(),
            vec![
                "prev_2_mo",
                "target",
                "national",
                "month",
                "hour",
                "day",
                "doW_x",
                "doW_y",
                "temperature",
                "solar_irradiance",
                "windspeed_north",
                "windspeed_east",
                "BRADLEY STOKE CB 8",
            ]
        );
        assert_eq!(dataset.num_fixed_col, 11);
        assert_eq!(dataset.nearby_columns(), vec!["BRADLEY STOKE CB 8"]);
        // nearby lag equals own lag for identical ramps
        assert_eq!(
            dataset.train.column("BRADLEY STOKE CB 8").unwrap(),
            dataset.train.column(LAG_COLUMN).unwrap()
        );
        assert!(!diag.has_errors());
    }

    #[test]
    fn missing_nearby_record_fails_the_station() {
        let config = config_without_weather();
        let len = LAG + 4;
        let station = StationId::new("STRATTON CB 4041");
        let record = StationRecord::new(ramp(len)).with_nearby(vec![StationId::new("GONE")]);
        let records = BTreeMap::from([(station.clone(), record)]);
        let national = TimeSeries::regular(start(), load_step(), vec![1.0; len + LAG]);
        let mut diag = Diagnostics::new();
        let built = DatasetBuilder::new(&config).build(&station, &records, &national, &mut diag);
        assert!(built.is_none());
        assert_eq!(diag.in_category("nearby").count(), 1);
        assert_eq!(diag.in_category("dataset").count(), 1);
    }

    #[test]
    fn station_without_weather_is_not_persisted_empty() {
        let config = PipelineConfig::default();
        let len = LAG + 16;
        let station = StationId::new("STRATTON CB 4041");
        let records = BTreeMap::from([(station.clone(), StationRecord::new(ramp(len)))]);
        let national = TimeSeries::regular(start(), load_step(), vec![1.0; len + LAG]);
        let mut diag = Diagnostics::new();
        let built = pack_datasets(
            &DatasetBuilder::new(&config),
            &[station.clone()],
            &records,
            &national,
            &mut diag,
        );
        assert!(built.is_empty());
        assert_eq!(diag.in_category("weather").count(), 8);
        let failure = diag.in_category("dataset").next().unwrap();
        assert!(failure.message.contains("no complete train rows"));
        assert_eq!(failure.entity.as_deref(), Some("STRATTON CB 4041"));
    }

    #[test]
    fn future_steps_ignore_an_early_gap() {
        // a one-hour gap between the first two samples
        let mut index = vec![start()];
        index.extend((0..LAG + 3).map(|k| start() + Duration::hours(1) + load_step() * k as i32));
        let values = (0..index.len()).map(|i| i as f64).collect();
        let load = TimeSeries::new(index, values).unwrap();
        let future = future_index(&load);
        let last = load.last_timestamp().unwrap();
        assert_eq!(future.len(), LAG);
        assert_eq!(future[0], last + load_step());
        assert_eq!(future[1] - future[0], load_step());
    }

    #[test]
    fn calendar_encoding() {
        // 2021-06-07 is a Monday
        let ts = NaiveDate::from_ymd_opt(2021, 6, 7)
            .unwrap()
            .and_hms_opt(13, 45, 0)
            .unwrap();
        let [month, hour, day, x, y] = calendar_features(&[ts, ts + Duration::days(1)]);
        assert_eq!(month, vec![6.0, 6.0]);
        assert_eq!(hour, vec![13.0, 13.0]);
        assert_eq!(day, vec![158.0, 159.0]);
        assert_eq!(x[0], 0.0);
        assert_eq!(y[0], 1.0);
        assert!((x[1] - (2.0 * PI / 7.0).sin()).abs() < 1e-12);
    }
}
