//! Bucketed resampling and index alignment.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use peak_core::TimeSeries;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregation {
    Mean,
    Max,
}

/// Resample into fixed-width buckets anchored at the first timestamp.
///
/// Bucket `k` covers `[origin + k·period, origin + (k+1)·period)` where
/// `origin` is the first observation, so a series starting at `06:13` gets
/// buckets `06:13, 07:13, ...`. Buckets between the first and last observation
/// that contain no finite value are emitted as `NaN`.
pub fn resample_anchored(series: &TimeSeries, period: Duration, agg: Aggregation) -> TimeSeries {
    let Some(origin) = series.first_timestamp() else {
        return TimeSeries::default();
    };
    let period_secs = period.num_seconds().max(1);
    let mut buckets: BTreeMap<i64, BucketStats> = BTreeMap::new();
    for (ts, value) in series.iter() {
        let bucket = floor_bucket((ts - origin).num_seconds(), period_secs);
        let entry = buckets.entry(bucket).or_default();
        entry.push(value);
    }
    let last_bucket = buckets.keys().next_back().copied().unwrap_or(0);
    let values = (0..=last_bucket / period_secs)
        .map(|k| {
            buckets
                .get(&(k * period_secs))
                .map_or(f64::NAN, |stats| stats.finish(agg))
        })
        .collect();
    TimeSeries::regular(origin, Duration::seconds(period_secs), values)
}

/// Maximum per calendar day, indexed at midnight.
///
/// Days run from the first to the last observed date; a day without a finite
/// value is `NaN`.
pub fn daily_max(series: &TimeSeries) -> TimeSeries {
    let (Some(first), Some(last)) = (series.first_timestamp(), series.last_timestamp()) else {
        return TimeSeries::default();
    };
    let mut days: BTreeMap<NaiveDate, BucketStats> = BTreeMap::new();
    for (ts, value) in series.iter() {
        days.entry(ts.date()).or_default().push(value);
    }
    let first_day = first.date();
    let span = (last.date() - first_day).num_days();
    let values = (0..=span)
        .map(|offset| {
            days.get(&(first_day + Duration::days(offset)))
                .map_or(f64::NAN, |stats| stats.finish(Aggregation::Max))
        })
        .collect();
    TimeSeries::regular(
        first_day.and_time(NaiveTime::default()),
        Duration::days(1),
        values,
    )
}

/// `left − right` over the union of both indexes; a timestamp present on
/// only one side yields `NaN`.
pub fn subtract_aligned(left: &TimeSeries, right: &TimeSeries) -> TimeSeries {
    let mut merged: BTreeMap<NaiveDateTime, (Option<f64>, Option<f64>)> = BTreeMap::new();
    for (ts, value) in left.iter() {
        merged.entry(ts).or_default().0 = Some(value);
    }
    for (ts, value) in right.iter() {
        merged.entry(ts).or_default().1 = Some(value);
    }
    let (index, values): (Vec<_>, Vec<_>) = merged
        .into_iter()
        .map(|(ts, pair)| match pair {
            (Some(l), Some(r)) => (ts, l - r),
            _ => (ts, f64::NAN),
        })
        .unzip();
    TimeSeries::new(index, values).unwrap_or_default()
}

fn floor_bucket(offset: i64, period: i64) -> i64 {
    offset - offset.rem_euclid(period)
}

struct BucketStats {
    count: usize,
    sum: f64,
    max: f64,
}

impl BucketStats {
    fn push(&mut self, value: f64) {
        if value.is_finite() {
            self.count += 1;
            self.sum += value;
            self.max = self.max.max(value);
        }
    }

    fn finish(&self, agg: Aggregation) -> f64 {
        if self.count == 0 {
            return f64::NAN;
        }
        match agg {
            Aggregation::Mean => self.sum / self.count as f64,
            Aggregation::Max => self.max,
        }
    }
}

impl Default for BucketStats {
    fn default() -> Self {
        BucketStats {
            count: 0,
            sum: 0.0,
            max: f64::NEG_INFINITY,
        }
    }
}
