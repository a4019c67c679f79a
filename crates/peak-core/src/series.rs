//! Timestamp-indexed numeric series.
//!
//! A [`TimeSeries`] pairs a strictly increasing `NaiveDateTime` index with one
//! `f64` per timestamp. Missing samples are stored as `NaN`; they survive every
//! transform and are only removed when a feature table drops incomplete rows.

use chrono::{Duration, NaiveDateTime};

use crate::error::{PeakError, PeakResult};

/// Native sampling step of substation load (15 minutes).
pub fn load_step() -> Duration {
    Duration::minutes(15)
}

/// Native sampling step of site weather (hourly).
pub fn weather_step() -> Duration {
    Duration::hours(1)
}

/// Native sampling step of national demand (30 minutes).
pub fn national_demand_step() -> Duration {
    Duration::minutes(30)
}

#[derive(Debug, Clone, Default)]
pub struct TimeSeries {
    index: Vec<NaiveDateTime>,
    values: Vec<f64>,
}

impl TimeSeries {
    /// Build a series, rejecting length mismatches and non-increasing indexes.
    pub fn new(index: Vec<NaiveDateTime>, values: Vec<f64>) -> PeakResult<Self> {
        if index.len() != values.len() {
            return Err(PeakError::Validation(format!(
                "index has {} timestamps but {} values were supplied",
                index.len(),
                values.len()
            )));
        }
        if let Some(pos) = index.windows(2).position(|w| w[0] >= w[1]) {
            return Err(PeakError::Validation(format!(
                "index is not strictly increasing at position {} ({} >= {})",
                pos + 1,
                index[pos],
                index[pos + 1]
            )));
        }
        Ok(Self { index, values })
    }

    /// Build a series on a regular grid starting at `start`.
    pub fn regular(start: NaiveDateTime, step: Duration, values: Vec<f64>) -> Self {
        let index = (0..values.len())
            .map(|i| start + step * i as i32)
            .collect();
        Self { index, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.index.first().copied()
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.index.last().copied()
    }

    /// Spacing between the first two samples, taken as the native frequency.
    pub fn step(&self) -> Option<Duration> {
        match self.index.as_slice() {
            [first, second, ..] => Some(*second - *first),
            _ => None,
        }
    }

    /// Same index, new values.
    pub fn with_values(&self, values: Vec<f64>) -> PeakResult<Self> {
        if values.len() != self.index.len() {
            return Err(PeakError::Validation(format!(
                "replacement values have length {} but the index has {}",
                values.len(),
                self.index.len()
            )));
        }
        Ok(Self {
            index: self.index.clone(),
            values,
        })
    }

    pub fn map(&self, f: impl Fn(f64) -> f64) -> Self {
        Self {
            index: self.index.clone(),
            values: self.values.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Exact-match lookup; `None` when the timestamp is not on the index.
    pub fn get(&self, timestamp: &NaiveDateTime) -> Option<f64> {
        self.index
            .binary_search(timestamp)
            .ok()
            .map(|pos| self.values[pos])
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDateTime, f64)> + '_ {
        self.index.iter().copied().zip(self.values.iter().copied())
    }

    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_nan()).count()
    }

    /// Concatenate series end-to-end; every part must start after the previous one ends.
    pub fn concat(parts: Vec<TimeSeries>) -> PeakResult<Self> {
        let mut index = Vec::with_capacity(parts.iter().map(TimeSeries::len).sum());
        let mut values = Vec::with_capacity(index.capacity());
        for part in parts {
            if let (Some(last), Some(first)) = (index.last(), part.first_timestamp()) {
                if first <= *last {
                    return Err(PeakError::Validation(format!(
                        "series part starting at {first} overlaps previous part ending at {last}"
                    )));
                }
            }
            index.extend(part.index);
            values.extend(part.values);
        }
        Ok(Self { index, values })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2021, 1, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    #[test]
    fn rejects_unordered_index() {
        let err = TimeSeries::new(vec![ts(1, 1, 0), ts(1, 0, 0)], vec![1.0, 2.0]).unwrap_err();
        assert!(matches!(err, PeakError::Validation(_)));
    }

    #[test]
    fn rejects_duplicate_timestamps() {
        assert!(TimeSeries::new(vec![ts(1, 0, 0), ts(1, 0, 0)], vec![1.0, 2.0]).is_err());
    }

    #[test]
    fn regular_grid_and_step() {
        let s = TimeSeries::regular(ts(1, 0, 0), load_step(), vec![1.0, 2.0, 3.0]);
        assert_eq!(s.step(), Some(Duration::minutes(15)));
        assert_eq!(s.last_timestamp(), Some(ts(1, 0, 30)));
        assert_eq!(s.get(&ts(1, 0, 15)), Some(2.0));
        assert_eq!(s.get(&ts(1, 0, 20)), None);
    }

    #[test]
    fn concat_requires_chronological_parts() {
        let a = TimeSeries::regular(ts(1, 0, 0), national_demand_step(), vec![1.0, 2.0]);
        let b = TimeSeries::regular(ts(1, 1, 0), national_demand_step(), vec![3.0]);
        let joined = TimeSeries::concat(vec![a.clone(), b.clone()]).unwrap();
        assert_eq!(joined.len(), 3);
        assert!(TimeSeries::concat(vec![b, a]).is_err());
    }
}
