//! Column-oriented feature tables indexed by timestamp.

use chrono::NaiveDateTime;
use peak_core::{PeakError, PeakResult};

/// Name of the label column in train tables.
pub const TARGET_COLUMN: &str = "target";

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<f64>,
}

/// Ordered named `f64` columns sharing one timestamp index.
///
/// Column order is significant: tensor terms refer to columns by position.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    index: Vec<NaiveDateTime>,
    columns: Vec<Column>,
}

impl FeatureTable {
    pub fn new(index: Vec<NaiveDateTime>) -> Self {
        Self {
            index,
            columns: Vec::new(),
        }
    }

    /// Append a column; its length must match the index and its name must be new.
    pub fn push_column(&mut self, name: impl Into<String>, values: Vec<f64>) -> PeakResult<()> {
        let name = name.into();
        if values.len() != self.index.len() {
            return Err(PeakError::Validation(format!(
                "column '{name}' has {} values but the table has {} rows",
                values.len(),
                self.index.len()
            )));
        }
        if self.position(&name).is_some() {
            return Err(PeakError::Validation(format!("duplicate column '{name}'")));
        }
        self.columns.push(Column { name, values });
        Ok(())
    }

    pub fn height(&self) -> usize {
        self.index.len()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    pub fn target(&self) -> Option<&[f64]> {
        self.column(TARGET_COLUMN)
    }

    /// Copy of the table without the named column.
    pub fn without(&self, name: &str) -> Self {
        Self {
            index: self.index.clone(),
            columns: self
                .columns
                .iter()
                .filter(|c| c.name != name)
                .cloned()
                .collect(),
        }
    }

    /// Feature columns only, in table order.
    pub fn features(&self) -> Self {
        self.without(TARGET_COLUMN)
    }

    /// Drop every row holding a `NaN` in any column; returns how many went.
    pub fn drop_incomplete_rows(&mut self) -> usize {
        let keep: Vec<bool> = (0..self.height())
            .map(|i| self.columns.iter().all(|c| !c.values[i].is_nan()))
            .collect();
        let dropped = keep.iter().filter(|k| !**k).count();
        if dropped > 0 {
            self.retain_rows(&keep);
        }
        dropped
    }

    /// Drop the first row, if any.
    pub fn drop_first_row(&mut self) {
        if self.is_empty() {
            return;
        }
        let mut keep = vec![true; self.height()];
        keep[0] = false;
        self.retain_rows(&keep);
    }

    fn retain_rows(&mut self, keep: &[bool]) {
        let filter = |values: &[f64]| -> Vec<f64> {
            values
                .iter()
                .zip(keep)
                .filter(|(_, k)| **k)
                .map(|(v, _)| *v)
                .collect()
        };
        self.index = self
            .index
            .iter()
            .zip(keep)
            .filter(|(_, k)| **k)
            .map(|(ts, _)| *ts)
            .collect();
        for column in &mut self.columns {
            column.values = filter(&column.values);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn index(n: usize) -> Vec<NaiveDateTime> {
        let start = NaiveDate::from_ymd_opt(2021, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        (0..n)
            .map(|i| start + chrono::Duration::hours(i as i64))
            .collect()
    }

    #[test]
    fn push_rejects_bad_length_and_duplicates() {
        let mut table = FeatureTable::new(index(3));
        table.push_column("a", vec![1.0, 2.0, 3.0]).unwrap();
        assert!(table.push_column("b", vec![1.0]).is_err());
        assert!(table.push_column("a", vec![1.0, 2.0, 3.0]).is_err());
    }

    #[test]
    fn drops_rows_with_any_nan() {
        let mut table = FeatureTable::new(index(4));
        table
            .push_column("a", vec![1.0, f64::NAN, 3.0, 4.0])
            .unwrap();
        table
            .push_column("b", vec![1.0, 2.0, 3.0, f64::NAN])
            .unwrap();
        assert_eq!(table.drop_incomplete_rows(), 2);
        assert_eq!(table.height(), 2);
        assert_eq!(table.column("a").unwrap(), &[1.0, 3.0]);
        let all = index(4);
        assert_eq!(table.index(), &[all[0], all[2]]);
    }

    #[test]
    fn features_strip_target_and_keep_order() {
        let mut table = FeatureTable::new(index(2));
        table.push_column("prev_2_mo", vec![1.0, 2.0]).unwrap();
        table.push_column(TARGET_COLUMN, vec![3.0, 4.0]).unwrap();
        table.push_column("national", vec![5.0, 6.0]).unwrap();
        let features = table.features();
        assert_eq!(features.column_names(), vec!["prev_2_mo", "national"]);
        assert_eq!(table.target().unwrap(), &[3.0, 4.0]);
        assert_eq!(features.column("national").unwrap(), &[5.0, 6.0]);
    }

    #[test]
    fn drop_first_row_on_empty_is_noop() {
        let mut table = FeatureTable::new(Vec::new());
        table.drop_first_row();
        assert!(table.is_empty());
    }
}
