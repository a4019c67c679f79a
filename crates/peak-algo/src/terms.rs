//! Tensor-term assembly for the additive model.
//!
//! Terms are emitted in a fixed order that the fitting routine is sensitive
//! to:
//!
//! 1. every fixed group except the last
//! 2. each nearby column paired with every nearby group except the last
//! 3. the last fixed group
//! 4. each nearby column paired with the last nearby group
//! 5. the global groups, only when the table has no nearby column

use std::collections::HashMap;

use peak_core::{GamParams, PeakError, PeakResult, TermLayout};
use serde::{Deserialize, Serialize};

/// One tensor-product smooth over the listed column positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TensorTerm {
    pub features: Vec<usize>,
}

/// Ordered tensor terms plus the hyperparameters shared by all of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorTermSpec {
    terms: Vec<TensorTerm>,
    pub lam: f64,
    pub n_splines: usize,
}

impl TensorTermSpec {
    pub fn terms(&self) -> &[TensorTerm] {
        &self.terms
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// Terms rendered back into column names.
    pub fn describe<S: AsRef<str>>(&self, columns: &[S]) -> Vec<Vec<String>> {
        self.terms
            .iter()
            .map(|term| {
                term.features
                    .iter()
                    .map(|&i| {
                        columns
                            .get(i)
                            .map_or_else(|| format!("#{i}"), |c| c.as_ref().to_string())
                    })
                    .collect()
            })
            .collect()
    }

    pub fn to_json(&self) -> PeakResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Build the term list for a feature table's column layout.
///
/// `columns` are the feature columns in table order; those at or beyond
/// `num_fixed_col` are nearby-station columns.
pub fn assemble_terms<S: AsRef<str>>(
    columns: &[S],
    num_fixed_col: usize,
    layout: &TermLayout,
    params: GamParams,
) -> PeakResult<TensorTermSpec> {
    if num_fixed_col > columns.len() {
        return Err(PeakError::Config(format!(
            "num_fixed_col {num_fixed_col} exceeds column count {}",
            columns.len()
        )));
    }
    let positions: HashMap<&str, usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| (c.as_ref(), i))
        .collect();
    let resolve = |group: &[String]| -> PeakResult<Vec<usize>> {
        group
            .iter()
            .map(|name| {
                positions.get(name.as_str()).copied().ok_or_else(|| {
                    PeakError::Config(format!("term references unknown column '{name}'"))
                })
            })
            .collect()
    };
    let fixed = layout
        .fixed
        .iter()
        .map(|g| resolve(g))
        .collect::<PeakResult<Vec<_>>>()?;
    let nearby_groups = layout
        .nearby
        .iter()
        .map(|g| resolve(g))
        .collect::<PeakResult<Vec<_>>>()?;
    let nearby_columns: Vec<usize> = (num_fixed_col..columns.len()).collect();

    let mut terms = Vec::new();
    let mut push = |features: Vec<usize>| terms.push(TensorTerm { features });
    let paired = |column: usize, group: &[usize]| {
        std::iter::once(column).chain(group.iter().copied()).collect::<Vec<_>>()
    };

    let (fixed_last, fixed_head) = match fixed.split_last() {
        Some((last, head)) => (Some(last), head),
        None => (None, &fixed[..]),
    };
    let (nearby_last, nearby_head) = match nearby_groups.split_last() {
        Some((last, head)) => (Some(last), head),
        None => (None, &nearby_groups[..]),
    };

    for group in fixed_head {
        push(group.clone());
    }
    for &column in &nearby_columns {
        for group in nearby_head {
            push(paired(column, group));
        }
    }
    if let Some(group) = fixed_last {
        push(group.clone());
    }
    if let Some(group) = nearby_last {
        for &column in &nearby_columns {
            push(paired(column, group));
        }
    }
    if nearby_columns.is_empty() {
        for group in &layout.global {
            push(resolve(group)?);
        }
    }

    Ok(TensorTermSpec {
        terms,
        lam: params.lam,
        n_splines: params.n_splines,
    })
}
