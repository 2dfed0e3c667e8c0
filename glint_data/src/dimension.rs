// Copyright 2025 the Glint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-dimension value lists and their aggregates.

extern crate alloc;

use alloc::vec;
use alloc::vec::Vec;

use serde_json::Value;

use crate::{as_number, js_round, number};

/// One value per selection entry: usually the array of a dataset's dimension values, or a
/// scalar once an aggregate has been applied.
///
/// Aggregates skip values that are not finite numbers. A scalar number is treated as a
/// one-element array.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DimensionSelection {
    values: Vec<Value>,
}

impl DimensionSelection {
    /// Wraps a list of per-entry values.
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Sum per entry. An entry without numbers sums to `0`.
    pub fn sum(&self) -> Self {
        self.reduce(|nums| number(nums.iter().sum()))
    }

    /// Arithmetic mean per entry, `null` when there are no numbers.
    pub fn avg(&self) -> Self {
        self.reduce(|nums| {
            if nums.is_empty() {
                Value::Null
            } else {
                number(nums.iter().sum::<f64>() / nums.len() as f64)
            }
        })
    }

    /// Minimum per entry, `null` when there are no numbers.
    pub fn min(&self) -> Self {
        self.reduce(|nums| fold_extent(nums).map_or(Value::Null, |(lo, _)| number(lo)))
    }

    /// Maximum per entry, `null` when there are no numbers.
    pub fn max(&self) -> Self {
        self.reduce(|nums| fold_extent(nums).map_or(Value::Null, |(_, hi)| number(hi)))
    }

    /// `[min, max]` per entry, `null` when there are no numbers.
    pub fn extent(&self) -> Self {
        self.reduce(|nums| {
            fold_extent(nums).map_or(Value::Null, |(lo, hi)| {
                Value::Array(vec![number(lo), number(hi)])
            })
        })
    }

    /// Rounds every number, element-wise inside arrays.
    pub fn round(&self) -> Self {
        Self {
            values: self.values.iter().map(round_value).collect(),
        }
    }

    /// Flattens every entry into a single array entry.
    pub fn concat(&self) -> Self {
        let mut flat = Vec::new();
        for v in &self.values {
            match v {
                Value::Array(items) => flat.extend(items.iter().cloned()),
                other => flat.push(other.clone()),
            }
        }
        Self {
            values: vec![Value::Array(flat)],
        }
    }

    /// Returns the `i`-th entry.
    pub fn get(&self, i: usize) -> Option<&Value> {
        self.values.get(i)
    }

    /// Returns the first entry.
    pub fn first(&self) -> Option<&Value> {
        self.get(0)
    }

    /// Returns every entry.
    pub fn all(&self) -> &[Value] {
        &self.values
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Consumes the selection, returning its entries.
    pub fn into_values(self) -> Vec<Value> {
        self.values
    }

    fn reduce(&self, f: impl Fn(&[f64]) -> Value) -> Self {
        let values = self
            .values
            .iter()
            .map(|v| match v {
                Value::Array(items) => {
                    let nums: Vec<f64> = items.iter().filter_map(as_number).collect();
                    f(&nums)
                }
                other => match as_number(other) {
                    Some(n) => f(&[n]),
                    None => Value::Null,
                },
            })
            .collect();
        Self { values }
    }
}

impl FromIterator<Value> for DimensionSelection {
    fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Returns `(min, max)` over `nums`, or `None` if empty.
pub(crate) fn fold_extent(nums: &[f64]) -> Option<(f64, f64)> {
    let (first, rest) = nums.split_first()?;
    Some(
        rest.iter()
            .fold((*first, *first), |(lo, hi), &v| (lo.min(v), hi.max(v))),
    )
}

fn round_value(v: &Value) -> Value {
    match v {
        Value::Array(items) => Value::Array(items.iter().map(round_value).collect()),
        other => as_number(other).map_or_else(|| other.clone(), |n| number(js_round(n))),
    }
}
