// Copyright 2025 the Glint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Difference quotient between consecutive points.

extern crate alloc;

use alloc::vec::Vec;

use glint_data::{Entry, Selection, as_number, number};
use serde_json::{Map, Value};

use crate::stack::fresh_series;

pub(crate) fn diff_quotient(input: &Selection, x: &str, y: &str) -> Selection {
    input
        .iter()
        .map(|entry| {
            let Entry::Dataset(series) = entry else {
                return entry.clone();
            };
            let xs = series.values(x);
            let ys = series.values(y);
            let mut data = Vec::with_capacity(xs.len().saturating_sub(1));
            for i in 1..xs.len().min(ys.len()) {
                let rate = match (
                    as_number(&xs[i - 1]),
                    as_number(&xs[i]),
                    as_number(&ys[i - 1]),
                    as_number(&ys[i]),
                ) {
                    (Some(x0), Some(x1), Some(y0), Some(y1)) if x1 != x0 => {
                        number((y1 - y0) / (x1 - x0))
                    }
                    _ => Value::Null,
                };
                let mut point = Map::new();
                point.insert(x.into(), xs[i].clone());
                point.insert(y.into(), rate);
                data.push(Value::Object(point));
            }
            Entry::Dataset(fresh_series(series, data, [x, y]))
        })
        .collect()
}
