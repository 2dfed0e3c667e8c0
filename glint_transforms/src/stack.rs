// Copyright 2025 the Glint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Zero-baseline stacking.

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;

use glint_data::{Dataset, Entry, Selection, as_number, number};
use serde_json::{Map, Value};

/// Builds an output series carrying `source`'s id, tags and attrs, with plain path
/// dimensions named after `dimensions`.
pub(crate) fn fresh_series<'a>(
    source: &Dataset,
    data: Vec<Value>,
    dimensions: impl IntoIterator<Item = &'a str>,
) -> Dataset {
    let mut out = Dataset::new(source.id.clone()).with_data(data);
    out.tags.clone_from(&source.tags);
    out.attrs.clone_from(&source.attrs);
    for name in dimensions {
        out = out.with_dimension(name, name);
    }
    out
}

pub(crate) fn stack(input: &Selection, field: &str, output: &str) -> Selection {
    let mut baseline: Vec<f64> = Vec::new();
    let mut out = Selection::new();

    for entry in input {
        let Entry::Dataset(series) = entry else {
            out.add(entry.clone());
            continue;
        };

        let mut names: Vec<&String> = series
            .dimensions
            .iter()
            .flat_map(|dims| dims.keys())
            .filter(|name| name.as_str() != output)
            .collect();
        names.sort_unstable();

        let mut data = Vec::with_capacity(series.data().len());
        for (i, rec) in series.data().iter().enumerate() {
            let mut point = Map::new();
            for name in &names {
                let value = series
                    .dimension(name)
                    .map_or(Value::Null, |acc| acc.call(rec, i));
                point.insert((*name).clone(), value);
            }

            let base = baseline.get(i).copied().unwrap_or(0.0);
            let value = series
                .dimension(field)
                .and_then(|acc| as_number(&acc.call(rec, i)))
                .unwrap_or(0.0);
            point.insert(output.into(), number(base));
            match baseline.get_mut(i) {
                Some(b) => *b = base + value,
                None => baseline.push(base + value),
            }
            data.push(Value::Object(point));
        }

        let dims = names.iter().map(|n| n.as_str()).chain([output]);
        out.add(fresh_series(series, data, dims));
    }
    out
}
