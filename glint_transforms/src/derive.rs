// Copyright 2025 the Glint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Transforms as selection methods and as derived datasets.

extern crate alloc;

use alloc::string::String;
use alloc::vec::Vec;

use glint_data::{Dataset, Entry, Selection, Sources};

use crate::Transform;

/// Transform methods on [`Selection`].
pub trait SelectionExt {
    /// Applies [`Transform::stack`].
    fn stack(&self) -> Selection;
    /// Applies [`Transform::diff_quotient`].
    fn diff_quotient(&self) -> Selection;
    /// Applies an arbitrary transform.
    fn transform(&self, transform: &Transform) -> Selection;
}

impl SelectionExt for Selection {
    fn stack(&self) -> Selection {
        Transform::stack().apply(self)
    }

    fn diff_quotient(&self) -> Selection {
        Transform::diff_quotient().apply(self)
    }

    fn transform(&self, transform: &Transform) -> Selection {
        transform.apply(self)
    }
}

impl Transform {
    /// Builds a derived dataset `id` whose value is this transform applied to `sources`.
    ///
    /// All source selections are concatenated in token order before the transform runs. The
    /// derived value is the list of output series; entries that are not datasets are dropped.
    pub fn derived(self, id: impl Into<String>, sources: impl Into<Sources>) -> Dataset {
        Dataset::new(id)
            .with_sources(sources)
            .with_derivation(move |selections: &[Selection]| {
                let input: Selection = selections
                    .iter()
                    .flat_map(|s| s.iter().cloned())
                    .collect();
                let series: Vec<Dataset> = self
                    .apply(&input)
                    .into_entries()
                    .into_iter()
                    .filter_map(|entry| match entry {
                        Entry::Dataset(d) => Some(d),
                        _ => None,
                    })
                    .collect();
                Ok(Entry::Datasets(series))
            })
    }
}
