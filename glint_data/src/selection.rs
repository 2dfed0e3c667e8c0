// Copyright 2025 the Glint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Selections: ordered lists of entries handed to derivation functions.

extern crate alloc;

use alloc::vec::Vec;

use serde_json::Value;

use crate::{DimensionSelection, Entry, as_number};

/// An ordered list of [`Entry`] values.
///
/// Operations that return a `Selection` allocate a new one and leave the receiver untouched.
/// Entries are owned clones: editing a selection never edits the collection it came from.
#[derive(Clone, Debug, Default)]
pub struct Selection {
    entries: Vec<Entry>,
}

impl Selection {
    /// Creates an empty selection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry. A [`Entry::Datasets`] list is appended one series at a time.
    pub fn add(&mut self, entry: impl Into<Entry>) -> &mut Self {
        match entry.into() {
            Entry::Datasets(list) => self.entries.extend(list.into_iter().map(Entry::Dataset)),
            other => self.entries.push(other),
        }
        self
    }

    /// Returns a new selection of `f` applied to every entry.
    pub fn map(&self, f: impl FnMut(&Entry) -> Entry) -> Self {
        Self {
            entries: self.entries.iter().map(f).collect(),
        }
    }

    /// Keeps, per dataset, the points whose `dimension` value lies in `[min, max]` (inclusive).
    ///
    /// Points without a numeric value for the dimension are dropped. Entries that are not
    /// datasets pass through unchanged.
    pub fn filter(&self, dimension: &str, [min, max]: [f64; 2]) -> Self {
        self.map(|entry| match entry {
            Entry::Dataset(d) => {
                let mut out = d.clone();
                let kept = match d.dimension(dimension) {
                    Some(acc) => d
                        .data()
                        .iter()
                        .enumerate()
                        .filter(|(i, rec)| {
                            as_number(&acc.call(rec, *i)).is_some_and(|v| v >= min && v <= max)
                        })
                        .map(|(_, rec)| rec.clone())
                        .collect(),
                    None => Vec::new(),
                };
                out.data = Some(kept);
                Entry::Dataset(out)
            }
            other => other.clone(),
        })
    }

    /// Drops every dataset carrying at least one of `tags`.
    ///
    /// This is an exclusion filter: untagged datasets and non-dataset entries are kept.
    pub fn filter_by_tags<I, S>(&self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tags: Vec<S> = tags.into_iter().collect();
        Self {
            entries: self
                .entries
                .iter()
                .filter(|entry| match entry {
                    Entry::Dataset(d) => !tags.iter().any(|t| d.has_tag(t.as_ref())),
                    _ => true,
                })
                .cloned()
                .collect(),
        }
    }

    /// Drops every dataset carrying `tag`. Shorthand for a one-element
    /// [`filter_by_tags`](Self::filter_by_tags).
    pub fn filter_by_tag(&self, tag: &str) -> Self {
        self.filter_by_tags([tag])
    }

    /// Extracts one array of `dimension` values per entry.
    ///
    /// Non-dataset entries contribute `null`.
    pub fn dim(&self, dimension: &str) -> DimensionSelection {
        self.entries
            .iter()
            .map(|entry| match entry {
                Entry::Dataset(d) => Value::Array(d.values(dimension)),
                _ => Value::Null,
            })
            .collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the `i`-th entry.
    pub fn get(&self, i: usize) -> Option<&Entry> {
        self.entries.get(i)
    }

    /// Returns the first entry.
    pub fn first(&self) -> Option<&Entry> {
        self.get(0)
    }

    /// Returns every entry.
    pub fn all(&self) -> &[Entry] {
        &self.entries
    }

    /// Iterates over the entries.
    pub fn iter(&self) -> core::slice::Iter<'_, Entry> {
        self.entries.iter()
    }

    /// Consumes the selection, returning its entries.
    pub fn into_entries(self) -> Vec<Entry> {
        self.entries
    }
}

impl Extend<Entry> for Selection {
    fn extend<T: IntoIterator<Item = Entry>>(&mut self, iter: T) {
        for entry in iter {
            self.add(entry);
        }
    }
}

impl FromIterator<Entry> for Selection {
    fn from_iter<T: IntoIterator<Item = Entry>>(iter: T) -> Self {
        let mut out = Self::new();
        out.extend(iter);
        out
    }
}

impl<'a> IntoIterator for &'a Selection {
    type Item = &'a Entry;
    type IntoIter = core::slice::Iter<'a, Entry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::vec;

    use serde_json::json;

    use super::*;
    use crate::Dataset;

    fn years(id: &str, from: i64, to: i64) -> Dataset {
        Dataset::new(id)
            .with_data((from..=to).map(|y| json!({ "year": y, "v": y - from })))
            .with_dimension("year", "year")
            .with_dimension("y", "v")
    }

    #[test]
    fn range_filter_is_inclusive() {
        let sel: Selection = [Entry::Dataset(years("a", 1991, 1997))].into_iter().collect();
        let filtered = sel.filter("year", [1991.0, 1994.0]);
        let kept = filtered.dim("year").concat();
        assert_eq!(
            kept.first(),
            Some(&json!([1991, 1992, 1993, 1994])),
            "both ends of the range are included"
        );
        let all = sel.dim("year").concat();
        assert_eq!(all.first().and_then(Value::as_array).map(Vec::len), Some(7));
    }

    #[test]
    fn tag_filter_excludes_matching_entries() {
        let sel: Selection = [
            Entry::Dataset(Dataset::new("on")),
            Entry::Dataset(Dataset::new("off").with_tag("inactive")),
        ]
        .into_iter()
        .collect();
        let out = sel.filter_by_tags(["inactive"]);
        assert_eq!(out.len(), 1);
        assert_eq!(out.first().and_then(Entry::as_dataset).map(|d| d.id.as_str()), Some("on"));

        let single = sel.filter_by_tag("inactive");
        assert_eq!(single.len(), 1, "a bare tag filters the same way");
        assert_eq!(sel.filter_by_tag("other").len(), 2);
    }

    #[test]
    fn map_leaves_receiver_untouched() {
        let sel: Selection = [Entry::Value(json!(1)), Entry::Value(json!(2))].into_iter().collect();
        let doubled = sel.map(|e| match e {
            Entry::Value(v) => Entry::Value(json!(v.as_i64().unwrap_or(0) * 2)),
            other => other.clone(),
        });
        assert_eq!(doubled.get(1).and_then(Entry::as_value), Some(&json!(4)));
        assert_eq!(sel.get(1).and_then(Entry::as_value), Some(&json!(2)));
    }

    #[test]
    fn adding_a_series_list_flattens_it() {
        let mut sel = Selection::new();
        sel.add(vec![Dataset::new("a"), Dataset::new("b")]);
        sel.add(Dataset::new("c"));
        assert_eq!(sel.len(), 3);
        assert!(sel.all().iter().all(|e| e.as_dataset().is_some()));
    }

    #[test]
    fn non_dataset_entries_pass_through() {
        let sel: Selection = [Entry::Circular("a".into()), Entry::Dataset(years("b", 2000, 2001))]
            .into_iter()
            .collect();
        let filtered = sel.filter("year", [2000.0, 2000.0]);
        assert!(filtered.first().is_some_and(Entry::is_circular));
        assert_eq!(sel.dim("y").all(), &[Value::Null, json!([0, 1])]);
    }
}
