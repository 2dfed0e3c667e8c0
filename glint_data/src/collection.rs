// Copyright 2025 the Glint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The dataset collection and its derivation pass.

extern crate alloc;

use alloc::string::{String, ToString};
use alloc::vec::Vec;

use hashbrown::{HashMap, HashSet};
use serde_json::{Map, Value};
use smallvec::SmallVec;

use crate::{Accessors, Dataset, DerivationError, Entry, Selection, Source, Sources};

#[derive(Debug)]
struct Slot {
    record: Dataset,
    /// Value computed by the last derivation pass, for derived records.
    derived: Option<Entry>,
}

/// Outcome of a successful [`Collection::update_derivations`] pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DerivationReport {
    order: Vec<String>,
    circular: Vec<String>,
}

impl DerivationReport {
    /// Ids of the derived datasets, in the order their derivations ran.
    pub fn order(&self) -> &[String] {
        &self.order
    }

    /// Ids that were requested while still being evaluated and were handed to their dependents
    /// as [`Entry::Circular`].
    pub fn circular(&self) -> &[String] {
        &self.circular
    }

    /// Returns `true` if the pass ran into at least one dependency cycle.
    pub fn has_cycles(&self) -> bool {
        !self.circular.is_empty()
    }
}

/// State of one derivation pass.
struct Pass {
    /// Non-derived ids at the start of the pass; what `*` resolves to.
    raw: Vec<String>,
    done: HashSet<String>,
    /// Datasets whose derivation is in progress, innermost last.
    active: Vec<String>,
    report: DerivationReport,
}

impl Pass {
    fn is_active(&self, id: &str) -> bool {
        self.active.iter().any(|a| a == id)
    }
}

/// An in-memory store of named datasets, raw and derived.
///
/// Records keep their insertion order; `*` sources and [`Collection::records`] follow it.
/// Derived values are only computed by [`Collection::update_derivations`].
#[derive(Debug, Default)]
pub struct Collection {
    slots: HashMap<String, Slot>,
    order: Vec<String>,
    accessors: Accessors,
}

impl Collection {
    /// Creates an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a dataset, replacing any record with the same id.
    ///
    /// Derived datasets are stored as-is; their derivation does not run until the next
    /// [`Collection::update_derivations`].
    pub fn add(&mut self, mut dataset: Dataset) {
        self.intern_dimensions(&mut dataset);
        let slot = Slot {
            record: dataset,
            derived: None,
        };
        match self.slots.get_mut(&slot.record.id) {
            Some(existing) => *existing = slot,
            None => {
                self.order.push(slot.record.id.clone());
                self.slots.insert(slot.record.id.clone(), slot);
            }
        }
    }

    /// Adds several datasets, in order.
    pub fn add_all(&mut self, datasets: impl IntoIterator<Item = Dataset>) {
        for d in datasets {
            self.add(d);
        }
    }

    /// Merges the fields set on `patch` into the record with the same id, or adds it.
    pub fn upsert(&mut self, mut patch: Dataset) {
        self.intern_dimensions(&mut patch);
        match self.slots.get_mut(&patch.id) {
            Some(slot) => slot.record.merge(patch),
            None => self.add(patch),
        }
    }

    /// Appends points to a dataset's `data`.
    ///
    /// Returns `false`, and does nothing, if there is no dataset with that id.
    pub fn append(&mut self, id: &str, rows: impl IntoIterator<Item = Value>) -> bool {
        let Some(slot) = self.slots.get_mut(id) else {
            return false;
        };
        slot.record
            .data
            .get_or_insert_with(Vec::new)
            .extend(rows);
        true
    }

    /// Removes a dataset, returning its record.
    pub fn remove(&mut self, id: &str) -> Option<Dataset> {
        let slot = self.slots.remove(id)?;
        self.order.retain(|o| o != id);
        Some(slot.record)
    }

    /// Looks up a dataset.
    ///
    /// Returns the derived value for a derived dataset that has been evaluated, otherwise the
    /// record itself. The result is a snapshot owned by the caller.
    pub fn get(&self, id: &str) -> Option<Entry> {
        self.slots.get(id).map(|slot| match &slot.derived {
            Some(value) => value.clone(),
            None => Entry::Dataset(slot.record.clone()),
        })
    }

    /// Borrows a stored record (the raw representation, even for derived datasets).
    pub fn record(&self, id: &str) -> Option<&Dataset> {
        self.slots.get(id).map(|slot| &slot.record)
    }

    /// Borrows the derived value of a dataset, if it has been evaluated.
    pub fn derived(&self, id: &str) -> Option<&Entry> {
        self.slots.get(id)?.derived.as_ref()
    }

    /// Iterates over every stored record in insertion order.
    pub fn records(&self) -> impl Iterator<Item = &Dataset> + '_ {
        self.order
            .iter()
            .filter_map(|id| self.slots.get(id))
            .map(|slot| &slot.record)
    }

    /// Returns `true` if a dataset with this id is stored.
    pub fn contains(&self, id: &str) -> bool {
        self.slots.contains_key(id)
    }

    /// Number of stored datasets.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if no dataset is stored.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// The accessor resolver dimension accessors are interned through.
    pub fn accessors(&mut self) -> &mut Accessors {
        &mut self.accessors
    }

    /// Selects datasets by source spec.
    ///
    /// Ids are resolved in the given order, repeats included; `*` expands to every non-derived
    /// dataset in insertion order. Unknown ids are skipped.
    pub fn select(&self, sources: impl Into<Sources>) -> Selection {
        let sources = sources.into();
        let raw = self.raw_ids();
        let mut out = Selection::new();
        for token in sources.tokens() {
            self.select_token(token, &raw, &[], &mut out);
        }
        out
    }

    /// Recomputes every derived dataset.
    ///
    /// Each derivation runs after the derived datasets it reads from, and runs once per pass.
    /// A dataset requested while its own evaluation is in progress is passed to the requester
    /// as [`Entry::Circular`] rather than re-entered, so cycles terminate; every cycle member
    /// still gets a value, computed from the marker.
    ///
    /// The first derivation error aborts the pass. Datasets derived before it keep their new
    /// values.
    pub fn update_derivations(&mut self) -> Result<DerivationReport, DerivationError> {
        let derived: Vec<String> = self
            .records()
            .filter(|d| d.is_derived())
            .map(|d| d.id.clone())
            .collect();
        let mut pass = Pass {
            raw: self.raw_ids(),
            done: HashSet::new(),
            active: Vec::new(),
            report: DerivationReport::default(),
        };
        for id in &derived {
            self.evaluate(id, &mut pass)?;
        }
        tracing::debug!(
            derived = pass.report.order.len(),
            circular = pass.report.circular.len(),
            "derivation pass complete"
        );
        Ok(pass.report)
    }

    fn evaluate(&mut self, id: &str, pass: &mut Pass) -> Result<(), DerivationError> {
        if pass.done.contains(id) {
            return Ok(());
        }
        let Some(slot) = self.slots.get(id) else {
            return Ok(());
        };
        if !slot.record.is_derived() {
            return Ok(());
        }
        let tokens: SmallVec<[Source; 4]> = slot
            .record
            .sources
            .as_ref()
            .map(|s| s.tokens().iter().cloned().collect())
            .unwrap_or_default();
        let derivation = slot.record.derivation.clone();

        pass.active.push(id.to_string());
        for token in &tokens {
            let Source::Id(dep) = token else {
                continue;
            };
            if pass.is_active(dep) {
                if !pass.report.circular.contains(dep) {
                    tracing::warn!(
                        dataset = id,
                        dependency = %dep,
                        "circular derivation dependency"
                    );
                    pass.report.circular.push(dep.clone());
                }
                continue;
            }
            self.evaluate(dep, pass)?;
        }

        let selections: Vec<Selection> = tokens
            .iter()
            .map(|token| {
                let mut sel = Selection::new();
                self.select_token(token, &pass.raw, &pass.active, &mut sel);
                sel
            })
            .collect();
        let result = match derivation {
            Some(f) => f.call(&selections).map_err(|e| e.in_dataset(id))?,
            None => Entry::Datasets(
                selections
                    .iter()
                    .flat_map(Selection::iter)
                    .filter_map(Entry::as_dataset)
                    .cloned()
                    .collect(),
            ),
        };
        pass.active.pop();

        if let Some(slot) = self.slots.get_mut(id) {
            let value = match result {
                Entry::Dataset(mut d) => {
                    d.fill_from(&slot.record);
                    Entry::Dataset(d)
                }
                Entry::Value(Value::Object(mut map)) => {
                    fill_object(&mut map, &slot.record);
                    Entry::Value(Value::Object(map))
                }
                other => other,
            };
            slot.derived = Some(value);
        }
        tracing::debug!(dataset = id, "derived");
        pass.done.insert(id.to_string());
        pass.report.order.push(id.to_string());
        Ok(())
    }

    /// Appends what `token` resolves to. Ids in `active` resolve to [`Entry::Circular`].
    fn select_token(&self, token: &Source, raw: &[String], active: &[String], out: &mut Selection) {
        match token {
            Source::All => {
                for id in raw {
                    if let Some(slot) = self.slots.get(id) {
                        out.add(slot.record.clone());
                    }
                }
            }
            Source::Id(id) if active.contains(id) => {
                out.add(Entry::Circular(id.clone()));
            }
            Source::Id(id) => {
                if let Some(entry) = self.get(id) {
                    out.add(entry);
                }
            }
        }
    }

    fn raw_ids(&self) -> Vec<String> {
        self.records()
            .filter(|d| !d.is_derived())
            .map(|d| d.id.clone())
            .collect()
    }

    fn intern_dimensions(&mut self, dataset: &mut Dataset) {
        if let Some(dims) = dataset.dimensions.as_mut() {
            for acc in dims.values_mut() {
                *acc = self.accessors.resolve(acc.clone());
            }
        }
    }
}

/// Copies `record`'s id and the attrs `map` lacks onto a plain-object derived value.
fn fill_object(map: &mut Map<String, Value>, record: &Dataset) {
    if !map.contains_key("id") {
        map.insert("id".into(), Value::String(record.id.clone()));
    }
    for (k, v) in &record.attrs {
        if !map.contains_key(k) {
            map.insert(k.clone(), v.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use alloc::vec;

    use serde_json::json;

    use super::*;
    use crate::Accessor;

    #[test]
    fn upsert_merges_into_existing_record() {
        let mut c = Collection::new();
        c.add(Dataset::new("d1").with_data(vec![json!(1), json!(2), json!(3)]));
        c.upsert(Dataset::new("d1").with_attr("title", json!("T")));

        let d = c.record("d1").cloned().unwrap_or_default();
        assert_eq!(d.id, "d1");
        assert_eq!(d.data(), &[json!(1), json!(2), json!(3)]);
        assert_eq!(d.attr("title"), Some(&json!("T")));
    }

    #[test]
    fn upsert_on_unknown_id_adds() {
        let mut c = Collection::new();
        c.upsert(Dataset::new("new").with_attr("title", json!("N")));
        assert!(c.contains("new"));
        assert_eq!(c.len(), 1);
    }

    #[test]
    fn add_replaces_in_place_and_keeps_order() {
        let mut c = Collection::new();
        c.add_all([Dataset::new("a"), Dataset::new("b")]);
        c.add(Dataset::new("a").with_attr("v", json!(2)));
        let ids: Vec<&str> = c.records().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(c.record("a").and_then(|d| d.attr("v")), Some(&json!(2)));
    }

    #[test]
    fn append_extends_data_or_is_a_no_op() {
        let mut c = Collection::new();
        c.add(Dataset::new("a").with_data(vec![json!(1)]));
        assert!(c.append("a", [json!(2), json!(3)]));
        assert!(!c.append("missing", [json!(4)]));
        assert_eq!(c.record("a").map(Dataset::data), Some(&[json!(1), json!(2), json!(3)][..]));
        assert!(!c.contains("missing"));
    }

    #[test]
    fn remove_and_is_empty() {
        let mut c = Collection::new();
        assert!(c.is_empty());
        c.add(Dataset::new("a"));
        assert!(!c.is_empty());
        assert!(c.remove("a").is_some());
        assert!(c.remove("a").is_none());
        assert!(c.is_empty());
        assert!(c.get("a").is_none());
    }

    #[test]
    fn select_preserves_order_and_repeats() {
        let mut c = Collection::new();
        c.add_all([Dataset::new("a"), Dataset::new("b"), Dataset::new("c")]);
        c.add(Dataset::new("d").with_sources("*"));

        let ids = |s: &Selection| -> Vec<String> {
            s.iter()
                .filter_map(Entry::as_dataset)
                .map(|d| d.id.clone())
                .collect()
        };
        assert_eq!(ids(&c.select("c,a,missing,c")), ["c", "a", "c"]);
        assert_eq!(ids(&c.select("*")), ["a", "b", "c"]);
        assert_eq!(ids(&c.select(["b", "a"])), ["b", "a"]);
    }

    #[test]
    fn add_does_not_run_derivations() {
        let mut c = Collection::new();
        c.add(Dataset::new("boom").with_sources("*").with_derivation(|_| {
            Err(DerivationError::new("should not run on add"))
        }));
        assert_eq!(
            c.get("boom").and_then(|e| e.as_dataset().map(Dataset::is_derived)),
            Some(true),
            "before a pass, get returns the record"
        );
        assert!(c.derived("boom").is_none());
    }

    #[test]
    fn derivation_errors_propagate_with_the_dataset_id() {
        let mut c = Collection::new();
        c.add(Dataset::new("ok").with_derivation(|_| Ok(Entry::Value(json!(1)))));
        c.add(Dataset::new("bad").with_derivation(|_| Err(DerivationError::new("nope"))));
        let err = c.update_derivations().err();
        assert_eq!(err.as_ref().and_then(DerivationError::dataset), Some("bad"));
        assert_eq!(err.as_ref().map(DerivationError::message), Some("nope"));
        assert_eq!(c.derived("ok").and_then(Entry::as_value), Some(&json!(1)));
    }

    #[test]
    fn dimensions_are_interned() {
        let mut c = Collection::new();
        c.add(Dataset::new("a").with_dimension("x", "t"));
        c.add(Dataset::new("b").with_dimension("x", "t"));
        let a = c.record("a").and_then(|d| d.dimension("x")).cloned();
        let b = c.record("b").and_then(|d| d.dimension("x")).cloned();
        let (Some(a), Some(b)) = (a, b) else {
            panic!("both datasets should have an x dimension");
        };
        assert!(Accessor::ptr_eq(&a, &b));
        assert_eq!(c.accessors().len(), 1);
    }
}
