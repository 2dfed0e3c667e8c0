// Copyright 2025 the Glint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dataset records, source specs and derivations.

extern crate alloc;

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use hashbrown::HashMap;
use serde_json::{Map, Value};
use smallvec::SmallVec;

use crate::{Accessor, DerivationError, Selection};

/// Marker a circular dependency stands in for, as seen by derivation functions that turn an
/// [`Entry::Circular`] back into a plain value.
pub const CIRCULAR_DEPENDENCY: &str = "gl-error-circular-dependency";

/// Tag set of a dataset. Duplicates are dropped on insertion; order carries no meaning.
pub type Tags = SmallVec<[String; 2]>;

/// Result of a [`Derivation`].
pub type DerivationResult = Result<Entry, DerivationError>;

/// One token of a source spec.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Source {
    /// `*`: every non-derived dataset at evaluation time.
    All,
    /// A single dataset id.
    Id(String),
}

impl Source {
    fn parse(token: &str) -> Self {
        if token == "*" {
            Self::All
        } else {
            Self::Id(token.into())
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("*"),
            Self::Id(id) => f.write_str(id),
        }
    }
}

/// The inputs of a derived dataset.
///
/// A comma-separated string (`"a,b"`), the literal `"*"`, and an id array (`["a", "b"]`) all
/// parse into the same ordered token list. Repeated ids are kept.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Sources {
    tokens: SmallVec<[Source; 4]>,
}

impl Sources {
    /// Parses a comma-separated source spec. Blank tokens are skipped.
    pub fn parse(spec: &str) -> Self {
        Self::from_ids(spec.split(','))
    }

    /// Builds sources from a list of ids; `"*"` entries become [`Source::All`].
    pub fn from_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tokens = ids
            .into_iter()
            .filter_map(|id| {
                let id = id.as_ref().trim();
                (!id.is_empty()).then(|| Source::parse(id))
            })
            .collect();
        Self { tokens }
    }

    /// The parsed tokens, in declaration order.
    pub fn tokens(&self) -> &[Source] {
        &self.tokens
    }

    /// Returns `true` if no source is named.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl fmt::Display for Sources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, t) in self.tokens.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{t}")?;
        }
        Ok(())
    }
}

impl From<&str> for Sources {
    fn from(value: &str) -> Self {
        Self::parse(value)
    }
}

impl From<String> for Sources {
    fn from(value: String) -> Self {
        Self::parse(&value)
    }
}

impl From<&[&str]> for Sources {
    fn from(value: &[&str]) -> Self {
        Self::from_ids(value)
    }
}

impl<const N: usize> From<[&str; N]> for Sources {
    fn from(value: [&str; N]) -> Self {
        Self::from_ids(value)
    }
}

impl From<Vec<Source>> for Sources {
    fn from(value: Vec<Source>) -> Self {
        Self {
            tokens: value.into(),
        }
    }
}

/// A derivation function: one [`Selection`] per source token in, one [`Entry`] out.
#[derive(Clone)]
pub struct Derivation(Rc<dyn Fn(&[Selection]) -> DerivationResult>);

impl Derivation {
    /// Wraps a derivation function.
    pub fn new(f: impl Fn(&[Selection]) -> DerivationResult + 'static) -> Self {
        Self(Rc::new(f))
    }

    /// Invokes the derivation.
    pub fn call(&self, sources: &[Selection]) -> DerivationResult {
        (self.0)(sources)
    }
}

impl fmt::Debug for Derivation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Derivation(..)")
    }
}

/// A named dataset record.
///
/// Every field other than `id` is optional so a `Dataset` doubles as a partial record for
/// [`Collection::upsert`](crate::Collection::upsert): only the fields that are set are merged.
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    /// Unique key within a collection.
    pub id: String,
    /// Point records.
    pub data: Option<Vec<Value>>,
    /// Dimension name to accessor.
    pub dimensions: Option<HashMap<String, Accessor>>,
    /// Tags used by [`Selection::filter_by_tags`].
    pub tags: Option<Tags>,
    /// Free-form metadata (titles, colors, computed domains, ...).
    pub attrs: Map<String, Value>,
    /// Inputs of a derived dataset.
    pub sources: Option<Sources>,
    /// Derivation function of a derived dataset.
    pub derivation: Option<Derivation>,
}

impl Dataset {
    /// Creates an empty record with the given id.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    /// Sets the point records.
    pub fn with_data(mut self, data: impl IntoIterator<Item = Value>) -> Self {
        self.data = Some(data.into_iter().collect());
        self
    }

    /// Adds a dimension accessor.
    pub fn with_dimension(
        mut self,
        name: impl Into<String>,
        accessor: impl Into<Accessor>,
    ) -> Self {
        self.dimensions
            .get_or_insert_with(HashMap::new)
            .insert(name.into(), accessor.into());
        self
    }

    /// Adds a tag.
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        let tags = self.tags.get_or_insert_with(Tags::new);
        if !tags.contains(&tag) {
            tags.push(tag);
        }
        self
    }

    /// Adds several tags.
    pub fn with_tags<I, S>(self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        tags.into_iter().fold(self, |d, t| d.with_tag(t))
    }

    /// Sets a metadata field.
    pub fn with_attr(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attrs.insert(key.into(), value);
        self
    }

    /// Sets the sources, making this a derived dataset.
    pub fn with_sources(mut self, sources: impl Into<Sources>) -> Self {
        self.sources = Some(sources.into());
        self
    }

    /// Sets the derivation function, making this a derived dataset.
    pub fn with_derivation(
        mut self,
        f: impl Fn(&[Selection]) -> DerivationResult + 'static,
    ) -> Self {
        self.derivation = Some(Derivation::new(f));
        self
    }

    /// Returns `true` if this dataset has sources or a derivation.
    pub fn is_derived(&self) -> bool {
        self.sources.is_some() || self.derivation.is_some()
    }

    /// Point records, empty if unset.
    pub fn data(&self) -> &[Value] {
        self.data.as_deref().unwrap_or_default()
    }

    /// Looks up a dimension accessor.
    pub fn dimension(&self, name: &str) -> Option<&Accessor> {
        self.dimensions.as_ref()?.get(name)
    }

    /// Resolves every point's value for a dimension.
    ///
    /// A missing dimension yields one `Value::Null` per point.
    pub fn values(&self, dimension: &str) -> Vec<Value> {
        match self.dimension(dimension) {
            Some(acc) => self
                .data()
                .iter()
                .enumerate()
                .map(|(i, rec)| acc.call(rec, i))
                .collect(),
            None => alloc::vec![Value::Null; self.data().len()],
        }
    }

    /// Returns `true` if the dataset carries `tag`.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags
            .as_ref()
            .is_some_and(|tags| tags.iter().any(|t| t == tag))
    }

    /// Looks up a metadata field.
    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attrs.get(key)
    }

    /// Shallow-merges the fields set on `patch` into `self`, overwriting on collision.
    pub(crate) fn merge(&mut self, patch: Self) {
        let Self {
            id: _,
            data,
            dimensions,
            tags,
            attrs,
            sources,
            derivation,
        } = patch;
        if data.is_some() {
            self.data = data;
        }
        if dimensions.is_some() {
            self.dimensions = dimensions;
        }
        if tags.is_some() {
            self.tags = tags;
        }
        self.attrs.extend(attrs);
        if sources.is_some() {
            self.sources = sources;
        }
        if derivation.is_some() {
            self.derivation = derivation;
        }
    }

    /// Copies the record fields `self` leaves unset from `record`.
    ///
    /// Sources and derivation are not copied: the result is a value, not a derived record.
    pub(crate) fn fill_from(&mut self, record: &Self) {
        if self.id.is_empty() {
            self.id.clone_from(&record.id);
        }
        if self.data.is_none() {
            self.data.clone_from(&record.data);
        }
        if self.dimensions.is_none() {
            self.dimensions.clone_from(&record.dimensions);
        }
        if self.tags.is_none() {
            self.tags.clone_from(&record.tags);
        }
        for (k, v) in &record.attrs {
            if !self.attrs.contains_key(k) {
                self.attrs.insert(k.clone(), v.clone());
            }
        }
    }
}

/// What a collection lookup resolves to, and what a selection holds.
#[derive(Clone, Debug)]
pub enum Entry {
    /// A raw record, or a derived record merged onto its stored record.
    Dataset(Dataset),
    /// A derived list of series. Selecting it yields one entry per series.
    Datasets(Vec<Dataset>),
    /// A plain derived value, stored verbatim.
    Value(Value),
    /// Stands in for a dataset whose evaluation is still in progress (a dependency cycle).
    Circular(String),
}

impl Entry {
    /// Returns the dataset, if this is a single dataset entry.
    pub fn as_dataset(&self) -> Option<&Dataset> {
        match self {
            Self::Dataset(d) => Some(d),
            _ => None,
        }
    }

    /// Returns the value, if this is a plain value entry.
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Returns every dataset this entry holds.
    pub fn datasets(&self) -> &[Dataset] {
        match self {
            Self::Dataset(d) => core::slice::from_ref(d),
            Self::Datasets(ds) => ds,
            Self::Value(_) | Self::Circular(_) => &[],
        }
    }

    /// Returns `true` for the circular dependency marker.
    pub fn is_circular(&self) -> bool {
        matches!(self, Self::Circular(_))
    }
}

impl From<Dataset> for Entry {
    fn from(value: Dataset) -> Self {
        Self::Dataset(value)
    }
}

impl From<Vec<Dataset>> for Entry {
    fn from(value: Vec<Dataset>) -> Self {
        Self::Datasets(value)
    }
}

impl From<Value> for Entry {
    fn from(value: Value) -> Self {
        Self::Value(value)
    }
}
