// Copyright 2025 the Glint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Axis domains as a derived dataset.
//!
//! [`DomainRegistry::add_domain_derivation`] registers a `$domain` dataset whose derived value
//! holds one domain per configured dimension (`attrs["x"] == [min, max]`, ...). Domains are
//! recomputed with every other derivation, so they follow the data.
//!
//! ```
//! use glint_data::{
//!     Collection, Dataset, DimensionDomain, DomainConfig, Entry, add_domain_derivation,
//! };
//! use serde_json::json;
//!
//! let mut c = Collection::new();
//! c.add(
//!     Dataset::new("a")
//!         .with_data([json!({ "v": 3 }), json!({ "v": 9 })])
//!         .with_dimension("y", "v"),
//! );
//! add_domain_derivation(
//!     DomainConfig::new().with_dimension("y", DimensionDomain::new("*").with_max_multiplier(1.5)),
//!     &mut c,
//! );
//! c.update_derivations().unwrap();
//!
//! let Some(Entry::Dataset(domain)) = c.get("$domain") else { unreachable!() };
//! assert_eq!(domain.attr("y"), Some(&json!([3, 14])));
//! ```

extern crate alloc;

use alloc::collections::BTreeMap;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::RefCell;

use hashbrown::HashMap;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::dimension::fold_extent;
use crate::{
    Collection, Dataset, DomainConfigError, Entry, Selection, Source, Sources, TimeUnit,
    as_number, js_round, number,
};

/// Id of the dataset registered by [`DomainRegistry::add_domain_derivation`].
pub const DOMAIN_ID: &str = "$domain";

/// A domain compute function: `(sources, dimension, args) -> domain`.
///
/// Returning `null` makes the dimension fall back to its configured default.
pub type ComputeFn = Rc<dyn Fn(&Selection, &str, &Value) -> Value>;

/// Named domain compute functions.
///
/// A new registry holds the built-in `extent` and `interval` functions. Clones share one table,
/// and a registered `$domain` looks its functions up by name on every pass, so later
/// [`add_compute_fn`](Self::add_compute_fn) and [`remove_compute_fn`](Self::remove_compute_fn)
/// calls apply to it.
#[derive(Clone)]
pub struct DomainRegistry {
    fns: Rc<RefCell<HashMap<String, ComputeFn>>>,
}

impl core::fmt::Debug for DomainRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let fns = self.fns.borrow();
        let mut names: Vec<&str> = fns.keys().map(String::as_str).collect();
        names.sort_unstable();
        f.debug_struct("DomainRegistry")
            .field("compute_fns", &names)
            .finish()
    }
}

impl Default for DomainRegistry {
    fn default() -> Self {
        let mut fns: HashMap<String, ComputeFn> = HashMap::new();
        fns.insert("extent".into(), Rc::new(extent));
        fns.insert("interval".into(), Rc::new(interval));
        Self {
            fns: Rc::new(RefCell::new(fns)),
        }
    }
}

impl DomainRegistry {
    /// Creates a registry with the built-in compute functions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) a compute function.
    pub fn add_compute_fn(
        &self,
        name: impl Into<String>,
        f: impl Fn(&Selection, &str, &Value) -> Value + 'static,
    ) {
        self.fns.borrow_mut().insert(name.into(), Rc::new(f));
    }

    /// Unregisters a compute function. Returns `false` if it was not registered.
    pub fn remove_compute_fn(&self, name: &str) -> bool {
        self.fns.borrow_mut().remove(name).is_some()
    }

    /// Returns `true` if a compute function is registered under `name`.
    pub fn has_compute_fn(&self, name: &str) -> bool {
        self.fns.borrow().contains_key(name)
    }

    fn compute_fn(&self, name: &str) -> Option<ComputeFn> {
        self.fns.borrow().get(name).cloned()
    }

    /// Registers the `$domain` derived dataset on `collection`.
    ///
    /// Its sources are the deduplicated union of every dimension's sources.
    pub fn add_domain_derivation(&self, config: DomainConfig, collection: &mut Collection) {
        let mut union: Vec<Source> = Vec::new();
        for dim in config.dimensions.values() {
            for token in Sources::parse(&dim.sources).tokens() {
                if !union.contains(token) {
                    union.push(token.clone());
                }
            }
        }
        let tokens = union.clone();
        let registry = self.clone();
        let dimensions = config.dimensions;

        collection.add(
            Dataset::new(DOMAIN_ID)
                .with_sources(Sources::from(union))
                .with_derivation(move |selections| {
                    let mut out = Dataset::new(DOMAIN_ID);
                    for (name, dim) in &dimensions {
                        let domain = compute_domain(name, dim, &tokens, selections, &registry);
                        out.attrs.insert(name.clone(), domain);
                    }
                    Ok(Entry::Dataset(out))
                }),
        );
    }
}

/// Registers `$domain` using the built-in compute functions.
pub fn add_domain_derivation(config: DomainConfig, collection: &mut Collection) {
    DomainRegistry::default().add_domain_derivation(config, collection);
}

/// Domain settings, keyed by dimension name.
///
/// Deserializes from a JSON object such as
/// `{"x": {"sources": "*", "compute": "interval", "args": {"unit": "day", "period": 7}}}`.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct DomainConfig {
    dimensions: BTreeMap<String, DimensionDomain>,
}

impl DomainConfig {
    /// Creates an empty configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a configuration from JSON.
    pub fn from_json(value: &Value) -> Result<Self, DomainConfigError> {
        Self::deserialize(value).map_err(|e| DomainConfigError::Invalid(alloc::format!("{e}")))
    }

    /// Sets the domain settings of one dimension.
    pub fn with_dimension(mut self, name: impl Into<String>, domain: DimensionDomain) -> Self {
        self.dimensions.insert(name.into(), domain);
        self
    }

    /// Looks up the settings of a dimension.
    pub fn dimension(&self, name: &str) -> Option<&DimensionDomain> {
        self.dimensions.get(name)
    }
}

/// Domain settings of one dimension.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DimensionDomain {
    /// Source spec the domain is computed over. An empty string skips computing entirely and
    /// yields `fallback`.
    pub sources: String,
    /// Name of the compute function.
    pub compute: String,
    /// Arguments passed to the compute function.
    pub args: Value,
    /// Adjustments applied after computing.
    pub modifier: DomainModifier,
    /// Domain used when nothing could be computed.
    #[serde(rename = "default")]
    pub fallback: Value,
}

impl Default for DimensionDomain {
    fn default() -> Self {
        Self {
            sources: "*".into(),
            compute: "extent".into(),
            args: Value::Null,
            modifier: DomainModifier::default(),
            fallback: Value::Null,
        }
    }
}

impl DimensionDomain {
    /// Computes the `extent` of the given sources.
    pub fn new(sources: impl Into<String>) -> Self {
        Self {
            sources: sources.into(),
            ..Self::default()
        }
    }

    /// Selects the compute function.
    pub fn with_compute(mut self, name: impl Into<String>, args: Value) -> Self {
        self.compute = name.into();
        self.args = args;
        self
    }

    /// Values the domain must include.
    pub fn with_force(mut self, values: impl IntoIterator<Item = Value>) -> Self {
        self.modifier.force = values.into_iter().collect();
        self
    }

    /// Scales the domain maximum.
    pub fn with_max_multiplier(mut self, multiplier: f64) -> Self {
        self.modifier.max_multiplier = Some(multiplier);
        self
    }

    /// Sets the fallback domain.
    pub fn with_default(mut self, fallback: Value) -> Self {
        self.fallback = fallback;
        self
    }
}

/// Post-processing of a computed domain.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DomainModifier {
    /// Values unioned into the domain. Accepts a scalar or an array.
    #[serde(deserialize_with = "one_or_many")]
    pub force: Vec<Value>,
    /// Replaces the maximum with `round(max * multiplier)`.
    pub max_multiplier: Option<f64>,
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Value>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        other => vec![other],
    })
}

fn compute_domain(
    name: &str,
    dim: &DimensionDomain,
    tokens: &[Source],
    selections: &[Selection],
    registry: &DomainRegistry,
) -> Value {
    if dim.sources.is_empty() {
        return dim.fallback.clone();
    }

    let mut sel = Selection::new();
    for token in Sources::parse(&dim.sources).tokens() {
        let Some(i) = tokens.iter().position(|t| t == token) else {
            continue;
        };
        if let Some(s) = selections.get(i) {
            sel.extend(s.iter().cloned());
        }
    }

    let mut domain = match registry.compute_fn(&dim.compute) {
        Some(f) => f(&sel, name, &dim.args),
        None => {
            tracing::warn!(
                dimension = name,
                compute = %dim.compute,
                "unknown domain compute function, using extent"
            );
            extent(&sel, name, &dim.args)
        }
    };

    if !dim.modifier.force.is_empty() {
        let mut nums: Vec<f64> = match &domain {
            Value::Array(items) => items.iter().filter_map(as_number).collect(),
            other => as_number(other).into_iter().collect(),
        };
        nums.extend(dim.modifier.force.iter().filter_map(as_number));
        domain = extent_value(&nums);
    }

    if let Some(multiplier) = dim.modifier.max_multiplier
        && let Value::Array(pair) = &mut domain
        && let Some(max) = pair.get(1).and_then(as_number)
    {
        pair[1] = number(js_round(max * multiplier));
    }

    if domain.is_null() {
        dim.fallback.clone()
    } else {
        domain
    }
}

fn extent_value(nums: &[f64]) -> Value {
    fold_extent(nums).map_or(Value::Null, |(lo, hi)| {
        Value::Array(vec![number(lo), number(hi)])
    })
}

/// `[min, max]` of `dimension` across every dataset in `sources`.
fn extent(sources: &Selection, dimension: &str, _args: &Value) -> Value {
    sources
        .dim(dimension)
        .concat()
        .extent()
        .first()
        .cloned()
        .unwrap_or(Value::Null)
}

/// The extent, with its minimum raised to `max - period * unit` when that is later.
///
/// `args` must name a [`TimeUnit`] (`"unit"`) and a numeric `"period"`; otherwise this is the
/// plain extent. A period reaching outside the representable time range yields `null`.
fn interval(sources: &Selection, dimension: &str, args: &Value) -> Value {
    let domain = extent(sources, dimension, args);
    let unit = args.get("unit").and_then(Value::as_str).and_then(TimeUnit::parse);
    let period = args.get("period").and_then(as_number);
    let (Some(unit), Some(period)) = (unit, period) else {
        return domain;
    };
    let Value::Array(pair) = &domain else {
        return domain;
    };
    let (Some(min), Some(max)) = (
        pair.first().and_then(as_number),
        pair.get(1).and_then(as_number),
    ) else {
        return domain;
    };
    let start = unit.offset(max, -period);
    if start.is_nan() {
        return Value::Null;
    }
    Value::Array(vec![number(min.max(start)), number(max)])
}
