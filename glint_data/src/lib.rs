// Copyright 2025 the Glint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Reactive dataset collection for glint charts.
//!
//! A [`Collection`] stores named [`Dataset`]s. Some datasets are raw (they carry `data` points
//! directly) and some are *derived*: they name their inputs through [`Sources`] and compute
//! their value with a [`Derivation`] over one [`Selection`] per source.
//!
//! Derived values are only recomputed by [`Collection::update_derivations`], which evaluates
//! datasets dependencies-first and tolerates circular dependencies by substituting an
//! [`Entry::Circular`] marker instead of recursing forever.
//!
//! On top of the collection:
//! - [`Accessors`] resolves dimension descriptors (dotted paths or functions) into memoized
//!   [`Accessor`]s,
//! - [`DimensionSelection`] aggregates per-dimension values (sum, extent, ...), and
//! - [`DomainRegistry`] registers the `$domain` derived dataset that computes axis domains.
//!
//! Point records are [`serde_json::Value`]s. Time values are milliseconds since the Unix epoch.

#![no_std]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

mod accessor;
mod collection;
#[cfg(test)]
mod collection_tests;
mod dataset;
mod dimension;
mod domain;
mod error;
#[cfg(not(feature = "std"))]
mod float;
mod selection;
mod time;
mod value;

pub use accessor::{Accessor, Accessors};
pub use collection::{Collection, DerivationReport};
pub use dataset::{
    CIRCULAR_DEPENDENCY, Dataset, Derivation, DerivationResult, Entry, Source, Sources, Tags,
};
pub use dimension::DimensionSelection;
pub use domain::{
    ComputeFn, DOMAIN_ID, DimensionDomain, DomainConfig, DomainModifier, DomainRegistry,
    add_domain_derivation,
};
pub use error::{DerivationError, DomainConfigError};
pub use selection::Selection;
pub use time::{TimeUnit, civil, timestamp_ms};
pub use value::{as_number, js_round, number};

pub use serde_json::{Map, Value};
