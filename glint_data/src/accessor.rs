// Copyright 2025 the Glint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dimension accessors.
//!
//! A dimension maps a point record to one value (the `x` of a line point, the `y0` of a stacked
//! area, ...). It is described either by a dotted path into the record (`"stats.mean"`) or by a
//! function of `(record, index)`.

extern crate alloc;

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use hashbrown::HashMap;
use serde_json::Value;

type AccessorFn = dyn Fn(&Value, usize) -> Value;

/// A resolved dimension accessor.
///
/// Cloning is cheap: both variants are reference counted. Two clones of the same accessor are
/// [`Accessor::ptr_eq`].
#[derive(Clone)]
pub struct Accessor {
    kind: Kind,
}

#[derive(Clone)]
enum Kind {
    Path(Rc<Path>),
    Func(Rc<AccessorFn>),
}

struct Path {
    descriptor: String,
    segments: Vec<String>,
}

impl Path {
    fn compile(descriptor: &str) -> Self {
        Self {
            descriptor: descriptor.into(),
            segments: descriptor.split('.').map(String::from).collect(),
        }
    }

    fn walk(&self, record: &Value) -> Value {
        let mut cur = record;
        for seg in &self.segments {
            let next = match cur {
                Value::Object(map) => map.get(seg.as_str()),
                Value::Array(items) => seg.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            };
            match next {
                Some(v) if !v.is_null() => cur = v,
                _ => return Value::Null,
            }
        }
        cur.clone()
    }
}

impl Accessor {
    /// Compiles a dotted path accessor.
    ///
    /// Numeric segments index into arrays. A missing segment resolves to `Value::Null`.
    pub fn path(descriptor: &str) -> Self {
        Self {
            kind: Kind::Path(Rc::new(Path::compile(descriptor))),
        }
    }

    /// Wraps a function of `(record, index)`.
    pub fn func(f: impl Fn(&Value, usize) -> Value + 'static) -> Self {
        Self {
            kind: Kind::Func(Rc::new(f)),
        }
    }

    /// Returns the path descriptor, or `None` for function accessors.
    pub fn descriptor(&self) -> Option<&str> {
        match &self.kind {
            Kind::Path(p) => Some(&p.descriptor),
            Kind::Func(_) => None,
        }
    }

    /// Reads this dimension from `record`, the `index`-th point of its dataset.
    pub fn call(&self, record: &Value, index: usize) -> Value {
        match &self.kind {
            Kind::Path(p) => p.walk(record),
            Kind::Func(f) => f(record, index),
        }
    }

    /// Returns `true` if both accessors are the same instance.
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        match (&a.kind, &b.kind) {
            (Kind::Path(a), Kind::Path(b)) => Rc::ptr_eq(a, b),
            (Kind::Func(a), Kind::Func(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Kind::Path(p) => f.debug_tuple("Accessor::Path").field(&p.descriptor).finish(),
            Kind::Func(_) => f.write_str("Accessor::Func(..)"),
        }
    }
}

impl From<&str> for Accessor {
    fn from(value: &str) -> Self {
        Self::path(value)
    }
}

impl From<String> for Accessor {
    fn from(value: String) -> Self {
        Self::path(&value)
    }
}

/// Memoizing accessor resolver.
///
/// Path descriptors are compiled once and cached by their exact string, so resolving the same
/// descriptor twice yields the same [`Accessor`] instance until [`Accessors::clear`].
#[derive(Debug, Default)]
pub struct Accessors {
    cache: HashMap<String, Accessor>,
}

impl Accessors {
    /// Creates an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves a path descriptor, compiling it on first use.
    pub fn get(&mut self, descriptor: &str) -> Accessor {
        if let Some(hit) = self.cache.get(descriptor) {
            return hit.clone();
        }
        let accessor = Accessor::path(descriptor);
        self.cache.insert(descriptor.into(), accessor.clone());
        accessor
    }

    /// Resolves an accessor through the cache.
    ///
    /// Function accessors are returned unchanged; path accessors are replaced by the cached
    /// instance for their descriptor.
    pub fn resolve(&mut self, accessor: Accessor) -> Accessor {
        match accessor.descriptor() {
            Some(descriptor) => match self.cache.get(descriptor) {
                Some(hit) => hit.clone(),
                None => {
                    self.cache.insert(descriptor.into(), accessor.clone());
                    accessor
                }
            },
            None => accessor,
        }
    }

    /// Drops every cached accessor.
    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Number of cached descriptors.
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use serde_json::json;

    use super::*;

    #[test]
    fn paths_walk_nested_objects_and_arrays() {
        let rec = json!({ "a": { "b": [10, { "c": 3 }] } });
        assert_eq!(Accessor::path("a.b.1.c").call(&rec, 0), json!(3));
        assert_eq!(Accessor::path("a.b.0").call(&rec, 0), json!(10));
    }

    #[test]
    fn missing_segments_resolve_to_null() {
        let rec = json!({ "a": { "b": null } });
        assert_eq!(Accessor::path("a.b.c").call(&rec, 0), Value::Null);
        assert_eq!(Accessor::path("x.y").call(&rec, 0), Value::Null);
        assert_eq!(Accessor::path("a.b").call(&json!(5), 0), Value::Null);
    }

    #[test]
    fn function_accessors_receive_the_index() {
        let acc = Accessor::func(|_, i| json!(i * 2));
        assert_eq!(acc.call(&Value::Null, 3), json!(6));
        assert_eq!(acc.descriptor(), None);
    }

    #[test]
    fn resolver_memoizes_until_cleared() {
        let mut accessors = Accessors::new();
        let a = accessors.get("x");
        let b = accessors.get("x");
        assert!(Accessor::ptr_eq(&a, &b), "same descriptor should hit the cache");

        accessors.clear();
        let c = accessors.get("x");
        assert!(!Accessor::ptr_eq(&a, &c), "clear should drop cached instances");
        assert_eq!(a.call(&json!({ "x": 1 }), 0), c.call(&json!({ "x": 1 }), 0));
    }

    #[test]
    fn resolve_passes_functions_through() {
        let mut accessors = Accessors::new();
        let f = Accessor::func(|r, _| r.clone());
        let resolved = accessors.resolve(f.clone());
        assert!(Accessor::ptr_eq(&f, &resolved));
        assert!(accessors.is_empty());

        let first = accessors.resolve(Accessor::path("y"));
        let second = accessors.resolve(Accessor::path("y"));
        assert!(Accessor::ptr_eq(&first, &second));
        assert_eq!(accessors.len(), 1);
    }
}
