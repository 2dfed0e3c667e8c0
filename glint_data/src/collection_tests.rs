// Copyright 2025 the Glint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

extern crate std;

use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::RefCell;

use serde_json::{Value, json};

use crate::{CIRCULAR_DEPENDENCY, Collection, Dataset, DerivationResult, Entry, Selection};

type Log = Rc<RefCell<Vec<String>>>;

/// A derived dataset that records when it runs and returns the number of entries it saw.
fn tracked(id: &str, sources: &str, log: &Log) -> Dataset {
    let log = Rc::clone(log);
    let name = String::from(id);
    Dataset::new(id)
        .with_sources(sources)
        .with_derivation(move |sel: &[Selection]| -> DerivationResult {
            log.borrow_mut().push(name.clone());
            let seen: usize = sel.iter().map(Selection::len).sum();
            Ok(Entry::Value(json!(seen)))
        })
}

fn raw(id: &str, ys: &[i64]) -> Dataset {
    Dataset::new(id)
        .with_data(ys.iter().enumerate().map(|(i, y)| json!({ "x": i, "y": y })))
        .with_dimension("x", "x")
        .with_dimension("y", "y")
}

fn log_of(log: &Log) -> Vec<String> {
    log.borrow().clone()
}

#[test]
fn dependencies_are_derived_first() {
    let log = Log::default();
    let mut c = Collection::new();
    c.add(tracked("A", "B", &log));
    c.add(tracked("B", "*", &log));
    c.add(raw("r1", &[1, 2]));

    let report = c.update_derivations().unwrap();
    assert_eq!(log_of(&log), ["B", "A"]);
    assert_eq!(report.order(), ["B", "A"]);
    assert!(!report.has_cycles());
}

#[test]
fn diamond_chain_evaluates_each_node_once_in_dependency_order() {
    let log = Log::default();
    let mut c = Collection::new();
    c.add(tracked("A", "B", &log));
    c.add(tracked("B", "C,D", &log));
    c.add(tracked("C", "E", &log));
    c.add(tracked("D", "*", &log));
    c.add(tracked("E", "F", &log));
    c.add(tracked("F", "D", &log));
    c.add(raw("r1", &[1]));

    c.update_derivations().unwrap();
    assert_eq!(log_of(&log), ["D", "F", "E", "C", "B", "A"]);
}

#[test]
fn cycles_terminate_and_every_member_gets_a_value() {
    let log = Log::default();
    let mut c = Collection::new();
    c.add(raw("C", &[1, 2, 3]));

    // A <- B, B <- {C, A}: a two-node cycle through A.
    for (id, sources) in [("A", "B"), ("B", "C,A")] {
        let log = Rc::clone(&log);
        let name = String::from(id);
        c.add(Dataset::new(id).with_sources(sources).with_derivation(move |sel| {
            log.borrow_mut().push(name.clone());
            let circular = sel.iter().flat_map(Selection::iter).any(Entry::is_circular);
            if circular {
                return Ok(Entry::Value(json!(CIRCULAR_DEPENDENCY)));
            }
            Ok(Entry::Value(json!(sel.len())))
        }));
    }

    let report = c.update_derivations().unwrap();
    assert_eq!(log_of(&log), ["B", "A"], "each member runs once");
    assert_eq!(report.circular(), ["A"]);
    assert_eq!(
        c.derived("B").and_then(Entry::as_value),
        Some(&json!(CIRCULAR_DEPENDENCY)),
        "B saw A while A was still in progress"
    );
    assert_eq!(c.derived("A").and_then(Entry::as_value), Some(&json!(1)));
}

#[test]
fn self_reference_is_a_cycle() {
    let mut c = Collection::new();
    c.add(Dataset::new("me").with_sources("me").with_derivation(|sel| {
        Ok(Entry::Value(json!(sel[0].first().is_some_and(Entry::is_circular))))
    }));
    let report = c.update_derivations().unwrap();
    assert_eq!(report.circular(), ["me"]);
    assert_eq!(c.derived("me").and_then(Entry::as_value), Some(&json!(true)));
}

#[test]
fn star_sources_track_the_current_raw_datasets() {
    let log = Log::default();
    let mut c = Collection::new();
    c.add(tracked("all", "*", &log));
    c.add(raw("a", &[1]));

    c.update_derivations().unwrap();
    assert_eq!(c.derived("all").and_then(Entry::as_value), Some(&json!(1)));

    c.add(raw("b", &[2]));
    c.update_derivations().unwrap();
    assert_eq!(c.derived("all").and_then(Entry::as_value), Some(&json!(2)));

    c.remove("a");
    c.remove("b");
    c.update_derivations().unwrap();
    assert_eq!(c.derived("all").and_then(Entry::as_value), Some(&json!(0)));
}

#[test]
fn one_selection_per_source_token() {
    let mut c = Collection::new();
    c.add(raw("a", &[1]));
    c.add(raw("b", &[2]));
    c.add(Dataset::new("arity").with_sources(["a", "b", "a", "missing"]).with_derivation(
        |sel| {
            let lens: Vec<Value> = sel.iter().map(|s| json!(s.len())).collect();
            Ok(Entry::Value(Value::Array(lens)))
        },
    ));
    c.add(Dataset::new("star").with_sources("*").with_derivation(|sel| {
        Ok(Entry::Value(json!([sel.len(), sel[0].len()])))
    }));

    c.update_derivations().unwrap();
    assert_eq!(
        c.derived("arity").and_then(Entry::as_value),
        Some(&json!([1, 1, 1, 0])),
        "repeats are passed again and unknown ids select nothing"
    );
    assert_eq!(
        c.derived("star").and_then(Entry::as_value),
        Some(&json!([1, 2])),
        "`*` is a single selection of every raw dataset"
    );
}

#[test]
fn derived_records_inherit_unset_fields() {
    let mut c = Collection::new();
    c.add(raw("a", &[3, 4]));
    c.add(
        Dataset::new("total")
            .with_attr("title", json!("Total"))
            .with_attr("color", json!("red"))
            .with_sources("a")
            .with_derivation(|sel| {
                let sum = sel[0].dim("y").sum().first().cloned().unwrap_or(Value::Null);
                Ok(Entry::Dataset(
                    Dataset::new("").with_attr("sum", sum).with_attr("color", json!("blue")),
                ))
            }),
    );

    c.update_derivations().unwrap();
    let Some(Entry::Dataset(d)) = c.get("total") else {
        panic!("total should derive a dataset");
    };
    assert_eq!(d.id, "total");
    assert_eq!(d.attr("sum"), Some(&json!(7)));
    assert_eq!(d.attr("title"), Some(&json!("Total")));
    assert_eq!(d.attr("color"), Some(&json!("blue")), "derived fields win");
    assert!(c.record("total").is_some_and(Dataset::is_derived));
}

#[test]
fn derived_objects_inherit_id_and_missing_attrs() {
    let mut c = Collection::new();
    c.add(raw("a", &[1, 4]));
    c.add(
        Dataset::new("d")
            .with_attr("title", json!("T"))
            .with_attr("min", json!(-1))
            .with_sources("a")
            .with_derivation(|sel| {
                let min = sel[0].dim("y").min().first().cloned().unwrap_or(Value::Null);
                Ok(Entry::Value(json!({ "min": min })))
            }),
    );
    c.add(Dataset::new("list").with_derivation(|_| Ok(Entry::Value(json!([1, 2])))));

    c.update_derivations().unwrap();
    assert_eq!(
        c.get("d").as_ref().and_then(Entry::as_value),
        Some(&json!({ "id": "d", "title": "T", "min": 1 })),
        "the derived field wins over the record attr"
    );
    assert_eq!(
        c.derived("list").and_then(Entry::as_value),
        Some(&json!([1, 2])),
        "arrays are stored verbatim"
    );
}

#[test]
fn derived_series_lists_are_selected_one_series_at_a_time() {
    let mut c = Collection::new();
    c.add(raw("a", &[1]));
    c.add(raw("b", &[2]));
    c.add(Dataset::new("both").with_sources("a,b"));
    c.add(Dataset::new("count").with_sources("both").with_derivation(|sel| {
        Ok(Entry::Value(json!(sel[0].len())))
    }));

    let report = c.update_derivations().unwrap();
    assert_eq!(report.order(), ["both", "count"]);
    assert_eq!(c.derived("both").map(|e| e.datasets().len()), Some(2));
    assert_eq!(c.derived("count").and_then(Entry::as_value), Some(&json!(2)));
}

#[test]
fn values_are_recomputed_only_on_update() {
    let log = Log::default();
    let mut c = Collection::new();
    c.add(raw("a", &[1]));
    c.add(tracked("n", "a", &log));
    c.update_derivations().unwrap();
    c.append("a", [json!({ "x": 1, "y": 5 })]);
    assert_eq!(log_of(&log).len(), 1);

    c.update_derivations().unwrap();
    assert_eq!(log_of(&log).len(), 2);
    assert_eq!(
        c.select("n").first().and_then(Entry::as_value),
        Some(&json!(1)),
        "select reads the cached derived value"
    );
    assert_eq!(c.select("a").dim("y").first(), Some(&json!([1, 5])));
}

#[test]
fn records_list_raw_representations() {
    let mut c = Collection::new();
    c.add(raw("a", &[1]));
    c.add(Dataset::new("d").with_sources("a").with_derivation(|_| Ok(Entry::Value(json!(0)))));
    c.update_derivations().unwrap();
    let ids: Vec<(&str, bool)> = c.records().map(|d| (d.id.as_str(), d.is_derived())).collect();
    assert_eq!(ids, vec![("a", false), ("d", true)]);
}
