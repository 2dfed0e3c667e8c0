// Copyright 2025 the Glint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Example binary for `glint_data` and `glint_transforms`.
//!
//! Run with `RUST_LOG=glint_data=debug` to see the derivation pass.

use glint_data::{
    Collection, DOMAIN_ID, Dataset, DomainConfig, Entry, add_domain_derivation, timestamp_ms,
};
use glint_transforms::{SelectionExt, Transform};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut collection = Collection::new();
    collection.add_all([
        series("apples", &[3.0, 5.0, 4.0, 7.0]),
        series("pears", &[1.0, 2.0, 2.0, 3.0]),
    ]);
    collection.add(Transform::stack().derived("stacked", "apples,pears"));

    let config = DomainConfig::from_json(&json!({
        "x": { "sources": "*" },
        "y": { "sources": "stacked", "modifier": { "maxMultiplier": 1.2 } },
    }));
    match config {
        Ok(config) => add_domain_derivation(config, &mut collection),
        Err(err) => {
            eprintln!("invalid domain config: {err}");
            return;
        }
    }

    let report = match collection.update_derivations() {
        Ok(report) => report,
        Err(err) => {
            eprintln!("derivation failed: {err}");
            return;
        }
    };
    println!("pass #1 order: {:?}", report.order());
    print_state(&collection);

    collection.append("pears", [json!({ "t": timestamp_ms(2024, 5, 1, 0, 0, 0), "v": 9 })]);
    collection.append("apples", [json!({ "t": timestamp_ms(2024, 5, 1, 0, 0, 0), "v": 2 })]);
    if let Err(err) = collection.update_derivations() {
        eprintln!("derivation failed: {err}");
        return;
    }
    println!("pass #2 (appended May)");
    print_state(&collection);

    let rates = collection.select("apples").diff_quotient();
    println!("apples rate per ms: {:?}", rates.dim("y").first());
}

fn series(id: &str, values: &[f64]) -> Dataset {
    Dataset::new(id)
        .with_data(values.iter().enumerate().map(|(i, v)| {
            let month = 1 + u32::try_from(i).unwrap_or(0);
            json!({ "t": timestamp_ms(2024, month, 1, 0, 0, 0), "v": v })
        }))
        .with_dimension("x", "t")
        .with_dimension("y", "v")
        .with_tag("fruit")
}

fn print_state(collection: &Collection) {
    let stacked = collection.select("stacked");
    for (entry, y0) in stacked.iter().zip(stacked.dim("y0").all()) {
        if let Entry::Dataset(d) = entry {
            println!("  {:>8} y0 = {y0}", d.id);
        }
    }
    if let Some(Entry::Dataset(domain)) = collection.get(DOMAIN_ID) {
        println!("  domain = {}", Value::Object(domain.attrs));
    }
}
