// Copyright 2025 the Glint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Numeric helpers over JSON point values.

use serde_json::Value;

#[cfg(not(feature = "std"))]
use crate::float::FloatExt;

/// Largest integer magnitude an `f64` represents exactly.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

/// Converts an `f64` into a JSON number.
///
/// Integral values become integer numbers, so `number(60.0) == json!(60)`. Non-finite values
/// become `Value::Null`.
pub fn number(v: f64) -> Value {
    if !v.is_finite() {
        return Value::Null;
    }
    if v.abs() <= MAX_SAFE_INTEGER {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "magnitude checked against the exactly representable integer range"
        )]
        let i = v as i64;
        if i as f64 == v {
            return Value::from(i);
        }
    }
    Value::from(v)
}

/// Reads a finite number out of a JSON value.
///
/// Everything that is not a finite JSON number (null, strings, objects, ...) yields `None`.
pub fn as_number(v: &Value) -> Option<f64> {
    v.as_f64().filter(|n| n.is_finite())
}

/// Rounds half-way cases towards positive infinity (`-2.5` rounds to `-2`).
pub fn js_round(v: f64) -> f64 {
    (v + 0.5).floor()
}
