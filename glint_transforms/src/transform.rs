// Copyright 2025 the Glint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Transform IR types.

extern crate alloc;

use alloc::string::String;

use glint_data::Selection;

use crate::{quotient, stack};

/// A transform from one selection of series to another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transform {
    /// Stack series on top of each other, in selection order.
    ///
    /// Every output point carries each input dimension under the dimension's name, plus
    /// `output` holding the sum of `field` over all preceding series at the same index. The
    /// first series sits on `0`.
    Stack {
        /// Dimension whose values are accumulated (default `y`).
        field: String,
        /// Dimension receiving the baseline (default `y0`).
        output: String,
    },
    /// Rate of change between consecutive points of each series.
    ///
    /// Point `i >= 1` becomes `{x: x_i, y: (y_i - y_{i-1}) / (x_i - x_{i-1})}`. A zero or
    /// missing difference yields `null`.
    DiffQuotient {
        /// Dimension used as the denominator (default `x`).
        x: String,
        /// Dimension used as the numerator (default `y`).
        y: String,
    },
}

impl Transform {
    /// `Stack` of `y` into `y0`.
    pub fn stack() -> Self {
        Self::Stack {
            field: "y".into(),
            output: "y0".into(),
        }
    }

    /// `DiffQuotient` of `y` over `x`.
    pub fn diff_quotient() -> Self {
        Self::DiffQuotient {
            x: "x".into(),
            y: "y".into(),
        }
    }

    /// Applies the transform.
    ///
    /// Entries that are not datasets are carried through unchanged.
    pub fn apply(&self, input: &Selection) -> Selection {
        match self {
            Self::Stack { field, output } => stack::stack(input, field, output),
            Self::DiffQuotient { x, y } => quotient::diff_quotient(input, x, y),
        }
    }
}
