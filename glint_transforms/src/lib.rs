// Copyright 2025 the Glint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Series transforms over `glint_data` selections.
//!
//! This crate provides:
//! - a small transform IR ([`Transform`]) mapping a selection of series to a new selection,
//! - [`SelectionExt`], which exposes the transforms as selection methods, and
//! - [`Transform::derived`], which turns a transform into a derived dataset.
//!
//! Transforms never edit their input: every output series is a fresh dataset whose points are
//! fresh objects.

#![no_std]

extern crate alloc;

mod derive;
mod quotient;
mod stack;
mod transform;

pub use derive::SelectionExt;
pub use transform::Transform;
