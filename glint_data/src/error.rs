// Copyright 2025 the Glint Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.

use alloc::string::String;
use core::fmt;

/// Error returned by a [`Derivation`](crate::Derivation).
///
/// [`Collection::update_derivations`](crate::Collection::update_derivations) stops at the first
/// failing derivation and returns its error, tagged with the id of the dataset being derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivationError {
    dataset: Option<String>,
    message: String,
}

impl DerivationError {
    /// Creates an error with a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            dataset: None,
            message: message.into(),
        }
    }

    /// The id of the dataset whose derivation failed, once known.
    pub fn dataset(&self) -> Option<&str> {
        self.dataset.as_deref()
    }

    /// The error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    pub(crate) fn in_dataset(mut self, id: &str) -> Self {
        if self.dataset.is_none() {
            self.dataset = Some(id.into());
        }
        self
    }
}

impl fmt::Display for DerivationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.dataset {
            Some(id) => write!(f, "derivation of `{id}` failed: {}", self.message),
            None => write!(f, "derivation failed: {}", self.message),
        }
    }
}

impl core::error::Error for DerivationError {}

/// Errors returned when reading a [`DomainConfig`](crate::DomainConfig).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainConfigError {
    /// The configuration is not a JSON object of dimension entries.
    Invalid(String),
}

impl fmt::Display for DomainConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid(msg) => write!(f, "invalid domain config: {msg}"),
        }
    }
}

impl core::error::Error for DomainConfigError {}
