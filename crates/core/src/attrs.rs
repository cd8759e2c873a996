// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed attribute values and the `a{sv}`-style attribute bag.
//!
//! Jobs and printers carry open-ended attribute maps keyed by IPP-style
//! names. Unknown keys are preserved verbatim; only the value scalar is
//! typed.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Attribute names the engine itself reads.
pub const ATTR_USER: &str = "job-originating-user-name";
pub const ATTR_DOCUMENT_FORMAT: &str = "document-format";
pub const ATTR_MEDIA: &str = "media";
pub const ATTR_DEVICE_URI: &str = "device-uri";

/// A typed scalar attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Bool(bool),
    Int(i64),
    Str(String),
    Strings(Vec<String>),
}

impl AttrValue {
    /// Borrow the string payload, if this value is a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for AttrValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttrValue::Bool(b) => write!(f, "{b}"),
            AttrValue::Int(i) => write!(f, "{i}"),
            AttrValue::Str(s) => f.write_str(s),
            AttrValue::Strings(v) => write!(f, "{}", v.join(",")),
        }
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Str(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Str(s)
    }
}

impl From<i64> for AttrValue {
    fn from(i: i64) -> Self {
        AttrValue::Int(i)
    }
}

impl From<bool> for AttrValue {
    fn from(b: bool) -> Self {
        AttrValue::Bool(b)
    }
}

/// Attribute bag: name → typed scalar. Insertion order is irrelevant.
pub type Attributes = HashMap<String, AttrValue>;

/// Right-biased merge: every key of `base` not shadowed by `updates`, then
/// all of `updates`.
pub fn update_attributes(base: &Attributes, updates: &Attributes) -> Attributes {
    let mut merged = base.clone();
    for (key, value) in updates {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

#[cfg(test)]
#[path = "attrs_tests.rs"]
mod tests;
