// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Printer state and id canonicalization.

use serde::{Deserialize, Serialize};

/// IPP printer states. `Stopped` is representable but the engine never
/// enters it on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrinterState {
    Idle,
    Processing,
    Stopped,
}

crate::simple_display! {
    PrinterState {
        Idle => "idle",
        Processing => "processing",
        Stopped => "stopped",
    }
}

/// Derive a printer id from its name: every character outside
/// `[A-Za-z0-9_]` becomes `_`.
pub fn canonicalize_id(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

#[cfg(test)]
#[path = "printer_tests.rs"]
mod tests;
