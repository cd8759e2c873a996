// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Opaque driver-descriptor (PPD) parsing.
//!
//! The engine only reads `*cupsFilter: "<mime> <cost> <program>"` entries;
//! everything else in the descriptor is someone else's business.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Content type assumed when the descriptor names no filters.
pub const DEFAULT_CONTENT_TYPE: &str = "application/vnd.cups-pdf";

#[derive(Debug, Error)]
pub enum PpdError {
    #[error("unable to open PPD {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// One `*cupsFilter` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterEntry {
    pub content_type: String,
    pub cost: u32,
    pub command: String,
}

/// Read the filter entries from a driver descriptor. Malformed entries are
/// skipped, as the original parser does.
pub fn read_filters(path: &Path) -> Result<Vec<FilterEntry>, PpdError> {
    let text = std::fs::read_to_string(path).map_err(|source| PpdError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let mut entries = Vec::new();
    for line in text.lines() {
        let Some(rest) = line.trim_start().strip_prefix("*cupsFilter:") else {
            continue;
        };
        let value = rest.trim().trim_matches('"');
        let mut tokens = value.splitn(3, &[' ', '\t'][..]);
        let (Some(content_type), Some(cost), Some(command)) =
            (tokens.next(), tokens.next(), tokens.next())
        else {
            continue;
        };
        let Ok(cost) = cost.parse::<u32>() else {
            continue;
        };
        if content_type.is_empty() {
            continue;
        }
        entries.push(FilterEntry {
            content_type: content_type.to_string(),
            cost,
            command: command.trim().to_string(),
        });
    }
    Ok(entries)
}

/// Select the final content type and filter command: lowest cost wins, the
/// first encountered on ties. Without entries, PDF with an empty filter.
pub fn select_filter(entries: &[FilterEntry]) -> (String, String) {
    let mut best: Option<&FilterEntry> = None;
    for entry in entries {
        if best.map_or(true, |current| entry.cost < current.cost) {
            best = Some(entry);
        }
    }
    match best {
        Some(entry) => (entry.content_type.clone(), entry.command.clone()),
        None => (DEFAULT_CONTENT_TYPE.to_string(), String::new()),
    }
}

#[cfg(test)]
#[path = "ppd_tests.rs"]
mod tests;
