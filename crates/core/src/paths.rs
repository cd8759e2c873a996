// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Object paths published on the bus.
//!
//! The binding layer translates method calls on these paths into engine
//! operations; the engine only produces and resolves them.

use crate::job::JobId;

pub const MANAGER_PATH: &str = "/org/freedesktop/printerd/Manager";

const PRINTER_PREFIX: &str = "/org/freedesktop/printerd/printer/";
const JOB_PREFIX: &str = "/org/freedesktop/printerd/job/";
const DEVICE_PREFIX: &str = "/org/freedesktop/printerd/device/";

pub fn printer_path(id: &str) -> String {
    format!("{PRINTER_PREFIX}{id}")
}

pub fn job_path(id: JobId) -> String {
    format!("{JOB_PREFIX}{id}")
}

pub fn device_path(id: &str) -> String {
    format!("{DEVICE_PREFIX}{id}")
}

/// Printer id from its object path, if the path is printer-shaped.
pub fn printer_id_from_path(path: &str) -> Option<&str> {
    path.strip_prefix(PRINTER_PREFIX).filter(|id| !id.is_empty())
}

/// Job id from its object path, if the path is job-shaped.
pub fn job_id_from_path(path: &str) -> Option<JobId> {
    path.strip_prefix(JOB_PREFIX)?.parse().ok().map(JobId::new)
}

#[cfg(test)]
#[path = "paths_tests.rs"]
mod tests;
