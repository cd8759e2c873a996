// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job identifier and the IPP job-state model (RFC 2911 §4.3.7).

use serde::{Deserialize, Serialize};

/// State reason present from creation until a document has been spooled.
pub const JOB_INCOMING: &str = "job-incoming";
/// State reason recording a user-initiated cancellation request.
pub const CANCELED_BY_USER: &str = "canceled-by-user";
/// State reason set while a processing job winds down after a cancel.
pub const PROCESSING_TO_STOP_POINT: &str = "processing-to-stop-point";

/// Unique identifier for a job: a monotonic 32-bit counter assigned at
/// creation, also the `<u>` in `/org/freedesktop/printerd/job/<u>`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct JobId(u32);

impl JobId {
    pub fn new(id: u32) -> Self {
        JobId(id)
    }

    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// IPP job states. `Canceled`, `Aborted` and `Completed` are sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobState {
    PendingHeld,
    Pending,
    Processing,
    ProcessingStopped,
    Canceled,
    Aborted,
    Completed,
}

impl JobState {
    /// Terminal states are never left again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Canceled | JobState::Aborted | JobState::Completed
        )
    }

    /// Whether a pipeline may exist in this state.
    pub fn has_pipeline(&self) -> bool {
        matches!(self, JobState::Processing | JobState::ProcessingStopped)
    }
}

crate::simple_display! {
    JobState {
        PendingHeld => "pending-held",
        Pending => "pending",
        Processing => "processing",
        ProcessingStopped => "processing-stopped",
        Canceled => "canceled",
        Aborted => "aborted",
        Completed => "completed",
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
