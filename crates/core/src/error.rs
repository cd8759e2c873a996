// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy for engine method invocations.
//!
//! Errors during method invocations are returned to the caller; errors
//! observed asynchronously on a pipeline transition the job to `aborted`
//! instead and never surface here.

use thiserror::Error;

/// Errors returned by job/printer/engine operations.
#[derive(Debug, Error)]
pub enum MethodError {
    /// Caller is not the originating user, or authorization failed.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// A document was already added to this job.
    #[error("no more documents allowed")]
    DocumentAlreadyAdded,

    /// Cancel on a job that already reached a terminal state.
    #[error("job is already in a terminal state")]
    AlreadyTerminal,

    /// Cancel while a previous cancel is still winding the job down.
    #[error("job is already being canceled")]
    AlreadyCanceling,

    /// Start without a prior AddDocument.
    #[error("no document")]
    MissingDocument,

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A pipeline child could not be started.
    #[error("failed to start {command}: {source}")]
    SpawnFailed {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("{0} is not implemented")]
    Unimplemented(String),

    /// Invariant violated; logged and surfaced, never swallowed.
    #[error("internal error: {0}")]
    Internal(String),
}
