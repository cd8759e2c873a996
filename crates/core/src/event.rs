// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events posted to the engine's control loop.
//!
//! All engine mutation happens on the loop task; pipeline tasks, device
//! scanning and worker-thread method handlers communicate with it
//! exclusively through these events. Serializes with
//! `{"type": "event:name", ...fields}` format.

use crate::job::JobId;
use serde::{Deserialize, Serialize};

/// The two child stages of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Arranger,
    Backend,
}

crate::simple_display! {
    Stage {
        Arranger => "arranger",
        Backend => "backend",
    }
}

/// Events that drive state transitions in the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// A job finished spooling and is pending; the owning printer should
    /// look for work.
    #[serde(rename = "job:queued")]
    JobQueued { job: JobId },

    /// A cancel request was accepted by the method surface; the loop
    /// performs the transition (and the two-phase stop when processing).
    #[serde(rename = "job:cancel")]
    CancelJob { job: JobId },

    /// Reason tags parsed from a child `STATE:` line, in arrival order.
    #[serde(rename = "job:reasons")]
    JobReasons {
        job: JobId,
        add: Vec<String>,
        remove: Vec<String>,
    },

    /// A pipeline child exited. `status` is the raw wait status.
    #[serde(rename = "job:child-exited")]
    ChildExited {
        job: JobId,
        stage: Stage,
        status: i32,
    },

    /// A pipeline edge failed in a way that cannot be attributed to a
    /// consumer exit (anything but a broken pipe).
    #[serde(rename = "job:pipeline-error")]
    PipelineError { job: JobId, error: String },

    /// A USB printer appeared.
    #[serde(rename = "device:added")]
    DeviceAdded {
        sysfs_path: String,
        ieee1284_id: String,
        uri: String,
        description: String,
    },

    /// A USB printer went away.
    #[serde(rename = "device:removed")]
    DeviceRemoved { sysfs_path: String },
}

impl Event {
    /// Job this event concerns, if any.
    pub fn job(&self) -> Option<JobId> {
        match self {
            Event::JobQueued { job }
            | Event::CancelJob { job }
            | Event::JobReasons { job, .. }
            | Event::ChildExited { job, .. }
            | Event::PipelineError { job, .. } => Some(*job),
            Event::DeviceAdded { .. } | Event::DeviceRemoved { .. } => None,
        }
    }
}
