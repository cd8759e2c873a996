// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job objects: attributes, document spooling, the IPP state machine.
//!
//! Method surfaces (`add_document`, `start`, `cancel`) run on worker
//! threads and only validate and mark state under the job lock; the actual
//! transitions and all pipeline work are posted to the control loop.

use crate::pipeline::Pipeline;
use crate::spool;
use pd_core::{
    AttrValue, Attributes, Event, Invocation, JobId, JobState, MethodError, StateReasons,
    ATTR_USER, CANCELED_BY_USER, JOB_INCOMING, PROCESSING_TO_STOP_POINT,
};
use crate::engine::Engine;
use parking_lot::Mutex;
use std::os::fd::OwnedFd;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempPath;
use tokio::sync::mpsc;

pub struct Job {
    id: JobId,
    object_path: String,
    printer_path: String,
    events: mpsc::Sender<Event>,
    inner: Mutex<JobInner>,
}

struct JobInner {
    name: String,
    attributes: Attributes,
    state: JobState,
    state_reasons: StateReasons,
    /// Transferred document fd, held from AddDocument until Start spools it.
    document_fd: Option<OwnedFd>,
    /// Spool file; unlinked when dropped.
    spool: Option<TempPath>,
    /// Present only while the job is processing.
    pipeline: Option<Pipeline>,
}

impl Job {
    pub(crate) fn new(
        id: JobId,
        printer_path: &str,
        name: &str,
        attributes: Attributes,
        events: mpsc::Sender<Event>,
    ) -> Arc<Job> {
        let mut state_reasons = StateReasons::new();
        state_reasons.add(JOB_INCOMING);
        Arc::new(Job {
            id,
            object_path: pd_core::paths::job_path(id),
            printer_path: printer_path.to_string(),
            events,
            inner: Mutex::new(JobInner {
                name: name.to_string(),
                attributes,
                state: JobState::PendingHeld,
                state_reasons,
                document_fd: None,
                spool: None,
                pipeline: None,
            }),
        })
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn object_path(&self) -> &str {
        &self.object_path
    }

    pub fn printer_path(&self) -> &str {
        &self.printer_path
    }

    pub fn name(&self) -> String {
        self.inner.lock().name.clone()
    }

    pub fn state(&self) -> JobState {
        self.inner.lock().state
    }

    pub fn state_reasons(&self) -> StateReasons {
        self.inner.lock().state_reasons.clone()
    }

    pub fn attributes(&self) -> Attributes {
        self.inner.lock().attributes.clone()
    }

    pub fn attribute_str(&self, key: &str) -> Option<String> {
        self.inner
            .lock()
            .attributes
            .get(key)
            .and_then(AttrValue::as_str)
            .map(str::to_string)
    }

    pub(crate) fn set_attribute(&self, key: &str, value: AttrValue) {
        self.inner.lock().attributes.insert(key.to_string(), value);
    }

    pub fn spool_path(&self) -> Option<PathBuf> {
        self.inner.lock().spool.as_ref().map(|p| p.to_path_buf())
    }

    fn require_originating_user(&self, invocation: &Invocation) -> Result<(), MethodError> {
        let owner = self.attribute_str(ATTR_USER);
        if owner.as_deref() == Some(invocation.username()) {
            Ok(())
        } else {
            Err(MethodError::PermissionDenied(format!(
                "{} is not the originating user",
                invocation.username()
            )))
        }
    }

    /// AddDocument: accept a single transferred document fd.
    pub fn add_document(
        &self,
        invocation: &Invocation,
        document: OwnedFd,
    ) -> Result<(), MethodError> {
        self.require_originating_user(invocation)?;
        let mut inner = self.inner.lock();
        if inner.document_fd.is_some() || inner.spool.is_some() {
            tracing::debug!(job = %self.id, "tried to add second document");
            return Err(MethodError::DocumentAlreadyAdded);
        }
        tracing::debug!(job = %self.id, "adding document");
        inner.document_fd = Some(document);
        Ok(())
    }

    /// Start: spool the document to a private file, move to `pending` and
    /// let the printer look for work.
    ///
    /// The copy loop runs on a blocking worker; it touches no engine state
    /// while it may block on disk I/O.
    pub async fn start(&self, engine: &Engine, invocation: &Invocation) -> Result<(), MethodError> {
        self.require_originating_user(invocation)?;
        let document = self
            .inner
            .lock()
            .document_fd
            .take()
            .ok_or(MethodError::MissingDocument)?;

        tracing::debug!(job = %self.id, "starting job, spooling");
        let spool_dir = engine.config().spool_dir.clone();
        let spooled = tokio::task::spawn_blocking(move || {
            spool::spool_document(document, spool_dir.as_deref())
        })
        .await
        .map_err(|error| MethodError::Internal(format!("spool task failed: {error}")))??;

        {
            let mut inner = self.inner.lock();
            tracing::debug!(job = %self.id, spool = %spooled.display(), "document spooled");
            inner.spool = Some(spooled);
            transition(&mut inner, self.id, JobState::Pending);
            inner.state_reasons.remove(JOB_INCOMING);
        }

        self.post(Event::JobQueued { job: self.id }).await
    }

    /// Cancel. Pending jobs are canceled outright; a processing job takes
    /// the two-phase path (stop data, then kill) on the control loop.
    pub async fn cancel(
        &self,
        engine: &Engine,
        invocation: &Invocation,
    ) -> Result<(), MethodError> {
        engine.check_authorization(invocation, &[pd_core::actions::JOB_CANCEL])?;
        self.require_originating_user(invocation)?;

        {
            let mut inner = self.inner.lock();
            if inner.state.is_terminal() {
                return Err(MethodError::AlreadyTerminal);
            }
            if inner.state_reasons.contains(PROCESSING_TO_STOP_POINT) {
                return Err(MethodError::AlreadyCanceling);
            }
            inner.state_reasons.add(CANCELED_BY_USER);
            if inner.state == JobState::Processing {
                tracing::info!(job = %self.id, "cancel requested while processing");
                inner.state_reasons.add(PROCESSING_TO_STOP_POINT);
            } else {
                tracing::info!(job = %self.id, "cancel requested");
            }
        }

        self.post(Event::CancelJob { job: self.id }).await
    }

    async fn post(&self, event: Event) -> Result<(), MethodError> {
        self.events
            .send(event)
            .await
            .map_err(|_| MethodError::Internal("engine loop is gone".into()))
    }

    // ------------------------------------------------------------------
    // Control-loop side
    // ------------------------------------------------------------------

    pub(crate) fn set_state(&self, state: JobState) {
        let mut inner = self.inner.lock();
        transition(&mut inner, self.id, state);
    }

    pub(crate) fn set_pipeline(&self, pipeline: Pipeline) {
        self.inner.lock().pipeline = Some(pipeline);
    }

    /// Two-phase stop: stop feeding data (closes the backend's stdin), then
    /// kill the arranger and the backend. Exit events still arrive and
    /// drive the terminal transition.
    pub(crate) fn stop_pipeline(&self) {
        let inner = self.inner.lock();
        if let Some(pipeline) = &inner.pipeline {
            pipeline.stop_data();
            pipeline.kill_children();
        }
    }

    /// Apply `STATE:` reason changes in arrival order.
    pub(crate) fn apply_reasons(&self, add: &[String], remove: &[String]) {
        let mut inner = self.inner.lock();
        for tag in add {
            tracing::debug!(job = %self.id, "state-reasons += {tag}");
            inner.state_reasons.add(tag);
        }
        for tag in remove {
            tracing::debug!(job = %self.id, "state-reasons -= {tag}");
            inner.state_reasons.remove(tag);
        }
    }

    /// Terminal transition: release the pipeline, clear the lifecycle
    /// reasons and drop the spool file. Returns false when the job was
    /// already terminal (terminal states are sinks).
    pub(crate) fn finish(&self, state: JobState) -> bool {
        let mut inner = self.inner.lock();
        if inner.state.is_terminal() {
            return false;
        }
        transition(&mut inner, self.id, state);
        inner.pipeline = None;
        inner.document_fd = None;
        inner.spool = None;
        inner.state_reasons.remove(JOB_INCOMING);
        inner.state_reasons.remove(PROCESSING_TO_STOP_POINT);
        true
    }
}

/// Apply a state transition; terminal states are never left.
fn transition(inner: &mut JobInner, id: JobId, state: JobState) {
    if inner.state.is_terminal() {
        tracing::warn!(
            job = %id,
            current = %inner.state,
            refused = %state,
            "ignoring transition out of a terminal state"
        );
        return;
    }
    if inner.state != state {
        tracing::info!(job = %id, from = %inner.state, to = %state, "job state");
        inner.state = state;
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
