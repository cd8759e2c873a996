// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Printer objects: job list, defaults/supported attributes, driver state.
//!
//! A printer's mutable state lives behind a single mutex so RMI worker
//! threads can call into it concurrently. Lock hierarchy: a printer lock
//! may wrap a job lock, never the other way around.

use crate::engine::Engine;
use crate::job::Job;
use crate::ppd;
use pd_core::{
    actions, canonicalize_id, paths, update_attributes, AttrValue, Attributes, Invocation, JobId,
    JobState, MethodError, PrinterState, StateReasons, ATTR_DOCUMENT_FORMAT, ATTR_MEDIA, ATTR_USER,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub struct Printer {
    id: String,
    object_path: String,
    inner: Mutex<PrinterInner>,
}

struct PrinterInner {
    name: String,
    description: String,
    device_uris: Vec<String>,
    defaults: Attributes,
    supported: HashMap<String, Vec<AttrValue>>,
    jobs: Vec<Arc<Job>>,
    state: PrinterState,
    state_reasons: StateReasons,
    driver: Option<PathBuf>,
    final_content_type: Option<String>,
    final_filter: Option<String>,
    detached: bool,
}

impl Printer {
    /// New printer with the initial job-template attributes.
    pub(crate) fn new(name: &str, device_uris: Vec<String>) -> Self {
        let mut defaults = Attributes::new();
        defaults.insert(ATTR_MEDIA.into(), AttrValue::from("iso-a4"));
        defaults.insert(
            ATTR_DOCUMENT_FORMAT.into(),
            AttrValue::from("application/octet-stream"),
        );

        let mut supported = HashMap::new();
        supported.insert(
            ATTR_MEDIA.to_string(),
            vec![AttrValue::from("iso-a4"), AttrValue::from("na-letter")],
        );
        supported.insert(
            ATTR_DOCUMENT_FORMAT.to_string(),
            vec![AttrValue::from("application/pdf")],
        );

        let id = canonicalize_id(name);
        let object_path = paths::printer_path(&id);
        Printer {
            id,
            object_path,
            inner: Mutex::new(PrinterInner {
                name: name.to_string(),
                description: name.to_string(),
                device_uris,
                defaults,
                supported,
                jobs: Vec::new(),
                state: PrinterState::Idle,
                state_reasons: StateReasons::new(),
                driver: None,
                final_content_type: None,
                final_filter: None,
                detached: false,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn object_path(&self) -> &str {
        &self.object_path
    }

    pub fn name(&self) -> String {
        self.inner.lock().name.clone()
    }

    pub fn description(&self) -> String {
        self.inner.lock().description.clone()
    }

    pub fn state(&self) -> PrinterState {
        self.inner.lock().state
    }

    pub fn state_reasons(&self) -> StateReasons {
        self.inner.lock().state_reasons.clone()
    }

    pub fn defaults(&self) -> Attributes {
        self.inner.lock().defaults.clone()
    }

    pub fn device_uris(&self) -> Vec<String> {
        self.inner.lock().device_uris.clone()
    }

    pub fn is_detached(&self) -> bool {
        self.inner.lock().detached
    }

    pub(crate) fn set_detached(&self, detached: bool) {
        self.inner.lock().detached = detached;
        tracing::info!(printer = self.id(), detached, "printer attachment changed");
    }

    pub(crate) fn reattach(&self, device_uris: Vec<String>) {
        let mut inner = self.inner.lock();
        inner.device_uris = device_uris;
        inner.detached = false;
    }

    /// The device URI a job should use: always the first in the list.
    pub fn uri(&self) -> Result<String, MethodError> {
        self.inner
            .lock()
            .device_uris
            .first()
            .cloned()
            .ok_or_else(|| MethodError::Internal("printer has no device URI".into()))
    }

    /// Replace the supported-value list for one attribute.
    pub fn set_supported(&self, key: &str, values: Vec<AttrValue>) {
        self.inner.lock().supported.insert(key.to_string(), values);
    }

    /// CreateJob: merge defaults with the request, filter unsupported
    /// values, allocate the job and append it to this printer's list.
    ///
    /// Returns the job object path and the map of rejected attributes; the
    /// job is still created, with rejected keys falling back to defaults.
    pub fn create_job(
        &self,
        engine: &Engine,
        invocation: &Invocation,
        name: &str,
        attributes: &Attributes,
    ) -> Result<(String, Attributes), MethodError> {
        engine.check_authorization(invocation, &[actions::JOB_ADD])?;

        tracing::debug!(printer = self.id(), name, "creating job");
        let mut unsupported = Attributes::new();
        let job_attributes = {
            let inner = self.inner.lock();
            let mut accepted = attributes.clone();
            for (key, value) in attributes {
                let Some(allowed) = inner.supported.get(key) else {
                    continue;
                };
                if !allowed.contains(value) {
                    tracing::debug!(
                        printer = self.id(),
                        key,
                        value = %value,
                        "unsupported attribute value"
                    );
                    unsupported.insert(key.clone(), value.clone());
                    accepted.remove(key);
                }
            }
            update_attributes(&inner.defaults, &accepted)
        };

        let job = engine.add_job(self.object_path(), name, job_attributes);
        job.set_attribute(ATTR_USER, AttrValue::from(invocation.username()));
        tracing::debug!(
            printer = self.id(),
            job = %job.id(),
            user = invocation.username(),
            "job created"
        );

        self.inner.lock().jobs.push(job.clone());
        Ok((job.object_path().to_string(), unsupported))
    }

    /// First job in insertion order with `state == pending`, if any.
    pub fn get_next_job(&self) -> Option<Arc<Job>> {
        let inner = self.inner.lock();
        inner
            .jobs
            .iter()
            .find(|job| job.state() == JobState::Pending)
            .cloned()
    }

    pub fn jobs(&self) -> Vec<Arc<Job>> {
        self.inner.lock().jobs.clone()
    }

    /// Remove a job from this printer's list.
    pub(crate) fn take_job(&self, id: JobId) -> Option<Arc<Job>> {
        let mut inner = self.inner.lock();
        let index = inner.jobs.iter().position(|job| job.id() == id)?;
        Some(inner.jobs.remove(index))
    }

    pub(crate) fn set_state(&self, state: PrinterState) {
        let mut inner = self.inner.lock();
        if inner.state != state {
            tracing::debug!(printer = self.id(), from = %inner.state, to = %state, "printer state");
            inner.state = state;
        }
    }

    /// Observe a job state change: when the active job reaches a terminal
    /// state the printer returns to idle (only one job processes at a
    /// time).
    pub(crate) fn job_state_notify(&self, state: JobState) {
        if !state.is_terminal() {
            return;
        }
        let mut inner = self.inner.lock();
        if inner.state == PrinterState::Processing {
            tracing::debug!(printer = self.id(), "active job finished, printer idle");
            inner.state = PrinterState::Idle;
        }
    }

    pub(crate) fn add_state_reason(&self, reason: &str) {
        tracing::debug!(printer = self.id(), "state-reasons += {reason}");
        self.inner.lock().state_reasons.add(reason);
    }

    pub(crate) fn remove_state_reason(&self, reason: &str) {
        tracing::debug!(printer = self.id(), "state-reasons -= {reason}");
        self.inner.lock().state_reasons.remove(reason);
    }

    /// UpdateDefaults: right-biased merge into the existing defaults.
    pub fn update_defaults(
        &self,
        engine: &Engine,
        invocation: &Invocation,
        defaults: &Attributes,
    ) -> Result<(), MethodError> {
        engine.check_authorization(invocation, &[actions::ALL_EDIT, actions::PRINTER_MODIFY])?;
        let mut inner = self.inner.lock();
        for (key, value) in defaults {
            tracing::debug!(printer = self.id(), "defaults: set {key}={value}");
        }
        let merged = update_attributes(&inner.defaults, defaults);
        inner.defaults = merged;
        Ok(())
    }

    /// SetDeviceUris: replace the URI list; it must stay non-empty.
    pub fn set_device_uris(
        &self,
        engine: &Engine,
        invocation: &Invocation,
        device_uris: Vec<String>,
    ) -> Result<(), MethodError> {
        engine.check_authorization(invocation, &[actions::ALL_EDIT, actions::PRINTER_MODIFY])?;
        if device_uris.is_empty() {
            return Err(MethodError::InvalidArgument(
                "device URI list must be non-empty".into(),
            ));
        }
        self.inner.lock().device_uris = device_uris;
        Ok(())
    }

    /// UpdateDriver: dispatch to [`Printer::set_driver`] with the
    /// `driver-name` option.
    pub fn update_driver(
        &self,
        engine: &Engine,
        invocation: &Invocation,
    ) -> Result<(), MethodError> {
        engine.check_authorization(invocation, &[actions::ALL_EDIT, actions::PRINTER_MODIFY])?;
        let Some(driver) = invocation.option_str("driver-name") else {
            return Err(MethodError::Unimplemented(
                "UpdateDriver without driver-name specified".into(),
            ));
        };
        self.set_driver(Path::new(driver))
    }

    /// Load a driver descriptor and select the final content type: the
    /// lowest-cost filter entry wins, the first encountered on ties.
    pub fn set_driver(&self, driver: &Path) -> Result<(), MethodError> {
        let entries = ppd::read_filters(driver)
            .map_err(|error| MethodError::InvalidArgument(error.to_string()))?;
        for entry in &entries {
            tracing::debug!(
                printer = self.id(),
                "filter: {} (cost {})",
                entry.content_type,
                entry.cost
            );
        }
        let (content_type, filter) = ppd::select_filter(&entries);
        tracing::debug!(
            printer = self.id(),
            "set final content type to {content_type} (input to {filter})"
        );

        let mut inner = self.inner.lock();
        inner.driver = Some(driver.to_path_buf());
        inner.final_content_type = Some(content_type);
        inner.final_filter = Some(filter);
        Ok(())
    }

    pub fn final_content_type(&self) -> Option<String> {
        self.inner.lock().final_content_type.clone()
    }

    pub fn final_filter(&self) -> Option<String> {
        self.inner.lock().final_filter.clone()
    }

    pub fn driver(&self) -> Option<PathBuf> {
        self.inner.lock().driver.clone()
    }
}

#[cfg(test)]
#[path = "printer_tests.rs"]
mod tests;
