// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The engine: printers keyed by id, jobs keyed by id, device bridging.
//!
//! Back-edges between objects are resolved by object-path lookup here
//! rather than stored references; nothing in the engine keeps a job alive
//! past its terminal cleanup.

use crate::job::Job;
use crate::printer::Printer;
use crate::runtime::Runtime;
use pd_core::{
    canonicalize_id, paths, Attributes, AuthorizationChecker, AllowAll, Event, Invocation, JobId,
    MethodError,
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Capacity of the control-loop event channel.
const EVENT_QUEUE: usize = 256;

/// Paths the engine resolves external programs and spool files against.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Directory holding scheme-named device backends.
    pub backend_dir: PathBuf,
    /// The content-arranging filter run ahead of the backend.
    pub arranger: PathBuf,
    /// Spool directory; `None` uses the system temp dir.
    pub spool_dir: Option<PathBuf>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            backend_dir: PathBuf::from("/usr/lib/cups/backend"),
            arranger: PathBuf::from("/usr/lib/cups/filter/pstops"),
            spool_dir: None,
        }
    }
}

/// Owner of all printers and jobs.
pub struct Engine {
    config: EngineConfig,
    authorizer: Box<dyn AuthorizationChecker>,
    printers: Mutex<HashMap<String, Arc<Printer>>>,
    jobs: Mutex<HashMap<JobId, Arc<Job>>>,
    /// sysfs path → printer id, for routing device-removal events.
    devices: Mutex<HashMap<String, String>>,
    next_job_id: AtomicU32,
    events: mpsc::Sender<Event>,
}

impl Engine {
    /// Create an engine and the control loop that drives it.
    pub fn new(config: EngineConfig) -> (Arc<Engine>, Runtime) {
        Self::with_authorizer(config, Box::new(AllowAll))
    }

    pub fn with_authorizer(
        config: EngineConfig,
        authorizer: Box<dyn AuthorizationChecker>,
    ) -> (Arc<Engine>, Runtime) {
        let (tx, rx) = mpsc::channel(EVENT_QUEUE);
        let engine = Arc::new(Engine {
            config,
            authorizer,
            printers: Mutex::new(HashMap::new()),
            jobs: Mutex::new(HashMap::new()),
            devices: Mutex::new(HashMap::new()),
            next_job_id: AtomicU32::new(1),
            events: tx,
        });
        let runtime = Runtime::new(engine.clone(), rx);
        (engine, runtime)
    }

    pub(crate) fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Sender half of the control-loop event channel.
    pub fn events(&self) -> mpsc::Sender<Event> {
        self.events.clone()
    }

    pub(crate) fn check_authorization(
        &self,
        invocation: &Invocation,
        action_ids: &[&str],
    ) -> Result<(), MethodError> {
        if self.authorizer.check(invocation, action_ids) {
            Ok(())
        } else {
            Err(MethodError::PermissionDenied(format!(
                "{} is not authorized for {}",
                invocation.username(),
                action_ids.join(", ")
            )))
        }
    }

    /// Create a printer. The id is derived from the name; ids must be
    /// unique and the device URI list non-empty.
    pub fn add_printer(
        &self,
        name: &str,
        device_uris: Vec<String>,
    ) -> Result<Arc<Printer>, MethodError> {
        if device_uris.is_empty() {
            return Err(MethodError::InvalidArgument(
                "device URI list must be non-empty".into(),
            ));
        }
        let printer = Arc::new(Printer::new(name, device_uris));
        let mut printers = self.printers.lock();
        if printers.contains_key(printer.id()) {
            return Err(MethodError::InvalidArgument(format!(
                "printer {} already exists",
                printer.id()
            )));
        }
        tracing::info!(printer = printer.id(), "printer added");
        printers.insert(printer.id().to_string(), printer.clone());
        Ok(printer)
    }

    pub fn remove_printer(&self, id: &str) -> Option<Arc<Printer>> {
        self.printers.lock().remove(id)
    }

    pub fn printer(&self, id: &str) -> Option<Arc<Printer>> {
        self.printers.lock().get(id).cloned()
    }

    pub fn printers(&self) -> Vec<Arc<Printer>> {
        self.printers.lock().values().cloned().collect()
    }

    /// Resolve `/org/freedesktop/printerd/printer/<id>`.
    pub fn printer_by_path(&self, path: &str) -> Option<Arc<Printer>> {
        self.printer(paths::printer_id_from_path(path)?)
    }

    pub fn job(&self, id: JobId) -> Option<Arc<Job>> {
        self.jobs.lock().get(&id).cloned()
    }

    /// Resolve `/org/freedesktop/printerd/job/<u>`.
    pub fn job_by_path(&self, path: &str) -> Option<Arc<Job>> {
        self.job(paths::job_id_from_path(path)?)
    }

    /// Allocate a job bound to the given printer path. The printer inserts
    /// it into its own list.
    pub(crate) fn add_job(
        &self,
        printer_path: &str,
        name: &str,
        attributes: Attributes,
    ) -> Arc<Job> {
        let id = JobId::new(self.next_job_id.fetch_add(1, Ordering::Relaxed));
        let job = Job::new(id, printer_path, name, attributes, self.events.clone());
        self.jobs.lock().insert(id, job.clone());
        job
    }

    /// Drop a job from the global map once its printer has observed the
    /// terminal transition.
    pub(crate) fn remove_job(&self, id: JobId) -> Option<Arc<Job>> {
        self.jobs.lock().remove(&id)
    }

    /// Bridge for a device-added event: create the printer, or reattach an
    /// existing one after a replug.
    pub(crate) fn attach_device_printer(
        &self,
        sysfs_path: &str,
        description: &str,
        uri: &str,
    ) -> Result<Arc<Printer>, MethodError> {
        let id = canonicalize_id(description);
        let printer = match self.printer(&id) {
            Some(existing) => {
                existing.reattach(vec![uri.to_string()]);
                existing
            }
            None => self.add_printer(description, vec![uri.to_string()])?,
        };
        self.devices
            .lock()
            .insert(sysfs_path.to_string(), printer.id().to_string());
        Ok(printer)
    }

    /// Bridge for a device-removed event: mark the printer detached but
    /// keep it, in case jobs are in flight.
    pub(crate) fn detach_device_printer(&self, sysfs_path: &str) -> Option<Arc<Printer>> {
        let id = self.devices.lock().remove(sysfs_path)?;
        let printer = self.printer(&id)?;
        printer.set_detached(true);
        Some(printer)
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
