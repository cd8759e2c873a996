// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The control loop.
//!
//! A single task drains the event channel; handlers are synchronous, run
//! to completion and never block. Every state-machine transition and all
//! pipeline lifecycle work happens here, so events are applied in arrival
//! order and reason broadcasts reach the printer before the next pipeline
//! event is processed.

use crate::engine::Engine;
use crate::job::Job;
use crate::pipeline::{Pipeline, PipelineSpec};
use crate::printer::Printer;
use pd_core::{
    AttrValue, Event, JobId, JobState, MethodError, PrinterState, Stage, ATTR_DEVICE_URI,
    ATTR_USER, PROCESSING_TO_STOP_POINT,
};
use std::sync::Arc;
use tokio::sync::mpsc;

pub struct Runtime {
    engine: Arc<Engine>,
    events: mpsc::Receiver<Event>,
}

/// Exit code the way the original daemon reads it: the high byte of the
/// raw wait status, unconditionally. A signal-killed child therefore
/// folds to 0, which the cancel path relies on.
fn wexitstatus(raw: i32) -> i32 {
    (raw >> 8) & 0xff
}

impl Runtime {
    pub(crate) fn new(engine: Arc<Engine>, events: mpsc::Receiver<Event>) -> Self {
        Self { engine, events }
    }

    /// Drive the engine until every event sender is gone.
    pub async fn run(mut self) {
        while let Some(event) = self.events.recv().await {
            self.handle_event(event);
        }
        tracing::debug!("control loop drained");
    }

    fn handle_event(&self, event: Event) {
        tracing::trace!(?event, "handling event");
        match event {
            Event::JobQueued { job } => self.handle_job_queued(job),
            Event::CancelJob { job } => self.handle_cancel(job),
            Event::JobReasons { job, add, remove } => self.handle_reasons(job, &add, &remove),
            Event::ChildExited { job, stage, status } => {
                self.handle_child_exited(job, stage, status)
            }
            Event::PipelineError { job, error } => self.handle_pipeline_error(job, &error),
            Event::DeviceAdded {
                sysfs_path,
                ieee1284_id,
                uri,
                description,
            } => self.handle_device_added(&sysfs_path, &ieee1284_id, &uri, &description),
            Event::DeviceRemoved { sysfs_path } => self.handle_device_removed(&sysfs_path),
        }
    }

    fn handle_job_queued(&self, job: JobId) {
        let Some(job) = self.engine.job(job) else {
            return;
        };
        let Some(printer) = self.engine.printer_by_path(job.printer_path()) else {
            tracing::warn!(job = %job.id(), path = job.printer_path(), "incorrect printer path");
            return;
        };
        self.check_printer(&printer);
    }

    /// Start the printer's next pending job, if it is idle and attached.
    fn check_printer(&self, printer: &Arc<Printer>) {
        if printer.is_detached() || printer.state() != PrinterState::Idle {
            return;
        }
        let Some(job) = printer.get_next_job() else {
            return;
        };

        printer.set_state(PrinterState::Processing);
        job.set_state(JobState::Processing);
        if let Err(error) = self.start_processing(printer, &job) {
            tracing::warn!(job = %job.id(), %error, "failed to start job");
            self.finish_job(&job, JobState::Aborted);
        }
    }

    /// Fork the pipeline for a job that just entered `processing`.
    fn start_processing(&self, printer: &Printer, job: &Arc<Job>) -> Result<(), MethodError> {
        tracing::debug!(job = %job.id(), "starting to process job");

        let uri = printer.uri()?;
        tracing::debug!(job = %job.id(), uri = %uri, "using device URI");
        job.set_attribute(ATTR_DEVICE_URI, AttrValue::from(uri.clone()));

        let user = job
            .attribute_str(ATTR_USER)
            .unwrap_or_else(|| "unknown".to_string());
        let title = format!("job {}", job.id());
        let spool = job
            .spool_path()
            .ok_or_else(|| MethodError::Internal("processing job has no spool file".into()))?;

        let config = self.engine.config();
        let pipeline = Pipeline::start(
            &PipelineSpec {
                job: job.id(),
                uri: &uri,
                user: &user,
                title: &title,
                spool: &spool,
                backend_dir: &config.backend_dir,
                arranger: &config.arranger,
            },
            self.engine.events(),
        )?;
        job.set_pipeline(pipeline);
        Ok(())
    }

    fn handle_cancel(&self, job: JobId) {
        let Some(job) = self.engine.job(job) else {
            return;
        };
        match job.state() {
            state if state.is_terminal() => {}
            state if state.has_pipeline() => {
                // Two-phase: stop feeding data, then kill. The backend's
                // exit event completes the transition.
                job.stop_pipeline();
            }
            _ => self.finish_job(&job, JobState::Canceled),
        }
    }

    fn handle_reasons(&self, job: JobId, add: &[String], remove: &[String]) {
        let Some(job) = self.engine.job(job) else {
            return;
        };
        job.apply_reasons(add, remove);

        // Mirror onto the owning printer, unrefcounted: a tag set by two
        // jobs and cleared by one is gone.
        let Some(printer) = self.engine.printer_by_path(job.printer_path()) else {
            return;
        };
        for tag in add {
            printer.add_state_reason(tag);
        }
        for tag in remove {
            printer.remove_state_reason(tag);
        }
    }

    fn handle_child_exited(&self, job: JobId, stage: Stage, status: i32) {
        let Some(job) = self.engine.job(job) else {
            // Job already finished and was removed; late exits are fine.
            return;
        };
        let code = wexitstatus(status);
        match stage {
            Stage::Arranger => {
                tracing::debug!(job = %job.id(), code, "arranger finished");
                return;
            }
            Stage::Backend => {
                tracing::debug!(job = %job.id(), code, "backend finished");
            }
        }

        let next = if code == 0 {
            if job.state_reasons().contains(PROCESSING_TO_STOP_POINT) {
                JobState::Canceled
            } else {
                JobState::Completed
            }
        } else {
            JobState::Aborted
        };
        self.finish_job(&job, next);
    }

    fn handle_pipeline_error(&self, job: JobId, error: &str) {
        let Some(job) = self.engine.job(job) else {
            return;
        };
        if job.state().is_terminal() {
            return;
        }
        tracing::warn!(job = %job.id(), error, "pipeline failed, aborting job");
        job.stop_pipeline();
        self.finish_job(&job, JobState::Aborted);
    }

    /// Terminal transition plus cleanup: the printer observes the change,
    /// drops the job from its list, the engine forgets it, and the printer
    /// is re-checked for further pending work.
    fn finish_job(&self, job: &Arc<Job>, state: JobState) {
        if !job.finish(state) {
            return;
        }
        tracing::info!(job = %job.id(), state = %state, "job finished");

        if let Some(printer) = self.engine.printer_by_path(job.printer_path()) {
            printer.job_state_notify(state);
            printer.take_job(job.id());
            self.engine.remove_job(job.id());
            self.check_printer(&printer);
        } else {
            self.engine.remove_job(job.id());
        }
    }

    fn handle_device_added(
        &self,
        sysfs_path: &str,
        ieee1284_id: &str,
        uri: &str,
        description: &str,
    ) {
        tracing::debug!(uri, ieee1284_id, "add device");
        match self
            .engine
            .attach_device_printer(sysfs_path, description, uri)
        {
            Ok(printer) => {
                tracing::info!(printer = printer.id(), uri, "printer attached for device")
            }
            Err(error) => tracing::warn!(uri, %error, "failed to create printer for device"),
        }
    }

    fn handle_device_removed(&self, sysfs_path: &str) {
        tracing::debug!(sysfs_path, "remove device");
        self.engine.detach_device_printer(sysfs_path);
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
