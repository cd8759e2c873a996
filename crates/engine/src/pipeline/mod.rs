// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The spool → arranger → backend data pipeline.
//!
//! Three stages: the spool file feeds the arranger's stdin, the arranger's
//! stdout feeds the backend's stdin. Each edge owns one fixed buffer that
//! is either filling (reading the producer) or draining (writing the
//! consumer), never both. Child stderr/stdout lines go through the message
//! parser; back-channel bytes are drained and discarded so the child never
//! stalls on a full pipe. Exit statuses are posted to the control loop,
//! which defers the terminal transition until the backend's arrives.

mod child;
mod stderr;

use pd_core::{Event, JobId, MethodError, Stage};
use std::io::ErrorKind;
use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Per-edge buffer size.
const EDGE_BUF: usize = 1024;

/// Everything the loop needs to assemble a pipeline for one job.
pub(crate) struct PipelineSpec<'a> {
    pub job: JobId,
    pub uri: &'a str,
    pub user: &'a str,
    pub title: &'a str,
    pub spool: &'a Path,
    pub backend_dir: &'a Path,
    pub arranger: &'a Path,
}

/// A running pipeline. Owned by its job while `state ∈ {processing,
/// processing-stopped}`; dropping it stops the data flow, and the
/// detached tasks wind down as the pipes reach EOF.
pub(crate) struct Pipeline {
    job: JobId,
    arranger_pid: u32,
    backend_pid: u32,
    data: CancellationToken,
    #[allow(dead_code)]
    tasks: Vec<JoinHandle<()>>,
}

impl Pipeline {
    /// Fork the backend and the arranger, open the spool file and arm all
    /// watches. On failure everything already spawned is released.
    pub(crate) fn start(
        spec: &PipelineSpec<'_>,
        events: mpsc::Sender<Event>,
    ) -> Result<Pipeline, MethodError> {
        let scheme = uri_scheme(spec.uri).ok_or_else(|| {
            MethodError::InvalidArgument(format!("no scheme in device URI {}", spec.uri))
        })?;
        let backend_program = spec.backend_dir.join(scheme);

        // Both children get the CUPS argv/env shape:
        //   argv: [argv0=uri, job-id, user, title, copies, options]
        let args = [
            spec.job.to_string(),
            spec.user.to_string(),
            spec.title.to_string(),
            "1".to_string(),
            String::new(),
        ];
        let env = [("DEVICE_URI".to_string(), spec.uri.to_string())];

        let backend = child::spawn(&backend_program, spec.uri, &args, &env)?;
        let arranger = match child::spawn(spec.arranger, spec.uri, &args, &env) {
            Ok(arranger) => arranger,
            Err(error) => {
                discard(backend);
                return Err(error);
            }
        };

        let spool = match std::fs::File::open(spec.spool) {
            Ok(file) => tokio::fs::File::from_std(file),
            Err(error) => {
                discard(backend);
                discard(arranger);
                return Err(error.into());
            }
        };

        let job = spec.job;
        let data = CancellationToken::new();
        let pipeline = Pipeline {
            job,
            arranger_pid: arranger.pid,
            backend_pid: backend.pid,
            data: data.clone(),
            tasks: vec![
                tokio::spawn(pump(
                    spool,
                    arranger.stdin,
                    data.clone(),
                    events.clone(),
                    job,
                    "spool->arranger",
                )),
                tokio::spawn(pump(
                    arranger.stdout,
                    backend.stdin,
                    data,
                    events.clone(),
                    job,
                    "arranger->backend",
                )),
                tokio::spawn(read_messages(
                    backend.stdout,
                    job,
                    "backend(stdout)",
                    events.clone(),
                )),
                tokio::spawn(read_messages(
                    arranger.stderr,
                    job,
                    "arranger(stderr)",
                    events.clone(),
                )),
                tokio::spawn(read_messages(
                    backend.stderr,
                    job,
                    "backend(stderr)",
                    events.clone(),
                )),
                tokio::spawn(drain(arranger.back)),
                tokio::spawn(drain(backend.back)),
                tokio::spawn(watch_exit(arranger.proc, job, Stage::Arranger, events.clone())),
                tokio::spawn(watch_exit(backend.proc, job, Stage::Backend, events)),
            ],
        };
        Ok(pipeline)
    }

    /// Stop feeding data: the pump tasks drop their writers, closing the
    /// arranger's and backend's stdin.
    pub(crate) fn stop_data(&self) {
        self.data.cancel();
    }

    /// SIGKILL the arranger, then the backend. Exit events still arrive
    /// and drive the job's terminal transition.
    pub(crate) fn kill_children(&self) {
        for (stage, pid) in [
            (Stage::Arranger, self.arranger_pid),
            (Stage::Backend, self.backend_pid),
        ] {
            tracing::debug!(job = %self.job, stage = %stage, pid, "killing pipeline child");
            if let Err(errno) = nix::sys::signal::kill(
                nix::unistd::Pid::from_raw(pid as i32),
                nix::sys::signal::Signal::SIGKILL,
            ) {
                tracing::debug!(job = %self.job, stage = %stage, pid, %errno, "kill failed");
            }
        }
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        self.data.cancel();
    }
}

/// Release a half-built pipeline child.
fn discard(child: child::Child) {
    let mut proc = child.proc;
    tokio::spawn(async move {
        let _ = proc.kill().await;
    });
}

/// Scheme of a device URI: the characters before `://`.
pub(crate) fn uri_scheme(uri: &str) -> Option<&str> {
    let (scheme, _) = uri.split_once("://")?;
    let valid = !scheme.is_empty()
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then_some(scheme)
}

/// Move bytes from a producer to a consumer through one fixed buffer.
///
/// The buffer fills from the producer, then drains completely to the
/// consumer before the next read. EOF (or cancellation) closes the
/// consumer. A broken pipe means the consumer exited and its wait status
/// carries the verdict; any other write error aborts the job.
async fn pump<R, W>(
    mut producer: R,
    mut consumer: W,
    stop: CancellationToken,
    events: mpsc::Sender<Event>,
    job: JobId,
    edge: &'static str,
) where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buffer = [0u8; EDGE_BUF];
    'fill: loop {
        let len = tokio::select! {
            biased;
            _ = stop.cancelled() => break 'fill,
            read = producer.read(&mut buffer) => match read {
                Ok(0) => { eprintln!("DEBUG pump {edge} EOF"); break 'fill },
                Ok(n) => n,
                Err(error) => {
                    eprintln!("DEBUG pump {edge} read err {error}");
                    tracing::debug!(job = %job, edge, %error, "pipeline read failed");
                    break 'fill;
                }
            },
        };
        eprintln!("DEBUG pump {edge} read {len} bytes");

        let mut sent = 0;
        while sent < len {
            let wrote = tokio::select! {
                biased;
                _ = stop.cancelled() => return,
                write = consumer.write(&buffer[sent..len]) => match write {
                    Ok(0) => return,
                    Ok(n) => n,
                    Err(error) if error.kind() == ErrorKind::BrokenPipe => {
                        tracing::debug!(job = %job, edge, "consumer closed the pipe");
                        return;
                    }
                    Err(error) => {
                        tracing::warn!(job = %job, edge, %error, "pipeline write failed");
                        let _ = events
                            .send(Event::PipelineError { job, error: error.to_string() })
                            .await;
                        return;
                    }
                },
            };
            sent += wrote;
        }
    }
    let _ = consumer.shutdown().await;
}

/// Log child output line by line and feed command lines to the parser.
async fn read_messages<R>(stream: R, job: JobId, source: &'static str, events: mpsc::Sender<Event>)
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let line = line.trim_end_matches('\r');
                tracing::debug!(job = %job, source, "{line}");
                match stderr::parse_command(line) {
                    Some(stderr::StderrCommand::State { add, remove }) => {
                        let _ = events.send(Event::JobReasons { job, add, remove }).await;
                    }
                    Some(stderr::StderrCommand::Unknown(prefix)) => {
                        tracing::debug!(job = %job, source, prefix, "unrecognized command prefix");
                    }
                    None => {}
                }
            }
            Ok(None) => break,
            Err(error) => {
                tracing::debug!(job = %job, source, %error, "message stream closed");
                break;
            }
        }
    }
}

/// Read and discard back-channel bytes until EOF.
async fn drain(mut back: tokio::fs::File) {
    let mut sink = [0u8; EDGE_BUF];
    loop {
        match back.read(&mut sink).await {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
    }
}

/// Deliver the child's exit status to the control loop.
async fn watch_exit(
    mut proc: tokio::process::Child,
    job: JobId,
    stage: Stage,
    events: mpsc::Sender<Event>,
) {
    use std::os::unix::process::ExitStatusExt;
    eprintln!("DEBUG watch_exit waiting for {stage:?} job {job}");
    let status = match proc.wait().await {
        Ok(status) => status,
        Err(error) => {
            tracing::warn!(job = %job, stage = %stage, %error, "wait on pipeline child failed");
            return;
        }
    };
    let raw = status.into_raw();
    tracing::debug!(job = %job, stage = %stage, raw, "pipeline child exited");
    let _ = events
        .send(Event::ChildExited {
            job,
            stage,
            status: raw,
        })
        .await;
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
