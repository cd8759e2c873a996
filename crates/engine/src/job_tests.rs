// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::engine::{Engine, EngineConfig};
use std::io::{Seek, Write};
use std::sync::Arc;

fn setup() -> (Arc<Engine>, Arc<Job>, crate::runtime::Runtime) {
    let (engine, runtime) = Engine::new(EngineConfig::default());
    let printer = engine
        .add_printer("test", vec!["usb://Acme/Dots".into()])
        .unwrap();
    let invocation = Invocation::new("alice");
    let (path, _) = printer
        .create_job(&engine, &invocation, "doc", &Attributes::new())
        .unwrap();
    let job = engine.job_by_path(&path).unwrap();
    (engine, job, runtime)
}

fn document_fd(content: &[u8]) -> OwnedFd {
    let mut file = tempfile::tempfile().unwrap();
    file.write_all(content).unwrap();
    file.rewind().unwrap();
    OwnedFd::from(file)
}

#[test]
fn new_job_is_pending_held_and_incoming() {
    let (_engine, job, _runtime) = setup();
    assert_eq!(job.state(), JobState::PendingHeld);
    assert!(job.state_reasons().contains(JOB_INCOMING));
    assert!(job.spool_path().is_none());
}

#[test]
fn add_document_rejects_other_users() {
    let (_engine, job, _runtime) = setup();
    let error = job
        .add_document(&Invocation::new("mallory"), document_fd(b"x"))
        .unwrap_err();
    assert!(matches!(error, MethodError::PermissionDenied(_)));
}

#[test]
fn second_document_is_a_conflict() {
    let (_engine, job, _runtime) = setup();
    let invocation = Invocation::new("alice");
    job.add_document(&invocation, document_fd(b"x")).unwrap();
    let error = job
        .add_document(&invocation, document_fd(b"y"))
        .unwrap_err();
    assert!(matches!(error, MethodError::DocumentAlreadyAdded));
}

#[tokio::test]
async fn start_without_document_is_missing_document() {
    let (engine, job, _runtime) = setup();
    let error = job
        .start(&engine, &Invocation::new("alice"))
        .await
        .unwrap_err();
    assert!(matches!(error, MethodError::MissingDocument));
    assert_eq!(job.state(), JobState::PendingHeld);
}

#[tokio::test]
async fn start_spools_and_moves_to_pending() {
    let (engine, job, _runtime) = setup();
    let invocation = Invocation::new("alice");
    job.add_document(&invocation, document_fd(b"hello")).unwrap();
    job.start(&engine, &invocation).await.unwrap();

    assert_eq!(job.state(), JobState::Pending);
    assert!(!job.state_reasons().contains(JOB_INCOMING));
    let spool = job.spool_path().unwrap();
    assert_eq!(std::fs::read(&spool).unwrap(), b"hello");

    // The document fd was consumed: a second start has nothing to spool.
    let error = job.start(&engine, &invocation).await.unwrap_err();
    assert!(matches!(error, MethodError::MissingDocument));
}

#[tokio::test]
async fn cancel_of_terminal_job_fails() {
    let (engine, job, _runtime) = setup();
    assert!(job.finish(JobState::Canceled));
    let error = job
        .cancel(&engine, &Invocation::new("alice"))
        .await
        .unwrap_err();
    assert!(matches!(error, MethodError::AlreadyTerminal));
}

#[tokio::test]
async fn second_cancel_while_processing_is_already_canceling() {
    let (engine, job, _runtime) = setup();
    let invocation = Invocation::new("alice");
    job.set_state(JobState::Processing);

    job.cancel(&engine, &invocation).await.unwrap();
    assert!(job.state_reasons().contains(PROCESSING_TO_STOP_POINT));
    assert!(job.state_reasons().contains(CANCELED_BY_USER));

    let error = job.cancel(&engine, &invocation).await.unwrap_err();
    assert!(matches!(error, MethodError::AlreadyCanceling));
}

#[test]
fn apply_reasons_follows_arrival_order() {
    let (_engine, job, _runtime) = setup();
    job.apply_reasons(&["media-empty-error".into()], &[]);
    assert!(job.state_reasons().contains("media-empty-error"));

    // Removing an absent tag is silently ignored.
    job.apply_reasons(&[], &["cover-open".into(), "media-empty-error".into()]);
    assert!(!job.state_reasons().contains("media-empty-error"));
}

#[tokio::test]
async fn finish_releases_resources_and_is_a_sink() {
    let (engine, job, _runtime) = setup();
    let invocation = Invocation::new("alice");
    job.add_document(&invocation, document_fd(b"hello")).unwrap();
    job.start(&engine, &invocation).await.unwrap();
    let spool = job.spool_path().unwrap();
    assert!(spool.exists());

    assert!(job.finish(JobState::Completed));
    assert_eq!(job.state(), JobState::Completed);
    assert!(!spool.exists(), "spool file must be unlinked");
    assert!(job.spool_path().is_none());

    // Terminal states are sinks.
    assert!(!job.finish(JobState::Aborted));
    assert_eq!(job.state(), JobState::Completed);
    job.set_state(JobState::Pending);
    assert_eq!(job.state(), JobState::Completed);
}
