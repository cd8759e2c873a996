// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::engine::EngineConfig;
use pd_core::{AuthorizationChecker, PrinterState};
use std::io::Write;

fn attrs(pairs: &[(&str, &str)]) -> Attributes {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), AttrValue::from(*v)))
        .collect()
}

fn setup() -> (Arc<Engine>, Arc<Printer>, crate::runtime::Runtime) {
    let (engine, runtime) = Engine::new(EngineConfig::default());
    let printer = engine
        .add_printer("test", vec!["usb://Acme/Dots".into()])
        .unwrap();
    (engine, printer, runtime)
}

#[test]
fn new_printer_has_template_defaults() {
    let (_engine, printer, _runtime) = setup();
    let defaults = printer.defaults();
    assert_eq!(defaults.get(ATTR_MEDIA), Some(&AttrValue::from("iso-a4")));
    assert_eq!(
        defaults.get(ATTR_DOCUMENT_FORMAT),
        Some(&AttrValue::from("application/octet-stream"))
    );
    assert_eq!(printer.state(), PrinterState::Idle);
    assert!(printer.state_reasons().is_empty());
}

#[test]
fn create_job_merges_defaults_with_request() {
    let (engine, printer, _runtime) = setup();
    let invocation = Invocation::new("alice");

    let (path, unsupported) = printer
        .create_job(&engine, &invocation, "j", &attrs(&[("media", "na-letter")]))
        .unwrap();
    assert!(unsupported.is_empty());

    let job = engine.job_by_path(&path).unwrap();
    let job_attrs = job.attributes();
    assert_eq!(job_attrs.get(ATTR_MEDIA), Some(&AttrValue::from("na-letter")));
    assert_eq!(
        job_attrs.get(ATTR_DOCUMENT_FORMAT),
        Some(&AttrValue::from("application/octet-stream"))
    );
    assert_eq!(job_attrs.get(ATTR_USER), Some(&AttrValue::from("alice")));
    assert_eq!(job.printer_path(), printer.object_path());
}

#[test]
fn unsupported_values_are_stripped_and_reported() {
    let (engine, printer, _runtime) = setup();
    let invocation = Invocation::new("alice");

    let (path, unsupported) = printer
        .create_job(&engine, &invocation, "j", &attrs(&[("media", "iso-a3")]))
        .unwrap();

    assert_eq!(unsupported, attrs(&[("media", "iso-a3")]));
    // The job still exists, with the default for the rejected key.
    let job = engine.job_by_path(&path).unwrap();
    assert_eq!(
        job.attributes().get(ATTR_MEDIA),
        Some(&AttrValue::from("iso-a4"))
    );
}

#[test]
fn unknown_keys_pass_through_unchecked() {
    let (engine, printer, _runtime) = setup();
    let invocation = Invocation::new("alice");

    let (path, unsupported) = printer
        .create_job(&engine, &invocation, "j", &attrs(&[("finishing", "staple")]))
        .unwrap();
    assert!(unsupported.is_empty());
    let job = engine.job_by_path(&path).unwrap();
    assert_eq!(
        job.attributes().get("finishing"),
        Some(&AttrValue::from("staple"))
    );
}

#[test]
fn next_job_selection_is_insertion_ordered() {
    let (engine, printer, _runtime) = setup();
    let invocation = Invocation::new("alice");

    let (first, _) = printer
        .create_job(&engine, &invocation, "first", &Attributes::new())
        .unwrap();
    let (second, _) = printer
        .create_job(&engine, &invocation, "second", &Attributes::new())
        .unwrap();

    // Nothing is pending yet: both jobs are pending-held.
    assert!(printer.get_next_job().is_none());

    engine.job_by_path(&second).unwrap().set_state(JobState::Pending);
    engine.job_by_path(&first).unwrap().set_state(JobState::Pending);

    // Arrival order wins, not the order the jobs became pending.
    let next = printer.get_next_job().unwrap();
    assert_eq!(next.object_path(), first);
}

#[test]
fn job_state_notify_returns_processing_printer_to_idle() {
    let (_engine, printer, _runtime) = setup();
    printer.set_state(PrinterState::Processing);

    printer.job_state_notify(JobState::Processing);
    assert_eq!(printer.state(), PrinterState::Processing);

    printer.job_state_notify(JobState::Completed);
    assert_eq!(printer.state(), PrinterState::Idle);

    // Idle printers are left alone.
    printer.job_state_notify(JobState::Canceled);
    assert_eq!(printer.state(), PrinterState::Idle);
}

#[test]
fn update_defaults_is_right_biased() {
    let (engine, printer, _runtime) = setup();
    let invocation = Invocation::new("root");

    printer
        .update_defaults(&engine, &invocation, &attrs(&[("media", "na-letter"), ("sides", "two-sided")]))
        .unwrap();

    let defaults = printer.defaults();
    assert_eq!(defaults.get(ATTR_MEDIA), Some(&AttrValue::from("na-letter")));
    assert_eq!(defaults.get("sides"), Some(&AttrValue::from("two-sided")));
    assert_eq!(
        defaults.get(ATTR_DOCUMENT_FORMAT),
        Some(&AttrValue::from("application/octet-stream"))
    );
}

#[test]
fn set_device_uris_requires_a_non_empty_list() {
    let (engine, printer, _runtime) = setup();
    let invocation = Invocation::new("root");

    let error = printer
        .set_device_uris(&engine, &invocation, Vec::new())
        .unwrap_err();
    assert!(matches!(error, MethodError::InvalidArgument(_)));

    printer
        .set_device_uris(&engine, &invocation, vec!["ipp://h/p".into(), "usb://a/b".into()])
        .unwrap();
    assert_eq!(printer.uri().unwrap(), "ipp://h/p");
}

#[test]
fn update_driver_without_driver_name_is_unimplemented() {
    let (engine, printer, _runtime) = setup();
    let invocation = Invocation::new("root");
    let error = printer.update_driver(&engine, &invocation).unwrap_err();
    assert!(matches!(error, MethodError::Unimplemented(_)));
}

#[test]
fn set_driver_selects_the_cheapest_filter() {
    let (engine, printer, _runtime) = setup();
    assert_eq!(printer.final_content_type(), None);
    assert_eq!(printer.final_filter(), None);

    let mut ppd = tempfile::NamedTempFile::new().unwrap();
    writeln!(ppd, "*cupsFilter: \"application/vnd.cups-raster 100 rastertodots\"").unwrap();
    writeln!(ppd, "*cupsFilter: \"application/vnd.cups-postscript 20 pstodots\"").unwrap();
    ppd.flush().unwrap();

    let invocation = Invocation::new("root").with_option(
        "driver-name",
        ppd.path().display().to_string(),
    );
    printer.update_driver(&engine, &invocation).unwrap();

    assert_eq!(
        printer.final_content_type().as_deref(),
        Some("application/vnd.cups-postscript")
    );
    assert_eq!(printer.final_filter().as_deref(), Some("pstodots"));
    assert_eq!(printer.driver(), Some(ppd.path().to_path_buf()));
}

#[test]
fn set_driver_without_filters_defaults_to_pdf() {
    let (_engine, printer, _runtime) = setup();
    let ppd = tempfile::NamedTempFile::new().unwrap();
    printer.set_driver(ppd.path()).unwrap();
    assert_eq!(
        printer.final_content_type().as_deref(),
        Some(crate::ppd::DEFAULT_CONTENT_TYPE)
    );
    assert_eq!(printer.final_filter().as_deref(), Some(""));
}

struct DenyAll;

impl AuthorizationChecker for DenyAll {
    fn check(&self, _invocation: &Invocation, _action_ids: &[&str]) -> bool {
        false
    }
}

#[test]
fn unauthorized_callers_are_refused() {
    let (engine, _runtime) = Engine::with_authorizer(EngineConfig::default(), Box::new(DenyAll));
    let printer = engine.add_printer("test", vec!["usb://a/b".into()]).unwrap();
    let invocation = Invocation::new("mallory");

    let error = printer
        .create_job(&engine, &invocation, "j", &Attributes::new())
        .unwrap_err();
    assert!(matches!(error, MethodError::PermissionDenied(_)));

    let error = printer
        .update_defaults(&engine, &invocation, &Attributes::new())
        .unwrap_err();
    assert!(matches!(error, MethodError::PermissionDenied(_)));
}
