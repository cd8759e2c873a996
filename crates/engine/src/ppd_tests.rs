// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::io::Write;

fn ppd(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

#[test]
fn reads_cups_filter_entries() {
    let file = ppd(concat!(
        "*PPD-Adobe: \"4.3\"\n",
        "*cupsFilter: \"application/vnd.cups-raster 100 rastertolaser\"\n",
        "*cupsFilter: \"application/vnd.cups-postscript 50 pstolaser -m\"\n",
    ));

    let entries = read_filters(file.path()).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].content_type, "application/vnd.cups-raster");
    assert_eq!(entries[0].cost, 100);
    assert_eq!(entries[0].command, "rastertolaser");
    assert_eq!(entries[1].command, "pstolaser -m");
}

#[test]
fn malformed_entries_are_skipped() {
    let file = ppd(concat!(
        "*cupsFilter: \"only-two tokens\"\n",
        "*cupsFilter: \"mime notanumber prog\"\n",
        "*cupsFilter: \"application/pdf 10 pdftoraster\"\n",
    ));

    let entries = read_filters(file.path()).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].content_type, "application/pdf");
}

#[test]
fn lowest_cost_wins_first_on_ties() {
    let entries = vec![
        FilterEntry {
            content_type: "a".into(),
            cost: 50,
            command: "first".into(),
        },
        FilterEntry {
            content_type: "b".into(),
            cost: 100,
            command: "expensive".into(),
        },
        FilterEntry {
            content_type: "c".into(),
            cost: 50,
            command: "tied".into(),
        },
    ];

    let (content_type, command) = select_filter(&entries);
    assert_eq!(content_type, "a");
    assert_eq!(command, "first");
}

#[test]
fn no_entries_defaults_to_pdf() {
    let (content_type, command) = select_filter(&[]);
    assert_eq!(content_type, DEFAULT_CONTENT_TYPE);
    assert_eq!(command, "");
}

#[test]
fn missing_file_is_an_open_error() {
    let error = read_filters(Path::new("/nonexistent/driver.ppd")).unwrap_err();
    assert!(error.to_string().contains("unable to open PPD"));
}
