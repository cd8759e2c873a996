// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Document spool files.
//!
//! Spool files are created as `printerd-spool-XXXXXX` in the system temp
//! dir (0600), and unlinked when the owning job drops the returned path.

use pd_core::MethodError;
use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::os::fd::OwnedFd;
use std::path::Path;
use tempfile::TempPath;

pub const SPOOL_PREFIX: &str = "printerd-spool-";

/// Copy the whole document fd into a fresh spool file.
///
/// Plain read/write loop with `EINTR` retry; runs on a blocking worker.
pub(crate) fn spool_document(
    document: OwnedFd,
    spool_dir: Option<&Path>,
) -> Result<TempPath, MethodError> {
    let mut builder = tempfile::Builder::new();
    builder.prefix(SPOOL_PREFIX);
    let mut spool = match spool_dir {
        Some(dir) => builder.tempfile_in(dir),
        None => builder.tempfile(),
    }?;

    let mut document = File::from(document);
    let mut buffer = [0u8; 1024];
    loop {
        let got = match document.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(error) if error.kind() == ErrorKind::Interrupted => continue,
            Err(error) => return Err(error.into()),
        };
        let mut rest = &buffer[..got];
        while !rest.is_empty() {
            match spool.write(rest) {
                Ok(wrote) => rest = &rest[wrote..],
                Err(error) if error.kind() == ErrorKind::Interrupted => continue,
                Err(error) => return Err(error.into()),
            }
        }
    }
    spool.flush()?;
    Ok(spool.into_temp_path())
}

#[cfg(test)]
#[path = "spool_tests.rs"]
mod tests;
