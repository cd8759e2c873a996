// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline child processes with the five-fd layout.
//!
//! At exec time the child sees 0=stdin, 1=stdout, 2=stderr, 3=back-channel
//! write end; fd 4 is the side-channel, reserved and left unopened. The
//! exec'd file is `program` while the child's `argv[0]` is caller-chosen
//! (the CUPS filter/backend convention).

use nix::fcntl::OFlag;
use pd_core::MethodError;
use std::os::fd::AsRawFd;
use std::os::unix::process::CommandExt;
use std::path::Path;
use std::process::Stdio;
use tokio::process::{ChildStderr, ChildStdin, ChildStdout};

/// Fd the back-channel write end is dup'd onto in the child.
const BACKCHANNEL_FD: i32 = 3;

pub(crate) struct Child {
    pub pid: u32,
    pub stdin: ChildStdin,
    pub stdout: ChildStdout,
    pub stderr: ChildStderr,
    /// Parent (read) end of the child's fd-3 back-channel.
    pub back: tokio::fs::File,
    pub proc: tokio::process::Child,
}

/// Spawn `program` with `argv0` as the child's `argv[0]`, the remaining
/// argument vector and exactly the given environment.
///
/// Fails with `SpawnFailed` before any fds are handed out; partial success
/// is not observable.
// The dup onto fd 3 has to happen between fork and exec, which needs the
// unsafe `pre_exec` hook; only async-signal-safe libc calls run there.
#[allow(unsafe_code)]
pub(crate) fn spawn(
    program: &Path,
    argv0: &str,
    args: &[String],
    env: &[(String, String)],
) -> Result<Child, MethodError> {
    let spawn_failed = |source: std::io::Error| MethodError::SpawnFailed {
        command: program.display().to_string(),
        source,
    };

    let (back_read, back_write) =
        nix::unistd::pipe2(OFlag::O_CLOEXEC).map_err(|errno| spawn_failed(errno.into()))?;

    tracing::debug!(program = %program.display(), "executing");
    for (key, value) in env {
        tracing::debug!("  env: {key}={value}");
    }
    tracing::debug!("  arg0: {argv0}");
    for arg in args {
        tracing::debug!("  arg: {arg}");
    }

    let mut command = std::process::Command::new(program);
    command
        .arg0(argv0)
        .args(args)
        .env_clear()
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    for (key, value) in env {
        command.env(key, value);
    }

    let raw_back = back_write.as_raw_fd();
    // O_CLOEXEC keeps both pipe ends out of unrelated children; the dup2
    // clears it on the fd the exec'd image keeps. When the write end
    // already landed on fd 3 the flag is cleared in place instead.
    unsafe {
        command.pre_exec(move || {
            if raw_back == BACKCHANNEL_FD {
                if libc::fcntl(BACKCHANNEL_FD, libc::F_SETFD, 0) < 0 {
                    return Err(std::io::Error::last_os_error());
                }
            } else if libc::dup2(raw_back, BACKCHANNEL_FD) < 0 {
                return Err(std::io::Error::last_os_error());
            }
            Ok(())
        });
    }

    let mut command = tokio::process::Command::from(command);
    command.kill_on_drop(true);
    let mut proc = command.spawn().map_err(spawn_failed)?;
    drop(back_write);

    let missing = || MethodError::Internal("spawned child is missing a stdio pipe".into());
    let pid = proc.id().ok_or_else(missing)?;
    let stdin = proc.stdin.take().ok_or_else(missing)?;
    let stdout = proc.stdout.take().ok_or_else(missing)?;
    let stderr = proc.stderr.take().ok_or_else(missing)?;
    let back = tokio::fs::File::from_std(std::fs::File::from(back_read));

    Ok(Child {
        pid,
        stdin,
        stdout,
        stderr,
        back,
        proc,
    })
}
