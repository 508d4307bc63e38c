// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Process-tree termination.
//!
//! Workers are started as leaders of their own process group, so a single
//! signal to the group reaches every descendant that did not explicitly leave
//! it. Platforms without process groups plug in a different [`TerminateTree`].

use std::fmt;

use tokio::process::Command;

use crate::error::Result;

/// Capability to isolate a child at spawn time and later kill its whole tree.
pub trait TerminateTree: Send + Sync + fmt::Debug {
    /// Adjust the command before spawning so the tree can be addressed later.
    fn configure(&self, _command: &mut Command) {}

    /// Terminate `pid` and all of its descendants.
    ///
    /// Must succeed when the tree is already gone.
    fn terminate_tree(&self, pid: u32) -> Result<()>;
}

/// Default terminator: POSIX process groups, `taskkill /T` on Windows.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessGroupTerminator;

#[cfg(unix)]
impl TerminateTree for ProcessGroupTerminator {
    fn configure(&self, command: &mut Command) {
        // pgid = child pid
        command.process_group(0);
    }

    fn terminate_tree(&self, pid: u32) -> Result<()> {
        let pgid = match libc::pid_t::try_from(pid) {
            Ok(pgid) if pgid > 0 => pgid,
            // kill(0) / kill(-1) would hit our own group or every process.
            _ => return Ok(()),
        };

        // SAFETY: kill has no memory-safety preconditions; a negative pid
        // addresses the process group led by the worker.
        let rc = unsafe { libc::kill(-pgid, libc::SIGTERM) };
        if rc == 0 {
            return Ok(());
        }

        let err = std::io::Error::last_os_error();
        if is_already_gone(&err) {
            tracing::debug!("Process group {} already exited", pgid);
            return Ok(());
        }
        Err(crate::FuncrunError::Terminate { pid, source: err })
    }
}

#[cfg(unix)]
fn is_already_gone(err: &std::io::Error) -> bool {
    match err.raw_os_error() {
        Some(libc::ESRCH) => true,
        // macOS reports EPERM for a group made up only of zombies.
        #[cfg(target_os = "macos")]
        Some(libc::EPERM) => true,
        _ => false,
    }
}

#[cfg(windows)]
impl TerminateTree for ProcessGroupTerminator {
    fn configure(&self, command: &mut Command) {
        const CREATE_NEW_PROCESS_GROUP: u32 = 0x0000_0200;
        command.creation_flags(CREATE_NEW_PROCESS_GROUP);
    }

    fn terminate_tree(&self, pid: u32) -> Result<()> {
        let output = std::process::Command::new("taskkill")
            .args(["/PID", &pid.to_string(), "/T", "/F"])
            .output()
            .map_err(|source| crate::FuncrunError::Terminate { pid, source })?;
        if !output.status.success() {
            // taskkill fails when the process is gone; nothing left to stop.
            tracing::debug!(
                "taskkill for {} exited with {}: {}",
                pid,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }
}
