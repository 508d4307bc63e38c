// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Worker processes running a function handler under the Node.js bootstrap.
//!
//! A worker is spawned into its own process group and supervised by a task
//! that reaps it and, if the run's cancellation token fires first, terminates
//! the whole group. [`WorkerInstance::stop`] does the same thing on demand.
//! Readiness is never awaited here; the runtime-API emulator observes it.

mod command;
mod logs;
mod terminate;

use std::process::ExitStatus;
use std::sync::Arc;

use tokio::process::{ChildStderr, ChildStdout};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::config::RuntimeConfig;
use crate::error::{FuncrunError, Result};

pub use command::{RunRequest, WorkerCommand, SOURCE_MAPS_FLAG};
pub use logs::{merge, LogStream};
pub use terminate::{ProcessGroupTerminator, TerminateTree};

/// One running worker process.
#[derive(Debug)]
pub struct WorkerInstance {
    worker_id: String,
    pid: u32,
    stdout: Option<ChildStdout>,
    stderr: Option<ChildStderr>,
    exit: watch::Receiver<Option<ExitStatus>>,
    terminator: Arc<dyn TerminateTree>,
    log_capacity: usize,
}

impl WorkerInstance {
    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// OS process id, which is also the worker's process group id.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Signal the worker's entire process tree. Does not wait for exit.
    ///
    /// Safe to call any number of times, including after the worker exited.
    pub fn stop(&self) -> Result<()> {
        tracing::info!("[{}] Stopping worker (pid={})", self.worker_id, self.pid);
        self.terminator.terminate_tree(self.pid)
    }

    /// Take the combined stdout/stderr stream. Only the first call succeeds.
    pub fn logs(&mut self) -> Result<LogStream> {
        match (self.stdout.take(), self.stderr.take()) {
            (Some(stdout), Some(stderr)) => Ok(merge(stdout, stderr, self.log_capacity)),
            _ => Err(FuncrunError::LogsTaken(self.worker_id.clone())),
        }
    }

    /// Exit status if the worker has already been reaped.
    pub fn try_exit_status(&self) -> Option<ExitStatus> {
        *self.exit.borrow()
    }

    /// Wait until the worker exits.
    pub async fn wait(&self) -> Result<ExitStatus> {
        let mut exit = self.exit.clone();
        let status = *exit.wait_for(Option::is_some).await.map_err(|_| {
            FuncrunError::Io(std::io::Error::other(format!(
                "worker '{}' exit status unavailable",
                self.worker_id
            )))
        })?;
        status.ok_or_else(|| {
            FuncrunError::Io(std::io::Error::other("worker exit status missing"))
        })
    }
}

/// Spawn a worker for `request`.
///
/// Spawn and pipe-capture failures are returned as errors; no half-started
/// instance is ever handed back. Must be called within a Tokio runtime: the
/// supervisor runs as a spawned task.
pub fn spawn_worker(
    config: &RuntimeConfig,
    terminator: Arc<dyn TerminateTree>,
    cancel: CancellationToken,
    request: &RunRequest,
) -> Result<WorkerInstance> {
    let worker_command = WorkerCommand::new(config, request)?;
    let mut command = worker_command.to_command();
    terminator.configure(&mut command);

    tracing::info!(
        "[{}] Starting worker: program='{}', args={:?}, cwd='{}'",
        request.worker_id,
        worker_command.program(),
        worker_command.args(),
        worker_command.current_dir().display()
    );
    tracing::debug!(
        "[{}] Worker environment keys: {:?}",
        request.worker_id,
        worker_command.env().keys().collect::<Vec<_>>()
    );

    let mut child = command.spawn().map_err(|source| FuncrunError::Spawn {
        program: worker_command.program().to_string(),
        source,
    })?;

    let pid = child.id().ok_or_else(|| FuncrunError::Spawn {
        program: worker_command.program().to_string(),
        source: std::io::Error::other("child exited before its pid was read"),
    })?;

    let (stdout, stderr) = take_pipes(
        child.stdout.take(),
        child.stderr.take(),
        pid,
        terminator.as_ref(),
        &request.worker_id,
    )?;

    tracing::info!("[{}] Worker spawned: pid={}", request.worker_id, pid);

    let (exit_tx, exit_rx) = watch::channel(None);
    let supervisor_terminator = Arc::clone(&terminator);
    let worker_id = request.worker_id.clone();
    tokio::spawn(async move {
        let status = tokio::select! {
            status = child.wait() => status,
            _ = cancel.cancelled() => {
                tracing::info!("[{}] Run cancelled, terminating worker tree", worker_id);
                if let Err(e) = supervisor_terminator.terminate_tree(pid) {
                    tracing::warn!("[{}] Failed to terminate worker: {}", worker_id, e);
                }
                child.wait().await
            }
        };

        match status {
            Ok(status) => {
                tracing::info!("[{}] Worker exited: {}", worker_id, status);
                let _ = exit_tx.send(Some(status));
            }
            Err(e) => tracing::warn!("[{}] Failed to wait for worker: {}", worker_id, e),
        }
    });

    Ok(WorkerInstance {
        worker_id: request.worker_id.clone(),
        pid,
        stdout: Some(stdout),
        stderr: Some(stderr),
        exit: exit_rx,
        terminator,
        log_capacity: config.log_channel_capacity,
    })
}

/// Both pipes, or the tree is terminated and the missing pipe reported.
fn take_pipes<O, E>(
    stdout: Option<O>,
    stderr: Option<E>,
    pid: u32,
    terminator: &dyn TerminateTree,
    worker_id: &str,
) -> Result<(O, E)> {
    match (stdout, stderr) {
        (Some(stdout), Some(stderr)) => Ok((stdout, stderr)),
        (stdout, _) => {
            let pipe = if stdout.is_none() { "stdout" } else { "stderr" };
            tracing::error!("[{}] Worker {} not captured (pid={})", worker_id, pipe, pid);
            if let Err(e) = terminator.terminate_tree(pid) {
                tracing::warn!("[{}] Failed to clean up worker: {}", worker_id, e);
            }
            Err(FuncrunError::PipeUnavailable { pid, pipe })
        }
    }
}
