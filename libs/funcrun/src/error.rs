// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Error types for the Node.js runtime adapter.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by build tracking and worker supervision.
#[derive(Debug, Error)]
pub enum FuncrunError {
    /// Path resolution or configuration failure. Never retried.
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// Failed to parse a TOML configuration file.
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// No candidate source file exists for a handler specifier.
    #[error("handler '{handler}' not found under {}", .root.display())]
    HandlerNotFound { handler: String, root: PathBuf },

    /// A build manifest could not be interpreted.
    ///
    /// `BuildRegistry::should_rebuild` swallows this and answers `false`.
    #[error("invalid build manifest: {0}")]
    Manifest(String),

    /// The bundler reported errors; nothing was recorded.
    #[error("build failed for '{function_id}': {message}")]
    BuildFailed {
        function_id: String,
        message: String,
    },

    /// The worker process could not be started.
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The child started but one of its output pipes was not captured.
    #[error("worker {pid} started without a {pipe} pipe")]
    PipeUnavailable { pid: u32, pipe: &'static str },

    /// `logs()` was already called on this instance.
    #[error("log stream for worker '{0}' was already taken")]
    LogsTaken(String),

    /// Signalling the process tree failed for a reason other than the
    /// process being gone.
    #[error("failed to terminate process tree {pid}: {source}")]
    Terminate {
        pid: u32,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for runtime adapter operations.
pub type Result<T> = std::result::Result<T, FuncrunError>;
