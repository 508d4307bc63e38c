// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Worker command line and environment construction.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;

use crate::config::RuntimeConfig;
use crate::error::Result;
use crate::registry::Artifact;

/// Flag passed to the interpreter ahead of the bootstrap script.
pub const SOURCE_MAPS_FLAG: &str = "--enable-source-maps";

/// One request to start a worker.
#[derive(Debug, Clone, Default)]
pub struct RunRequest {
    /// Bundle output directory, used as the worker's cwd.
    pub out_dir: PathBuf,
    /// Entry file inside `out_dir`.
    pub handler: String,
    pub worker_id: String,
    /// Base environment. The host environment is not inherited.
    pub env: Vec<(String, String)>,
    /// Runtime-API address the worker polls for invocations.
    pub server: String,
}

impl RunRequest {
    pub fn for_artifact(
        artifact: &Artifact,
        worker_id: impl Into<String>,
        server: impl Into<String>,
    ) -> Self {
        Self {
            out_dir: artifact.out_dir.clone(),
            handler: artifact.handler.clone(),
            worker_id: worker_id.into(),
            env: Vec::new(),
            server: server.into(),
        }
    }

    pub fn with_env<I, K, V>(mut self, env: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(env.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }
}

/// Fully resolved worker invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerCommand {
    program: String,
    args: Vec<OsString>,
    env: BTreeMap<String, String>,
    current_dir: PathBuf,
}

impl WorkerCommand {
    /// Resolve against the live host environment.
    pub fn new(config: &RuntimeConfig, request: &RunRequest) -> Result<Self> {
        Self::with_host_env(config, request, |key| std::env::var(key).ok())
    }

    /// Resolve with an explicit host-variable lookup.
    ///
    /// Layering, later wins: request env, passthrough host variables, endpoint.
    pub fn with_host_env<F>(config: &RuntimeConfig, request: &RunRequest, host: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bootstrap = config.bootstrap_path()?;
        let entry = request.out_dir.join(&request.handler);

        let args = vec![
            OsString::from(SOURCE_MAPS_FLAG),
            bootstrap.into_os_string(),
            entry.into_os_string(),
            OsString::from(&request.worker_id),
        ];

        let mut env: BTreeMap<String, String> = request.env.iter().cloned().collect();
        for key in &config.passthrough_env {
            if let Some(value) = host(key) {
                env.insert(key.clone(), value);
            }
        }
        env.insert(config.endpoint_env.clone(), request.server.clone());

        Ok(Self {
            program: config.interpreter.clone(),
            args,
            env,
            current_dir: request.out_dir.clone(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments after the program name.
    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn current_dir(&self) -> &PathBuf {
        &self.current_dir
    }

    /// Tokio command with piped stdout/stderr and a null stdin.
    pub(crate) fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .env_clear()
            .envs(&self.env)
            .current_dir(&self.current_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        command
    }
}
