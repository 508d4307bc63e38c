// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Runtime adapter configuration.
//!
//! Loaded from TOML (see [`RuntimeConfig::default_path`]) with built-in
//! defaults for every field, then optionally overridden from the environment.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{FuncrunError, Result};

/// Bootstrap script location, relative to the platform directory.
pub const DEFAULT_BOOTSTRAP: &str = "dist/nodejs-runtime/index.js";

/// Variable through which the worker learns the runtime-API address.
pub const DEFAULT_ENDPOINT_ENV: &str = "AWS_LAMBDA_RUNTIME_API";

/// Overrides [`RuntimeConfig::interpreter`].
pub const INTERPRETER_ENV: &str = "FUNCRUN_INTERPRETER";

/// Overrides [`RuntimeConfig::platform_dir`].
pub const PLATFORM_DIR_ENV: &str = "FUNCRUN_PLATFORM_DIR";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Interpreter binary used to launch workers.
    pub interpreter: String,

    /// Directory holding the prebuilt worker bootstrap.
    pub platform_dir: Option<PathBuf>,

    /// Bootstrap entry point, relative to `platform_dir`.
    pub bootstrap: PathBuf,

    /// Project root that handler specifiers are resolved against.
    pub root_dir: PathBuf,

    /// Runtime identifier prefix owned by this adapter.
    pub runtime_prefix: String,

    /// Host variables copied into every worker environment when set.
    pub passthrough_env: Vec<String>,

    /// Name of the variable carrying the runtime-API address.
    pub endpoint_env: String,

    /// Chunks buffered between the pipe drains and the merged log reader.
    pub log_channel_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            interpreter: "node".to_string(),
            platform_dir: None,
            bootstrap: PathBuf::from(DEFAULT_BOOTSTRAP),
            root_dir: PathBuf::from("."),
            runtime_prefix: "node".to_string(),
            passthrough_env: vec![
                "NODE_OPTIONS".to_string(),
                "VSCODE_INSPECTOR_OPTIONS".to_string(),
            ],
            endpoint_env: DEFAULT_ENDPOINT_ENV.to_string(),
            log_channel_capacity: 64,
        }
    }
}

impl RuntimeConfig {
    /// Default config file location (`<config dir>/funcrun/config.toml`).
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("funcrun").join("config.toml"))
    }

    /// Parse a config from TOML text. Missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a config file from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            FuncrunError::Configuration(format!(
                "failed to read config '{}': {}",
                path.display(),
                e
            ))
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!("Loaded runtime config from {}", path.display());
        Ok(config)
    }

    /// Load from `path` if given, else from [`Self::default_path`] if that
    /// file exists, else use defaults. Environment overrides apply last.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load(path)?,
            None => match Self::default_path().filter(|p| p.exists()) {
                Some(default) => Self::load(&default)?,
                None => Self::default(),
            },
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `FUNCRUN_INTERPRETER` / `FUNCRUN_PLATFORM_DIR` if present.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(interpreter) = std::env::var(INTERPRETER_ENV) {
            if !interpreter.is_empty() {
                self.interpreter = interpreter;
            }
        }
        if let Ok(dir) = std::env::var(PLATFORM_DIR_ENV) {
            if !dir.is_empty() {
                self.platform_dir = Some(PathBuf::from(dir));
            }
        }
    }

    /// Absolute-or-relative path of the worker bootstrap script.
    pub fn bootstrap_path(&self) -> Result<PathBuf> {
        let platform_dir = self.platform_dir.as_ref().ok_or_else(|| {
            FuncrunError::Configuration(format!(
                "platform directory not configured (set platform_dir or {})",
                PLATFORM_DIR_ENV
            ))
        })?;
        Ok(platform_dir.join(&self.bootstrap))
    }

    fn validate(&self) -> Result<()> {
        if self.interpreter.trim().is_empty() {
            return Err(FuncrunError::Configuration(
                "interpreter must not be empty".into(),
            ));
        }
        if self.endpoint_env.trim().is_empty() {
            return Err(FuncrunError::Configuration(
                "endpoint_env must not be empty".into(),
            ));
        }
        if self.log_channel_capacity == 0 {
            return Err(FuncrunError::Configuration(
                "log_channel_capacity must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::default();
        assert_eq!(config.interpreter, "node");
        assert_eq!(config.endpoint_env, "AWS_LAMBDA_RUNTIME_API");
        assert_eq!(
            config.passthrough_env,
            vec!["NODE_OPTIONS", "VSCODE_INSPECTOR_OPTIONS"]
        );
        assert!(config.platform_dir.is_none());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RuntimeConfig::from_toml_str(
            r#"
            interpreter = "/opt/node20/bin/node"
            platform_dir = "/work/.sst/platform"
            "#,
        )
        .unwrap();

        assert_eq!(config.interpreter, "/opt/node20/bin/node");
        assert_eq!(config.runtime_prefix, "node");
        assert_eq!(
            config.bootstrap_path().unwrap(),
            PathBuf::from("/work/.sst/platform/dist/nodejs-runtime/index.js")
        );
    }

    #[test]
    fn test_bootstrap_requires_platform_dir() {
        let err = RuntimeConfig::default().bootstrap_path().unwrap_err();
        assert!(matches!(err, FuncrunError::Configuration(_)));
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(RuntimeConfig::from_toml_str("interpreter = \"\"").is_err());
        assert!(RuntimeConfig::from_toml_str("log_channel_capacity = 0").is_err());
        assert!(matches!(
            RuntimeConfig::from_toml_str("interpreter = ["),
            Err(FuncrunError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "runtime_prefix = \"nodejs\"\n").unwrap();

        let config = RuntimeConfig::load(&path).unwrap();
        assert_eq!(config.runtime_prefix, "nodejs");

        let missing = RuntimeConfig::load(&dir.path().join("nope.toml"));
        assert!(matches!(missing, Err(FuncrunError::Configuration(_))));
    }
}
