// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Latest build artifact per function, and rebuild-staleness queries.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::manifest::{normalize_path, Manifest};

/// Output of one successful build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Bundle output directory; workers run with this as their cwd.
    pub out_dir: PathBuf,
    /// Entry file inside `out_dir`.
    pub handler: String,
    /// Raw bundler metafile, parsed lazily by [`BuildRegistry::should_rebuild`].
    pub manifest: Option<String>,
    /// Directory that relative manifest keys are resolved against.
    pub manifest_root: PathBuf,
}

impl Artifact {
    /// Absolute-or-relative path of the bundled entry file.
    pub fn entry_path(&self) -> PathBuf {
        self.out_dir.join(&self.handler)
    }

    pub fn parse_manifest(&self) -> crate::Result<Manifest> {
        let text = self
            .manifest
            .as_deref()
            .ok_or_else(|| crate::FuncrunError::Manifest("artifact has no manifest".into()))?;
        Manifest::parse(text, &self.manifest_root)
    }
}

/// Thread-safe map of function ID to its most recent artifact.
///
/// Writers replace slots wholesale; readers take an `Arc` snapshot and never
/// hold the lock while inspecting it. Serializing rebuilds of a single
/// function is left to the caller.
#[derive(Clone, Default)]
pub struct BuildRegistry {
    inner: Arc<RwLock<HashMap<String, Arc<Artifact>>>>,
}

impl BuildRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `artifact` for `function_id`, dropping whatever was there.
    pub fn record(&self, function_id: &str, artifact: Artifact) -> Arc<Artifact> {
        let artifact = Arc::new(artifact);
        let previous = self
            .inner
            .write()
            .insert(function_id.to_string(), Arc::clone(&artifact));
        tracing::debug!(
            "Recorded build for '{}' (out_dir={}, replaced={})",
            function_id,
            artifact.out_dir.display(),
            previous.is_some()
        );
        artifact
    }

    /// Latest artifact for `function_id`.
    pub fn get(&self, function_id: &str) -> Option<Arc<Artifact>> {
        self.inner.read().get(function_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Whether a change to `changed` invalidates the artifact of `function_id`.
    ///
    /// `false` when nothing is recorded or the manifest cannot be read;
    /// otherwise manifest membership of the normalized path.
    pub fn should_rebuild(&self, function_id: &str, changed: &Path) -> bool {
        let Some(artifact) = self.get(function_id) else {
            return false;
        };

        let manifest = match artifact.parse_manifest() {
            Ok(manifest) => manifest,
            Err(e) => {
                tracing::debug!(
                    "Ignoring change to {} for '{}': {}",
                    changed.display(),
                    function_id,
                    e
                );
                return false;
            }
        };

        // Relative changed paths are relative to the process cwd.
        manifest.contains(&normalize_path(changed, Path::new(".")))
    }
}
