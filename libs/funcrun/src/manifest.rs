// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Bundler dependency manifests.
//!
//! The manifest is the bundler's metafile: a JSON object whose top-level
//! `inputs` object is keyed by every source file read while producing the
//! bundle. Only the keys matter here.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use crate::error::{FuncrunError, Result};

/// Closed set of absolute source paths an artifact was built from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Manifest {
    inputs: HashSet<PathBuf>,
}

impl Manifest {
    /// Parse a metafile. Relative keys are resolved against `root`.
    pub fn parse(text: &str, root: &Path) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| FuncrunError::Manifest(format!("not valid JSON: {}", e)))?;
        let inputs = value
            .get("inputs")
            .and_then(|v| v.as_object())
            .ok_or_else(|| FuncrunError::Manifest("missing \"inputs\" object".into()))?;

        Ok(Self {
            inputs: inputs
                .keys()
                .map(|key| normalize_path(Path::new(key), root))
                .collect(),
        })
    }

    /// Exact membership test on normalized paths.
    pub fn contains(&self, path: &Path) -> bool {
        self.inputs.contains(path)
    }

    pub fn len(&self) -> usize {
        self.inputs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inputs.is_empty()
    }
}

/// Make `path` absolute against `base` and fold `.`/`..` lexically.
///
/// A relative `base` is first made absolute against the process cwd. No
/// filesystem access: symlinks are not followed and case is preserved.
pub fn normalize_path(path: &Path, base: &Path) -> PathBuf {
    let joined = if path.is_absolute() {
        path.to_path_buf()
    } else if base.is_absolute() {
        base.join(path)
    } else {
        match std::path::absolute(base) {
            Ok(base) => base.join(path),
            Err(e) => {
                tracing::debug!("Cannot make {} absolute: {}", base.display(), e);
                base.join(path)
            }
        }
    };
    fold_dots(&joined)
}

fn fold_dots(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `/..` stays `/`
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                // Leading `..` of a relative path cannot be folded away.
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    out
}
