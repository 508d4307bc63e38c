// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Rebuild check against a recorded metafile.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use funcrun::{Artifact, NodeRuntime, RuntimeConfig};

pub fn check(
    config: RuntimeConfig,
    function_id: &str,
    metafile: &Path,
    metafile_root: Option<PathBuf>,
    changed: &[PathBuf],
) -> Result<()> {
    let text = std::fs::read_to_string(metafile)
        .with_context(|| format!("Failed to read metafile {}", metafile.display()))?;

    let runtime = NodeRuntime::new(config);
    let manifest_root = metafile_root.unwrap_or_else(|| runtime.config().root_dir.clone());
    let out_dir = metafile
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let artifact = runtime.registry().record(
        function_id,
        Artifact {
            out_dir,
            handler: String::new(),
            manifest: Some(text),
            manifest_root,
        },
    );
    match artifact.parse_manifest() {
        Ok(manifest) => tracing::info!(
            "Metafile lists {} inputs (root={})",
            manifest.len(),
            artifact.manifest_root.display()
        ),
        Err(e) => tracing::warn!("{}; every change will be reported as unrelated", e),
    }

    for path in changed {
        let verdict = if runtime.should_rebuild(function_id, path) {
            "rebuild"
        } else {
            "unchanged"
        };
        println!("{}\t{}", verdict, path.display());
    }
    Ok(())
}
