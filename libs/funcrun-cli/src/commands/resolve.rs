// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Handler resolution and runtime matching commands.

use std::path::PathBuf;

use anyhow::{bail, Result};
use funcrun::{NodeRuntime, RuntimeConfig};

pub fn resolve(mut config: RuntimeConfig, handler: &str, root: Option<PathBuf>) -> Result<()> {
    if let Some(root) = root {
        config.root_dir = root;
    }
    let runtime = NodeRuntime::new(config);

    match runtime.resolve_handler(handler) {
        Some(path) => {
            println!("{}", path.display());
            Ok(())
        }
        None => bail!(
            "No source file for handler '{}' under {} (tried {})",
            handler,
            runtime.config().root_dir.display(),
            funcrun::NODE_EXTENSIONS.join(", ")
        ),
    }
}

pub fn matches(config: RuntimeConfig, runtime_id: &str) {
    let runtime = NodeRuntime::new(config);
    println!("{}", runtime.matches(runtime_id));
}
