// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Local-development runtime adapter for Node.js serverless functions.
//!
//! This crate provides:
//! - Handler specifier resolution ([`HandlerResolver`])
//! - Runtime identifier matching ([`RuntimeMatcher`])
//! - Latest-artifact tracking and manifest-driven rebuild checks ([`BuildRegistry`])
//! - Worker process spawning, tree termination and merged logs ([`worker`])
//!
//! # Example
//!
//! ```
//! use std::path::{Path, PathBuf};
//! use funcrun::{Artifact, BuildRegistry};
//!
//! let registry = BuildRegistry::new();
//! registry.record(
//!     "fn1",
//!     Artifact {
//!         out_dir: PathBuf::from("/out/fn1"),
//!         handler: "index.mjs".into(),
//!         manifest: Some(r#"{"inputs": {"/src/a.ts": {}}}"#.into()),
//!         manifest_root: PathBuf::from("/"),
//!     },
//! );
//!
//! assert!(registry.should_rebuild("fn1", Path::new("/src/a.ts")));
//! assert!(!registry.should_rebuild("fn2", Path::new("/src/a.ts")));
//! ```

pub mod build;
pub mod config;
pub mod error;
pub mod handler;
pub mod manifest;
pub mod matcher;
pub mod registry;
pub mod runtime;
pub mod worker;

pub use build::{BuildInput, BundleOutput, BundleRequest, Bundler, Loader, NodeProperties};
pub use config::RuntimeConfig;
pub use error::{FuncrunError, Result};
pub use handler::{HandlerResolver, NODE_EXTENSIONS};
pub use manifest::Manifest;
pub use matcher::RuntimeMatcher;
pub use registry::{Artifact, BuildRegistry};
pub use runtime::NodeRuntime;
pub use worker::{LogStream, RunRequest, WorkerInstance};

// Re-exported so callers can build cancellation tokens for `NodeRuntime::run`.
pub use tokio_util::sync::CancellationToken;
