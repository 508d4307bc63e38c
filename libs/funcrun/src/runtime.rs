// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Node.js runtime adapter: the surface an external dispatcher talks to.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::build::{handler_member, BuildInput, BundleRequest, Bundler};
use crate::config::RuntimeConfig;
use crate::error::{FuncrunError, Result};
use crate::handler::HandlerResolver;
use crate::matcher::RuntimeMatcher;
use crate::registry::{Artifact, BuildRegistry};
use crate::worker::{
    spawn_worker, ProcessGroupTerminator, RunRequest, TerminateTree, WorkerInstance,
};

/// Build tracking and worker launching for `node*` runtimes.
pub struct NodeRuntime {
    config: RuntimeConfig,
    matcher: RuntimeMatcher,
    resolver: HandlerResolver,
    registry: BuildRegistry,
    bundler: Option<Arc<dyn Bundler>>,
    terminator: Arc<dyn TerminateTree>,
}

impl NodeRuntime {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            matcher: RuntimeMatcher::new(config.runtime_prefix.clone()),
            resolver: HandlerResolver::new(config.root_dir.clone()),
            registry: BuildRegistry::new(),
            bundler: None,
            terminator: Arc::new(ProcessGroupTerminator),
            config,
        }
    }

    pub fn with_bundler(mut self, bundler: Arc<dyn Bundler>) -> Self {
        self.bundler = Some(bundler);
        self
    }

    /// Replace the process-tree terminator (platforms without process groups).
    pub fn with_terminator(mut self, terminator: Arc<dyn TerminateTree>) -> Self {
        self.terminator = terminator;
        self
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn registry(&self) -> &BuildRegistry {
        &self.registry
    }

    /// Whether this adapter handles `runtime`.
    pub fn matches(&self, runtime: &str) -> bool {
        self.matcher.matches(runtime)
    }

    /// Source file backing a handler specifier.
    pub fn resolve_handler(&self, handler: &str) -> Option<PathBuf> {
        self.resolver.resolve(handler)
    }

    /// Bundle `function_id` and record the result as its latest artifact.
    ///
    /// A failed build records nothing and leaves the previous artifact in place.
    pub fn build(&self, function_id: &str, input: &BuildInput) -> Result<Arc<Artifact>> {
        let bundler = self.bundler.as_ref().ok_or_else(|| {
            FuncrunError::Configuration("no bundler configured for node runtime".into())
        })?;

        let entry = self
            .resolve_handler(&input.handler)
            .ok_or_else(|| FuncrunError::HandlerNotFound {
                handler: input.handler.clone(),
                root: self.config.root_dir.clone(),
            })?;

        let request = BundleRequest {
            function_id: function_id.to_string(),
            entry,
            member: handler_member(&input.handler),
            out_dir: input.out_dir.clone(),
            root_dir: self.config.root_dir.clone(),
            loaders: input.properties.resolved_loaders()?,
            properties: input.properties.clone(),
        };

        tracing::info!(
            "[{}] Building {} into {}",
            function_id,
            request.entry.display(),
            request.out_dir.display()
        );
        let output = bundler.bundle(&request)?;

        if !output.errors.is_empty() {
            for error in &output.errors {
                tracing::warn!("[{}] {}", function_id, error);
            }
            return Err(FuncrunError::BuildFailed {
                function_id: function_id.to_string(),
                message: output.errors.join("; "),
            });
        }

        let manifest_root = if output.working_dir.as_os_str().is_empty() {
            self.config.root_dir.clone()
        } else {
            output.working_dir
        };
        Ok(self.registry.record(
            function_id,
            Artifact {
                out_dir: request.out_dir,
                handler: output.handler,
                manifest: output.metafile,
                manifest_root,
            },
        ))
    }

    /// See [`BuildRegistry::should_rebuild`].
    pub fn should_rebuild(&self, function_id: &str, changed: &Path) -> bool {
        self.registry.should_rebuild(function_id, changed)
    }

    /// Start a worker. Cancelling `cancel` terminates its whole process tree.
    ///
    /// Must be called within a Tokio runtime.
    pub fn run(&self, cancel: CancellationToken, request: &RunRequest) -> Result<WorkerInstance> {
        spawn_worker(&self.config, Arc::clone(&self.terminator), cancel, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::build::BundleOutput;
    use parking_lot::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingBundler {
        requests: Mutex<Vec<BundleRequest>>,
        fail_with: Option<String>,
    }

    impl Bundler for RecordingBundler {
        fn bundle(&self, request: &BundleRequest) -> Result<BundleOutput> {
            self.requests.lock().push(request.clone());
            let metafile = format!(
                r#"{{"inputs": {{"{}": {{}}, "shared/util.ts": {{}}}}}}"#,
                request.entry.display()
            );
            Ok(BundleOutput {
                handler: "index.mjs".into(),
                metafile: Some(metafile),
                working_dir: request.root_dir.clone(),
                errors: self.fail_with.iter().cloned().collect(),
            })
        }
    }

    fn project() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/api.ts"), "export const main = () => {}").unwrap();
        dir
    }

    fn runtime(root: &Path, bundler: Arc<RecordingBundler>) -> NodeRuntime {
        let config = RuntimeConfig {
            root_dir: root.to_path_buf(),
            ..RuntimeConfig::default()
        };
        NodeRuntime::new(config).with_bundler(bundler)
    }

    #[test]
    fn test_build_records_artifact() {
        let dir = project();
        let bundler = Arc::new(RecordingBundler::default());
        let runtime = runtime(dir.path(), bundler.clone());

        let mut input = BuildInput {
            handler: "src/api.main".into(),
            out_dir: dir.path().join(".build/api"),
            ..BuildInput::default()
        };
        input.properties.loader.insert("sql".into(), "text".into());

        let artifact = runtime.build("api", &input).unwrap();
        assert_eq!(artifact.entry_path(), dir.path().join(".build/api/index.mjs"));

        let requests = bundler.requests.lock();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].entry, dir.path().join("src/api.ts"));
        assert_eq!(requests[0].member, "main");
        assert!(requests[0].loaders.contains_key(".sql"));

        assert!(runtime.should_rebuild("api", &dir.path().join("src/api.ts")));
        assert!(runtime.should_rebuild("api", &dir.path().join("shared/util.ts")));
        assert!(!runtime.should_rebuild("api", &dir.path().join("src/other.ts")));
        assert!(!runtime.should_rebuild("web", &dir.path().join("src/api.ts")));
    }

    #[test]
    fn test_failed_build_keeps_previous_artifact() {
        let dir = project();
        let ok = runtime(dir.path(), Arc::new(RecordingBundler::default()));
        let input = BuildInput {
            handler: "src/api.main".into(),
            out_dir: dir.path().join("out"),
            ..BuildInput::default()
        };
        ok.build("api", &input).unwrap();

        let failing = NodeRuntime {
            bundler: Some(Arc::new(RecordingBundler {
                fail_with: Some("Could not resolve \"left-pad\"".into()),
                ..RecordingBundler::default()
            })),
            registry: ok.registry().clone(),
            ..runtime(dir.path(), Arc::new(RecordingBundler::default()))
        };
        let err = failing.build("api", &input).unwrap_err();
        assert!(matches!(err, FuncrunError::BuildFailed { .. }));
        assert!(failing.should_rebuild("api", &dir.path().join("src/api.ts")));
    }

    #[test]
    fn test_build_errors_before_bundling() {
        let dir = project();
        let bundler = Arc::new(RecordingBundler::default());
        let runtime = runtime(dir.path(), bundler.clone());

        let missing = BuildInput {
            handler: "src/missing.main".into(),
            ..BuildInput::default()
        };
        assert!(matches!(
            runtime.build("api", &missing),
            Err(FuncrunError::HandlerNotFound { .. })
        ));

        let mut bad_loader = BuildInput {
            handler: "src/api.main".into(),
            ..BuildInput::default()
        };
        bad_loader.properties.loader.insert("wasm".into(), "wasm".into());
        assert!(matches!(
            runtime.build("api", &bad_loader),
            Err(FuncrunError::Configuration(_))
        ));

        assert!(bundler.requests.lock().is_empty());
        assert!(runtime.registry().is_empty());
    }

    #[test]
    fn test_build_without_bundler() {
        let dir = project();
        let runtime = NodeRuntime::new(RuntimeConfig {
            root_dir: dir.path().to_path_buf(),
            ..RuntimeConfig::default()
        });
        let input = BuildInput {
            handler: "src/api.main".into(),
            ..BuildInput::default()
        };
        assert!(matches!(
            runtime.build("api", &input),
            Err(FuncrunError::Configuration(_))
        ));
    }

    #[test]
    fn test_matches_uses_configured_prefix() {
        let runtime = NodeRuntime::new(RuntimeConfig::default());
        assert!(runtime.matches("node18"));
        assert!(!runtime.matches("python3.11"));
    }
}
