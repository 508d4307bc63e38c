// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Handler specifier resolution.
//!
//! A specifier looks like `src/api/handler.main`: a path without extension
//! followed by the exported member name. The member is dropped and the
//! remaining base name is tried against [`NODE_EXTENSIONS`] in order.

use std::path::{Path, PathBuf};

/// Candidate source extensions, typed sources first so they win over
/// compiled output sitting next to them.
pub const NODE_EXTENSIONS: [&str; 8] = ["ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs"];

/// Resolves handler specifiers to source files on disk.
#[derive(Debug, Clone)]
pub struct HandlerResolver {
    root: PathBuf,
}

impl HandlerResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Return the first existing candidate file for `handler`, if any.
    pub fn resolve(&self, handler: &str) -> Option<PathBuf> {
        let spec = Path::new(handler);
        let dir = spec.parent().unwrap_or_else(|| Path::new(""));
        let file_name = spec.file_name()?.to_string_lossy();
        let base = match file_name.rsplit_once('.') {
            Some((base, _member)) => base,
            None => &*file_name,
        };
        if base.is_empty() {
            return None;
        }

        for ext in NODE_EXTENSIONS {
            let candidate = self.root.join(dir).join(format!("{}.{}", base, ext));
            if candidate.is_file() {
                tracing::debug!("Resolved handler '{}' to {}", handler, candidate.display());
                return Some(candidate);
            }
        }

        tracing::debug!(
            "No source file for handler '{}' under {}",
            handler,
            self.root.display()
        );
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "export default {}").unwrap();
    }

    #[test]
    fn test_resolves_only_existing_candidate() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "handler.js");

        let resolver = HandlerResolver::new(dir.path());
        assert_eq!(
            resolver.resolve("handler.default"),
            Some(dir.path().join("handler.js"))
        );
    }

    #[test]
    fn test_not_found() {
        let dir = TempDir::new().unwrap();
        let resolver = HandlerResolver::new(dir.path());
        assert_eq!(resolver.resolve("handler.default"), None);
    }

    #[test]
    fn test_typescript_takes_precedence() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "handler.js");
        touch(dir.path(), "handler.ts");
        touch(dir.path(), "handler.mjs");

        let resolver = HandlerResolver::new(dir.path());
        assert_eq!(
            resolver.resolve("handler.default"),
            Some(dir.path().join("handler.ts"))
        );
    }

    #[test]
    fn test_nested_directory_and_dotted_base() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "src/api/users.v2.cts");

        let resolver = HandlerResolver::new(dir.path());
        assert_eq!(
            resolver.resolve("src/api/users.v2.handler"),
            Some(dir.path().join("src/api/users.v2.cts"))
        );
    }

    #[test]
    fn test_directory_with_candidate_name_is_skipped() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("handler.ts")).unwrap();
        touch(dir.path(), "handler.jsx");

        let resolver = HandlerResolver::new(dir.path());
        assert_eq!(
            resolver.resolve("handler.main"),
            Some(dir.path().join("handler.jsx"))
        );
    }
}
