// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Build inputs and the bundler seam.
//!
//! Bundling itself happens elsewhere: callers plug in a [`Bundler`] and the
//! runtime records whatever it produces. Deciding *when* a rebuild is due is
//! [`crate::BuildRegistry`]'s job, performing it is the bundler's.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FuncrunError, Result};

/// How the bundler should interpret files with a given extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Loader {
    Js,
    Jsx,
    Ts,
    Tsx,
    Css,
    Json,
    Text,
    Base64,
    File,
    DataUrl,
    Binary,
}

impl FromStr for Loader {
    type Err = FuncrunError;

    fn from_str(name: &str) -> Result<Self> {
        Ok(match name {
            "js" => Loader::Js,
            "jsx" => Loader::Jsx,
            "ts" => Loader::Ts,
            "tsx" => Loader::Tsx,
            "css" => Loader::Css,
            "json" => Loader::Json,
            "text" => Loader::Text,
            "base64" => Loader::Base64,
            "file" => Loader::File,
            "dataurl" => Loader::DataUrl,
            "binary" => Loader::Binary,
            other => {
                return Err(FuncrunError::Configuration(format!(
                    "unknown loader '{}'",
                    other
                )))
            }
        })
    }
}

impl fmt::Display for Loader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Loader::Js => "js",
            Loader::Jsx => "jsx",
            Loader::Ts => "ts",
            Loader::Tsx => "tsx",
            Loader::Css => "css",
            Loader::Json => "json",
            Loader::Text => "text",
            Loader::Base64 => "base64",
            Loader::File => "file",
            Loader::DataUrl => "dataurl",
            Loader::Binary => "binary",
        };
        f.write_str(name)
    }
}

/// Per-function Node.js build properties, as supplied by the project config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeProperties {
    /// File extension (with or without leading dot) to loader name.
    pub loader: BTreeMap<String, String>,
    /// Packages left external and installed alongside the bundle.
    pub install: Vec<String>,
    pub banner: String,
    /// Raw bundler options passed through untouched.
    pub esbuild: Option<serde_json::Value>,
    pub minify: bool,
    /// `esm` or `cjs`.
    pub format: String,
    pub source_map: bool,
    pub splitting: bool,
    /// Path to a module exporting extra bundler plugins.
    pub plugins: String,
    pub architecture: String,
}

impl NodeProperties {
    /// Parse the loader table, normalizing keys to `.ext`.
    pub fn resolved_loaders(&self) -> Result<HashMap<String, Loader>> {
        self.loader
            .iter()
            .map(|(ext, name)| {
                let ext = if ext.starts_with('.') {
                    ext.clone()
                } else {
                    format!(".{}", ext)
                };
                Ok((ext, name.parse::<Loader>()?))
            })
            .collect()
    }
}

/// What the caller asks to build.
#[derive(Debug, Clone, Default)]
pub struct BuildInput {
    /// Handler specifier, e.g. `src/api.handler`.
    pub handler: String,
    /// Where the bundle should be written.
    pub out_dir: PathBuf,
    pub properties: NodeProperties,
}

/// Everything a [`Bundler`] needs for one build.
#[derive(Debug, Clone)]
pub struct BundleRequest {
    pub function_id: String,
    /// Resolved handler source file.
    pub entry: PathBuf,
    /// Exported member name from the handler specifier.
    pub member: String,
    pub out_dir: PathBuf,
    pub root_dir: PathBuf,
    pub properties: NodeProperties,
    pub loaders: HashMap<String, Loader>,
}

/// Result reported by a [`Bundler`].
#[derive(Debug, Clone, Default)]
pub struct BundleOutput {
    /// Entry file relative to the output directory.
    pub handler: String,
    /// Bundler metafile (JSON with an `inputs` object), if produced.
    pub metafile: Option<String>,
    /// Directory relative metafile keys are relative to.
    pub working_dir: PathBuf,
    /// Errors reported by the bundler. Non-empty means the build failed.
    pub errors: Vec<String>,
}

/// External bundler. Implementations may keep incremental state per function.
pub trait Bundler: Send + Sync {
    fn bundle(&self, request: &BundleRequest) -> Result<BundleOutput>;
}

/// Exported member name of a handler specifier (`src/api.main` → `main`).
/// Empty when the specifier has no member segment.
pub(crate) fn handler_member(handler: &str) -> String {
    let file_name = handler.rsplit('/').next().unwrap_or(handler);
    file_name
        .rsplit_once('.')
        .map(|(_, member)| member.to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loader_names() {
        assert_eq!("dataurl".parse::<Loader>().unwrap(), Loader::DataUrl);
        assert_eq!(Loader::Base64.to_string(), "base64");
        assert!("wasm".parse::<Loader>().is_err());
    }

    #[test]
    fn test_properties_from_json() {
        let props: NodeProperties = serde_json::from_str(
            r#"{
                "loader": { "png": "file", ".sql": "text" },
                "install": ["sharp"],
                "minify": true,
                "format": "esm",
                "sourceMap": true
            }"#,
        )
        .unwrap();

        assert!(props.minify);
        assert!(props.source_map);
        assert!(!props.splitting);
        assert_eq!(props.install, vec!["sharp"]);

        let loaders = props.resolved_loaders().unwrap();
        assert_eq!(loaders.get(".png"), Some(&Loader::File));
        assert_eq!(loaders.get(".sql"), Some(&Loader::Text));
    }

    #[test]
    fn test_unknown_loader_is_configuration_error() {
        let mut props = NodeProperties::default();
        props.loader.insert("wasm".into(), "wasm".into());
        assert!(matches!(
            props.resolved_loaders(),
            Err(FuncrunError::Configuration(_))
        ));
    }

    #[test]
    fn test_handler_member() {
        assert_eq!(handler_member("src/api/users.main"), "main");
        assert_eq!(handler_member("index.default"), "default");
        assert_eq!(handler_member("a.b.handler"), "handler");
        assert_eq!(handler_member("index"), "");
    }
}
