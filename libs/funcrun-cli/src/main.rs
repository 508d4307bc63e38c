// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! funcrun CLI
//!
//! Developer front end for the Node.js runtime adapter: resolve handlers,
//! check whether a file change invalidates a build, and run a built function
//! as a local worker with its logs on stdout.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use funcrun::RuntimeConfig;

mod commands;

#[derive(Parser)]
#[command(name = "funcrun")]
#[command(author, version, about = "Run Node.js serverless functions locally", long_about = None)]
struct Cli {
    /// Config file (defaults to <config dir>/funcrun/config.toml when present)
    #[arg(long, global = true, env = "FUNCRUN_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a built function as a worker and stream its logs
    Run {
        /// Bundle output directory
        #[arg(long, value_name = "DIR")]
        out: PathBuf,

        /// Entry file inside the output directory
        #[arg(long, default_value = "index.mjs")]
        handler: String,

        /// Worker identifier passed to the bootstrap
        #[arg(long, default_value = "worker-0")]
        worker_id: String,

        /// Runtime-API address the worker polls
        #[arg(long, env = "FUNCRUN_SERVER")]
        server: String,

        /// Extra environment for the worker (KEY=VALUE, repeatable)
        #[arg(long = "env", value_name = "KEY=VALUE")]
        env: Vec<String>,

        /// Do not forward the host PATH to the worker
        #[arg(long)]
        no_path: bool,
    },

    /// Resolve a handler specifier to its source file
    Resolve {
        /// Handler specifier, e.g. src/api.handler
        handler: String,

        /// Project root (overrides config)
        #[arg(long, value_name = "DIR")]
        root: Option<PathBuf>,
    },

    /// Check whether changed files invalidate a build
    Check {
        /// Function identifier
        #[arg(long = "function")]
        function_id: String,

        /// Bundler metafile recorded for the function
        #[arg(long, value_name = "PATH")]
        metafile: PathBuf,

        /// Directory relative metafile keys are resolved against (default: project root)
        #[arg(long, value_name = "DIR")]
        metafile_root: Option<PathBuf>,

        /// Changed files
        #[arg(required = true)]
        changed: Vec<PathBuf>,
    },

    /// Test whether a runtime identifier belongs to this adapter
    Match {
        runtime: String,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // stdout carries worker output and command results; diagnostics go to stderr.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = RuntimeConfig::resolve(cli.config.as_deref()).context("Failed to load config")?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(cli.command, config))
}

async fn async_main(command: Commands, config: RuntimeConfig) -> Result<()> {
    match command {
        Commands::Run {
            out,
            handler,
            worker_id,
            server,
            env,
            no_path,
        } => {
            commands::run::run(
                config,
                commands::run::RunArgs {
                    out,
                    handler,
                    worker_id,
                    server,
                    env,
                    forward_path: !no_path,
                },
            )
            .await
        }
        Commands::Resolve { handler, root } => commands::resolve::resolve(config, &handler, root),
        Commands::Check {
            function_id,
            metafile,
            metafile_root,
            changed,
        } => commands::check::check(config, &function_id, &metafile, metafile_root, &changed),
        Commands::Match { runtime } => {
            commands::resolve::matches(config, &runtime);
            Ok(())
        }
    }
}
