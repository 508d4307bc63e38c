// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Run a built function as a local worker.

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use funcrun::{CancellationToken, NodeRuntime, RunRequest, RuntimeConfig};

pub struct RunArgs {
    pub out: PathBuf,
    pub handler: String,
    pub worker_id: String,
    pub server: String,
    pub env: Vec<String>,
    pub forward_path: bool,
}

fn parse_env(pairs: &[String]) -> Result<Vec<(String, String)>> {
    pairs
        .iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .ok_or_else(|| anyhow!("Invalid --env '{}', expected KEY=VALUE", pair))
        })
        .collect()
}

pub async fn run(config: RuntimeConfig, args: RunArgs) -> Result<()> {
    let mut env = Vec::new();
    if args.forward_path {
        if let Ok(path) = std::env::var("PATH") {
            env.push(("PATH".to_string(), path));
        }
    }
    env.extend(parse_env(&args.env)?);

    let request = RunRequest {
        out_dir: args.out,
        handler: args.handler,
        worker_id: args.worker_id,
        env,
        server: args.server,
    };

    let runtime = NodeRuntime::new(config);
    let cancel = CancellationToken::new();
    let mut worker = runtime
        .run(cancel.clone(), &request)
        .context("Failed to start worker")?;
    let mut logs = worker.logs()?;

    let mut stdout = tokio::io::stdout();
    let copy = tokio::io::copy(&mut logs, &mut stdout);
    tokio::pin!(copy);

    tokio::select! {
        result = &mut copy => {
            result.context("Failed to forward worker output")?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, stopping worker");
            cancel.cancel();
            // Drain whatever the tree printed while shutting down.
            copy.await.context("Failed to forward worker output")?;
        }
    }

    let status = worker.wait().await?;
    tracing::info!("Worker '{}' exited: {}", worker.worker_id(), status);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env() {
        let env = parse_env(&["A=1".into(), "B=x=y".into()]).unwrap();
        assert_eq!(
            env,
            vec![
                ("A".to_string(), "1".to_string()),
                ("B".to_string(), "x=y".to_string())
            ]
        );
        assert!(parse_env(&["NOPE".into()]).is_err());
    }
}
