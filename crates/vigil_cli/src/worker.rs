//! `vigil worker`: one engine served over stdio.
//!
//! Spawned by the orchestrator with `--engine` and `--config`. Requests
//! arrive as NDJSON on stdin and answers leave on stdout; logs go to
//! stderr. The process exits when stdin closes.

use std::sync::Arc;

use tracing::info;
use vigil_config::EngineKind;
use vigil_engine::{build_reporter, WorkerService};
use vigil_rpc::RpcEndpoint;

use crate::pipeline::load_project;
use crate::{GlobalArgs, WorkerArgs};

/// Runs the worker until the host closes the channel.
pub async fn run(args: &WorkerArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let kind = EngineKind::from_name(&args.engine)
        .ok_or_else(|| format!("unknown engine '{}'", args.engine))?;
    let config_path = global
        .config
        .as_deref()
        .ok_or("worker requires --config")?;
    let project = load_project(config_path)?;
    let reporter = build_reporter(&project.config, kind, &project.root)?;

    info!(engine = %kind, pid = std::process::id(), "worker starting");
    let endpoint = RpcEndpoint::spawn(tokio::io::stdin(), tokio::io::stdout());
    WorkerService::new(endpoint, Arc::new(reporter)).run().await;
    Ok(0)
}
