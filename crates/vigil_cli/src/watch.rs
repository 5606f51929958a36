//! `vigil watch`: continuous incremental analysis.
//!
//! The project is hashed on every tick; files whose content hash changed,
//! appeared or vanished since the previous tick become an incremental
//! trigger. Ctrl-C tears the workers down.

use std::future::Future;
use std::pin::pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use vigil_cache::{HashSnapshot, SourceHasher};
use vigil_orchestrator::{ResultSink, Trigger};

use crate::pipeline::{load_project, resolve_config_path, Project};
use crate::sink::ConsoleSink;
use crate::{GlobalArgs, ReportFormat, WatchArgs};

/// Runs the `vigil watch` command until interrupted.
pub async fn run(args: &WatchArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = Arc::new(load_project(&resolve_config_path(global)?)?);
    let orchestrator = Arc::new(project.orchestrator(args.in_process)?);
    let interval =
        Duration::from_millis(args.interval_ms.unwrap_or(project.config.watch.poll_interval_ms).max(1));

    if !global.quiet {
        eprintln!(
            "   Watching {} ({}), press Ctrl-C to stop",
            project.config.project.name,
            orchestrator.engines().join(", ")
        );
    }

    let sink: Arc<dyn ResultSink> = Arc::new(ConsoleSink::new(
        &project.root,
        ReportFormat::Text,
        global.color,
        global.quiet,
    ));
    let (triggers, rx) = mpsc::channel(16);
    let running = tokio::spawn({
        let orchestrator = Arc::clone(&orchestrator);
        async move { orchestrator.run(rx, sink).await }
    });

    let previous = snapshot(&project).await?;
    triggers.send(Trigger::Initial).await?;
    poll_changes(&project, previous, interval, &triggers, interrupted()).await?;

    triggers.send(Trigger::Teardown).await?;
    running.await?;
    Ok(0)
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
async fn interrupted() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("interrupted"),
        Err(e) => {
            warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    }
}

/// Re-hashes the project every `interval` and sends the differences as
/// incremental triggers, until `shutdown` resolves.
///
/// `shutdown` is polled across ticks, so a signal that arrives while a
/// snapshot is being taken still ends the loop.
async fn poll_changes(
    project: &Arc<Project>,
    mut previous: HashSnapshot,
    interval: Duration,
    triggers: &mpsc::Sender<Trigger>,
    shutdown: impl Future<Output = ()>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut shutdown = pin!(shutdown);
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    ticker.tick().await;
    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {
                let current = match snapshot(&project).await {
                    Ok(current) => current,
                    Err(e) => {
                        warn!(error = %e, "failed to scan project");
                        continue;
                    }
                };
                let changes = SourceHasher::detect_changes(&current, &previous);
                previous = current;
                if changes.is_empty() {
                    continue;
                }
                debug!(dirty = changes.dirty_count(), "files changed");
                triggers.send(Trigger::Incremental(changes.into_files_change())).await?;
            }
        }
    }
    Ok(())
}

/// Hashes every watched file off the runtime thread.
async fn snapshot(project: &Arc<Project>) -> Result<HashSnapshot, Box<dyn std::error::Error>> {
    let project = Arc::clone(project);
    let scanned = tokio::task::spawn_blocking(move || {
        let files = project.watched_files().map_err(|e| e.to_string())?;
        Ok::<_, String>(SourceHasher::hash_files(&project.root, &files))
    })
    .await?;
    Ok(scanned?)
}
