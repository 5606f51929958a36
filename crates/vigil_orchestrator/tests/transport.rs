//! Worker processes that die or misbehave surface as errors, never hangs.

#![cfg(unix)]

use std::sync::Arc;

use vigil_common::{CancellationToken, FilesChange};
use vigil_engine::{AnalysisError, Reporter};
use vigil_orchestrator::{Orchestrator, ReportState, RpcReporter, WorkerCommand};

fn reporter(name: &str, command: WorkerCommand) -> Arc<RpcReporter> {
    Arc::new(RpcReporter::new(name.to_string(), command))
}

#[tokio::test]
async fn worker_that_exits_fails_the_cycle() {
    let check = reporter("check", WorkerCommand::new("true"));
    let orchestrator = Orchestrator::new(vec![check.clone()]);

    let report = orchestrator.trigger(FilesChange::new());
    match report.settled().await {
        Some(ReportState::Errored(error)) => {
            assert_eq!(error.engine, "check");
            assert!(matches!(error.source, AnalysisError::TransportClosed { .. }));
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(!check.worker().is_alive());
}

#[tokio::test]
async fn worker_that_never_answers_can_be_torn_down() {
    let lint = reporter("lint", WorkerCommand::new("sleep").arg("30"));
    let orchestrator = Orchestrator::new(vec![lint.clone()]);

    let report = orchestrator.trigger(FilesChange::new());
    while lint.worker().pid().is_none() {
        tokio::task::yield_now().await;
    }
    orchestrator.teardown().await;

    assert!(matches!(report.settled().await, Some(ReportState::Cancelled)));
    assert!(!lint.worker().is_alive());
}

#[tokio::test]
async fn run_without_connect_is_transport_error() {
    let check = reporter("check", WorkerCommand::new("true"));
    let err = check
        .get_report(FilesChange::new(), CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, AnalysisError::TransportClosed { .. }));
}

#[tokio::test]
async fn next_cycle_respawns_dead_worker() {
    let check = reporter("check", WorkerCommand::new("true"));
    let orchestrator = Orchestrator::new(vec![check.clone()]);

    orchestrator.trigger(FilesChange::new()).settled().await;
    let first = check.worker().pid();
    orchestrator.trigger(FilesChange::new()).settled().await;
    let second = check.worker().pid();

    assert!(first.is_some() && second.is_some());
    assert_ne!(first, second);
}
