//! `vigil check`: one full analysis of the project.
//!
//! 1. Resolve and load `vigil.toml`
//! 2. Build one reporter per enabled engine (worker processes by default)
//! 3. Trigger the initial cycle and wait for it to settle
//! 4. Tear the workers down and print the issues

use tracing::info;
use vigil_common::FilesChange;
use vigil_diagnostics::IssueSummary;
use vigil_orchestrator::ReportState;

use crate::pipeline::{load_project, resolve_config_path};
use crate::sink::ConsoleSink;
use crate::{CheckArgs, GlobalArgs};

/// Exit code when an engine failed.
const EXIT_ENGINE_FAILURE: i32 = 2;

/// Runs the `vigil check` command.
///
/// Returns exit code 0 if no errors, 1 if there are error issues, and 2 if
/// the cycle failed.
pub async fn run(args: &CheckArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let project = load_project(&resolve_config_path(global)?)?;
    let orchestrator = project.orchestrator(args.in_process)?;

    if !global.quiet {
        eprintln!(
            "   Checking {} ({})",
            project.config.project.name,
            orchestrator.engines().join(", ")
        );
    }
    info!(root = %project.root.display(), in_process = args.in_process, "starting check");

    let report = orchestrator.trigger(FilesChange::new());
    let state = report.settled().await;
    orchestrator.teardown().await;

    let sink = ConsoleSink::new(&project.root, args.format, global.color, global.quiet);
    match state {
        Some(ReportState::Resolved(issues)) => {
            sink.print(&issues);
            Ok(i32::from(IssueSummary::from_issues(&issues).has_errors()))
        }
        Some(ReportState::Errored(error)) => {
            eprintln!("error: {error}");
            Ok(EXIT_ENGINE_FAILURE)
        }
        Some(ReportState::Cancelled) => Err("analysis was cancelled".into()),
        Some(ReportState::Running) | None => Err("analysis did not complete".into()),
    }
}
