//! Printing reports to the terminal.

use std::path::Path;

use tracing::debug;
use vigil_diagnostics::{Issue, IssueRenderer, IssueSummary, TerminalRenderer};
use vigil_orchestrator::{CycleError, ResultSink};

use crate::ReportFormat;

/// Renders issues for humans, with a trailing summary line.
pub fn render_text(issues: &[Issue], renderer: &TerminalRenderer) -> String {
    let mut out = String::new();
    for issue in issues {
        out.push_str(&renderer.render(issue));
        out.push('\n');
    }
    let summary = IssueSummary::from_issues(issues);
    out.push_str(&format!(
        "   Result: {} error(s), {} warning(s)\n",
        summary.errors, summary.warnings
    ));
    out
}

/// Renders issues as a JSON array.
pub fn render_json(issues: &[Issue]) -> String {
    serde_json::to_string_pretty(issues).unwrap_or_else(|_| "[]".to_string())
}

/// A [`ResultSink`] that prints each published report.
///
/// Text goes to stderr, JSON to stdout. Cancelled reports print nothing.
pub struct ConsoleSink {
    renderer: TerminalRenderer,
    format: ReportFormat,
    quiet: bool,
}

impl ConsoleSink {
    /// Creates a sink rendering excerpts from files under `root`.
    pub fn new(root: &Path, format: ReportFormat, color: bool, quiet: bool) -> Self {
        Self {
            renderer: TerminalRenderer::new(color).with_root(root),
            format,
            quiet,
        }
    }

    /// Prints a resolved report.
    pub fn print(&self, issues: &[Issue]) {
        match self.format {
            ReportFormat::Text => {
                if self.quiet {
                    for issue in issues.iter().filter(|i| i.severity.is_error()) {
                        eprintln!("{}", self.renderer.render(issue));
                    }
                } else {
                    eprint!("{}", render_text(issues, &self.renderer));
                }
            }
            ReportFormat::Json => println!("{}", render_json(issues)),
        }
    }
}

impl ResultSink for ConsoleSink {
    fn waiting(&self) {
        if !self.quiet && self.format == ReportFormat::Text {
            eprintln!("   Analyzing...");
        }
    }

    fn resolved(&self, issues: &[Issue]) {
        self.print(issues);
    }

    fn cancelled(&self) {
        debug!("report cancelled");
    }

    fn errored(&self, error: &CycleError) {
        eprintln!("error: {error}");
    }
}
