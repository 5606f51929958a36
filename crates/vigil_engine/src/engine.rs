//! The analysis engine contract.

use vigil_common::FileId;
use vigil_diagnostics::{Issue, IssueSource};

use crate::error::AnalysisError;

/// A per-file static analysis.
///
/// Engines are pure with respect to a file's content: the same input yields
/// the same issues. That is what makes per-file caching across cycles valid.
pub trait AnalysisEngine: Send + Sync {
    /// Returns the engine name used in configuration, logs and errors.
    fn name(&self) -> &str;

    /// Returns the engine family reported on every issue.
    fn source(&self) -> IssueSource;

    /// Analyzes one file and returns its issues in any order.
    fn analyze_file(&self, file: &FileId, content: &str) -> Result<Vec<Issue>, AnalysisError>;
}
