//! Structured issues reported by analysis engines.

use serde::{Deserialize, Serialize};
use std::fmt;
use vigil_common::FileId;

use crate::severity::Severity;

/// The engine family that produced an issue.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub enum IssueSource {
    /// A type-checker-like engine.
    #[serde(rename = "type-check")]
    TypeCheck,
    /// A linter-like engine.
    #[serde(rename = "lint")]
    Lint,
}

impl fmt::Display for IssueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueSource::TypeCheck => write!(f, "type-check"),
            IssueSource::Lint => write!(f, "lint"),
        }
    }
}

/// A single finding at a position in a source file.
///
/// Lines and columns are one-based.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// The file the issue was found in.
    pub file: FileId,
    /// One-based line number.
    pub line: u32,
    /// One-based column number.
    pub column: u32,
    /// How severe the issue is.
    pub severity: Severity,
    /// Engine-specific code (e.g., `E001` or `max-line-length`).
    pub code: String,
    /// Human-readable description.
    pub message: String,
    /// The engine family that produced the issue.
    pub source: IssueSource,
}

impl Issue {
    /// Creates an error issue.
    pub fn error(
        source: IssueSource,
        file: FileId,
        line: u32,
        column: u32,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            file,
            line,
            column,
            severity: Severity::Error,
            code: code.into(),
            message: message.into(),
            source,
        }
    }

    /// Creates a warning issue.
    pub fn warning(
        source: IssueSource,
        file: FileId,
        line: u32,
        column: u32,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(source, file, line, column, code, message)
        }
    }

    /// Returns a copy of this issue with a different severity.
    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    fn position(&self) -> (&FileId, u32, u32) {
        (&self.file, self.line, self.column)
    }
}

/// Sorts issues by file, then line, then column.
///
/// The sort is stable, so issues at the same position keep the order in
/// which the engine reported them.
pub fn sort_issues(issues: &mut [Issue]) {
    issues.sort_by(|a, b| a.position().cmp(&b.position()));
}

/// Error and warning counts over a set of issues.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IssueSummary {
    /// Number of error issues.
    pub errors: usize,
    /// Number of warning issues.
    pub warnings: usize,
}

impl IssueSummary {
    /// Counts the issues by severity.
    pub fn from_issues(issues: &[Issue]) -> Self {
        issues.iter().fold(Self::default(), |mut summary, issue| {
            match issue.severity {
                Severity::Error => summary.errors += 1,
                Severity::Warning => summary.warnings += 1,
            }
            summary
        })
    }

    /// Returns `true` if at least one error was counted.
    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }
}
