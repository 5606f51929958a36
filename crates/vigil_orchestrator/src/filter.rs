//! Which resolved issues are published.

use std::collections::BTreeSet;
use std::path::PathBuf;

use vigil_config::IssuesConfig;
use vigil_diagnostics::{Issue, Severity};

/// A predicate over issues, built from the `[issues]` table.
///
/// The default filter keeps everything.
#[derive(Clone, Debug)]
pub struct IssueFilter {
    include: Vec<PathBuf>,
    exclude: Vec<PathBuf>,
    excluded_codes: BTreeSet<String>,
    min_severity: Severity,
}

impl Default for IssueFilter {
    fn default() -> Self {
        Self {
            include: Vec::new(),
            exclude: Vec::new(),
            excluded_codes: BTreeSet::new(),
            min_severity: Severity::Warning,
        }
    }
}

impl IssueFilter {
    /// Builds the filter described by `config`.
    ///
    /// `min_severity` is validated when the configuration is loaded; an
    /// unrecognized value keeps every severity.
    pub fn from_config(config: &IssuesConfig) -> Self {
        let min_severity = match config.min_severity.as_deref() {
            Some("error") => Severity::Error,
            _ => Severity::Warning,
        };
        Self {
            include: config.include.iter().map(PathBuf::from).collect(),
            exclude: config.exclude.iter().map(PathBuf::from).collect(),
            excluded_codes: config.exclude_codes.iter().cloned().collect(),
            min_severity,
        }
    }

    /// Returns `true` if `issue` should be published.
    pub fn matches(&self, issue: &Issue) -> bool {
        let path = issue.file.as_path();
        if issue.severity < self.min_severity || self.excluded_codes.contains(&issue.code) {
            return false;
        }
        if self.exclude.iter().any(|prefix| path.starts_with(prefix)) {
            return false;
        }
        self.include.is_empty() || self.include.iter().any(|prefix| path.starts_with(prefix))
    }

    /// Keeps the issues that match, preserving order.
    pub fn apply(&self, issues: &mut Vec<Issue>) {
        issues.retain(|issue| self.matches(issue));
    }
}
