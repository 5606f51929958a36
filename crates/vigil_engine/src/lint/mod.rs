//! The `lint` engine: line-based style rules.
//!
//! # Rules
//!
//! - **trailing-whitespace:** spaces or tabs before the end of a line
//! - **max-line-length:** lines longer than the configured limit
//! - **no-tabs:** tab characters used for indentation
//!
//! Every rule can be suppressed with `allow` or promoted to an error with
//! `deny` in the engine's configuration.

mod engine;
mod rules;

pub use engine::LintEngine;
pub use rules::{register_builtin_rules, MaxLineLength, NoTabs, TrailingWhitespace};

use vigil_diagnostics::Severity;

/// A rule violation, before severity and file are attached.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Violation {
    /// 1-based line.
    pub line: u32,
    /// 1-based column, in characters.
    pub column: u32,
    /// Human-readable description.
    pub message: String,
}

/// A single lint rule that checks a file's text.
///
/// Each rule has a unique kebab-case name (also used as the issue code), a
/// human-readable description, and a default severity.
pub trait LintRule: Send + Sync {
    /// Returns the short kebab-case name of this rule (e.g., "no-tabs").
    fn name(&self) -> &str;

    /// Returns a human-readable description of what this rule checks.
    fn description(&self) -> &str;

    /// Returns the default severity for issues emitted by this rule.
    fn default_severity(&self) -> Severity;

    /// Checks one file and returns every violation found.
    fn check_file(&self, content: &str) -> Vec<Violation>;
}
