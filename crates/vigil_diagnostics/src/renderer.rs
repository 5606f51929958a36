//! Issue rendering for human-readable terminal output.

use std::path::PathBuf;

use crate::issue::Issue;
use crate::severity::Severity;

/// Trait for rendering issues into formatted output strings.
pub trait IssueRenderer {
    /// Renders a single issue into a formatted string.
    fn render(&self, issue: &Issue) -> String;
}

/// Renders issues in a rustc-style terminal format.
///
/// Produces output like:
/// ```text
/// error[E001]: unclosed delimiter '{'
///   --> src/a.ts:3:14 (type-check)
///    |
///  3 | function f() {
///    |              ^
/// ```
///
/// The source excerpt is only shown when a project root is set and the file
/// can be read.
pub struct TerminalRenderer {
    /// Whether to use ANSI color codes in output.
    pub color: bool,
    /// Directory that relative issue paths are resolved against.
    pub root: Option<PathBuf>,
}

impl TerminalRenderer {
    /// Creates a new terminal renderer.
    pub fn new(color: bool) -> Self {
        Self { color, root: None }
    }

    /// Resolves source excerpts relative to `root`.
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    fn paint(&self, severity: Severity, text: &str) -> String {
        if !self.color {
            return text.to_string();
        }
        let code = match severity {
            Severity::Error => "31",
            Severity::Warning => "33",
        };
        format!("\x1b[1;{code}m{text}\x1b[0m")
    }

    fn source_line(&self, issue: &Issue) -> Option<String> {
        let root = self.root.as_ref()?;
        let content = std::fs::read_to_string(root.join(issue.file.as_path())).ok()?;
        let index = (issue.line as usize).checked_sub(1)?;
        content.lines().nth(index).map(str::to_string)
    }
}

impl IssueRenderer for TerminalRenderer {
    fn render(&self, issue: &Issue) -> String {
        let mut out = String::new();

        let header = format!("{}[{}]", issue.severity, issue.code);
        out.push_str(&format!(
            "{}: {}\n",
            self.paint(issue.severity, &header),
            issue.message
        ));
        out.push_str(&format!(
            "  --> {}:{}:{} ({})\n",
            issue.file, issue.line, issue.column, issue.source
        ));

        if let Some(line_content) = self.source_line(issue) {
            let line_num = issue.line.to_string();
            let padding = " ".repeat(line_num.len());
            let col_padding = " ".repeat((issue.column as usize).saturating_sub(1));
            out.push_str(&format!("{padding} |\n"));
            out.push_str(&format!("{line_num} | {line_content}\n"));
            out.push_str(&format!(
                "{padding} | {col_padding}{}\n",
                self.paint(issue.severity, "^")
            ));
        }

        out
    }
}
