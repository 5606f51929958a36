//! no-tabs: tab characters in indentation.

use vigil_diagnostics::Severity;

use crate::lint::{LintRule, Violation};

/// Detects tabs in a line's leading whitespace.
///
/// Tabs after the first non-whitespace character are left to
/// `trailing-whitespace` or ignored.
pub struct NoTabs;

impl LintRule for NoTabs {
    fn name(&self) -> &str {
        "no-tabs"
    }

    fn description(&self) -> &str {
        "tab character used for indentation"
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check_file(&self, content: &str) -> Vec<Violation> {
        content
            .lines()
            .enumerate()
            .filter_map(|(index, line)| {
                let indent = line
                    .chars()
                    .take_while(|c| *c == ' ' || *c == '\t')
                    .collect::<Vec<_>>();
                indent.iter().position(|c| *c == '\t').map(|pos| Violation {
                    line: index as u32 + 1,
                    column: pos as u32 + 1,
                    message: "tab character used for indentation".to_string(),
                })
            })
            .collect()
    }
}
