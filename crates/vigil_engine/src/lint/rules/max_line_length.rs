//! max-line-length: lines longer than the configured limit.

use vigil_diagnostics::Severity;

use crate::lint::{LintRule, Violation};

/// Detects lines longer than `limit` characters.
pub struct MaxLineLength {
    limit: usize,
}

impl MaxLineLength {
    /// Creates the rule with the given limit.
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }
}

impl LintRule for MaxLineLength {
    fn name(&self) -> &str {
        "max-line-length"
    }

    fn description(&self) -> &str {
        "line exceeds the configured maximum length"
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check_file(&self, content: &str) -> Vec<Violation> {
        content
            .lines()
            .enumerate()
            .filter_map(|(index, line)| {
                let length = line.chars().count();
                (length > self.limit).then(|| Violation {
                    line: index as u32 + 1,
                    column: self.limit as u32 + 1,
                    message: format!(
                        "line is {length} characters long, exceeding the limit of {}",
                        self.limit
                    ),
                })
            })
            .collect()
    }
}
