//! trailing-whitespace: spaces or tabs before a line break.

use vigil_diagnostics::Severity;

use crate::lint::{LintRule, Violation};

/// Detects whitespace at the end of a line.
pub struct TrailingWhitespace;

impl LintRule for TrailingWhitespace {
    fn name(&self) -> &str {
        "trailing-whitespace"
    }

    fn description(&self) -> &str {
        "whitespace at the end of a line"
    }

    fn default_severity(&self) -> Severity {
        Severity::Warning
    }

    fn check_file(&self, content: &str) -> Vec<Violation> {
        content
            .lines()
            .enumerate()
            .filter_map(|(index, line)| {
                let trimmed = line.trim_end_matches([' ', '\t']);
                (trimmed.len() != line.len()).then(|| Violation {
                    line: index as u32 + 1,
                    column: trimmed.chars().count() as u32 + 1,
                    message: "trailing whitespace".to_string(),
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_column_of_first_trailing_char() {
        let v = TrailingWhitespace.check_file("ok\nlet a = 1; \t\n");
        assert_eq!(v.len(), 1);
        assert_eq!((v[0].line, v[0].column), (2, 11));
    }

    #[test]
    fn handles_crlf_line_endings() {
        assert!(TrailingWhitespace.check_file("a\r\nb\r\n").is_empty());
    }

    #[test]
    fn whitespace_only_line() {
        let v = TrailingWhitespace.check_file("a\n   \nb");
        assert_eq!((v[0].line, v[0].column), (2, 1));
    }
}
