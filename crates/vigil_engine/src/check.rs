//! The `check` engine: delimiter balance.
//!
//! Reports every `(`, `[` and `{` that is never closed (`E001`), every
//! closing delimiter without an opener (`E002`), and every closing delimiter
//! that does not match the innermost opener (`E003`). String and template
//! literals and comments are skipped.

use vigil_common::FileId;
use vigil_diagnostics::{Issue, IssueSource};

use crate::engine::AnalysisEngine;
use crate::error::AnalysisError;

/// Delimiter-balance checker.
#[derive(Debug, Default)]
pub struct CheckEngine;

impl CheckEngine {
    /// Creates the engine.
    pub fn new() -> Self {
        Self
    }
}

#[derive(Clone, Copy)]
struct Open {
    delim: char,
    line: u32,
    column: u32,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    Code,
    LineComment,
    BlockComment,
    Str(char),
}

fn closer_for(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

impl AnalysisEngine for CheckEngine {
    fn name(&self) -> &str {
        "check"
    }

    fn source(&self) -> IssueSource {
        IssueSource::TypeCheck
    }

    fn analyze_file(&self, file: &FileId, content: &str) -> Result<Vec<Issue>, AnalysisError> {
        let mut issues = Vec::new();
        let mut stack: Vec<Open> = Vec::new();
        let mut mode = Mode::Code;
        let (mut line, mut column) = (1u32, 0u32);
        let mut chars = content.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '\n' {
                line += 1;
                column = 0;
                if mode == Mode::LineComment || matches!(mode, Mode::Str('"' | '\'')) {
                    mode = Mode::Code;
                }
                continue;
            }
            column += 1;

            match mode {
                Mode::LineComment => {}
                Mode::BlockComment => {
                    if c == '*' && chars.peek() == Some(&'/') {
                        chars.next();
                        column += 1;
                        mode = Mode::Code;
                    }
                }
                Mode::Str(quote) => {
                    if c == '\\' {
                        if chars.peek().is_some_and(|next| *next != '\n') {
                            chars.next();
                            column += 1;
                        }
                    } else if c == quote {
                        mode = Mode::Code;
                    }
                }
                Mode::Code => match c {
                    '/' if chars.peek() == Some(&'/') => mode = Mode::LineComment,
                    '/' if chars.peek() == Some(&'*') => {
                        chars.next();
                        column += 1;
                        mode = Mode::BlockComment;
                    }
                    '"' | '\'' | '`' => mode = Mode::Str(c),
                    '(' | '[' | '{' => stack.push(Open {
                        delim: c,
                        line,
                        column,
                    }),
                    ')' | ']' | '}' => match stack.pop() {
                        None => issues.push(Issue::error(
                            IssueSource::TypeCheck,
                            file.clone(),
                            line,
                            column,
                            "E002",
                            format!("unexpected closing delimiter '{c}'"),
                        )),
                        Some(open) if closer_for(open.delim) != c => issues.push(Issue::error(
                            IssueSource::TypeCheck,
                            file.clone(),
                            line,
                            column,
                            "E003",
                            format!(
                                "mismatched closing delimiter: expected '{}' to close '{}' from {}:{}, found '{c}'",
                                closer_for(open.delim),
                                open.delim,
                                open.line,
                                open.column
                            ),
                        )),
                        Some(_) => {}
                    },
                    _ => {}
                },
            }
        }

        issues.extend(stack.into_iter().map(|open| {
            Issue::error(
                IssueSource::TypeCheck,
                file.clone(),
                open.line,
                open.column,
                "E001",
                format!("unclosed delimiter '{}'", open.delim),
            )
        }));
        Ok(issues)
    }
}
