//! Lint engine that manages rule registration, configuration, and execution.
//!
//! The `LintEngine` takes the engine's `allow` and `deny` lists to control
//! which rules are suppressed or promoted, then runs each enabled rule over
//! a file's content.

use std::collections::HashSet;

use vigil_common::FileId;
use vigil_config::EngineConfig;
use vigil_diagnostics::{Issue, IssueSource, Severity};

use crate::engine::AnalysisEngine;
use crate::error::AnalysisError;
use crate::lint::rules::register_builtin_rules;
use crate::lint::LintRule;

/// The engine that runs lint rules on a file.
///
/// Rules are registered at construction time. Rules listed in `allow` are
/// skipped, rules listed in `deny` report errors, and the rest report at
/// their default severity.
pub struct LintEngine {
    rules: Vec<Box<dyn LintRule>>,
    denied: HashSet<String>,
    allowed: HashSet<String>,
}

impl LintEngine {
    /// Creates a lint engine configured by the given engine settings.
    ///
    /// All builtin rules are registered automatically.
    pub fn new(config: &EngineConfig) -> Self {
        let mut engine = Self {
            rules: Vec::new(),
            denied: config.deny.iter().cloned().collect(),
            allowed: config.allow.iter().cloned().collect(),
        };
        register_builtin_rules(&mut engine, config);
        engine
    }

    /// Creates a lint engine with default settings.
    pub fn with_defaults() -> Self {
        Self::new(&EngineConfig::default())
    }

    /// Registers a lint rule with the engine.
    pub fn register(&mut self, rule: Box<dyn LintRule>) {
        self.rules.push(rule);
    }

    /// Returns the number of registered rules.
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Returns the names of all registered rules.
    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name()).collect()
    }

    fn severity_for(&self, rule: &dyn LintRule) -> Severity {
        if self.denied.contains(rule.name()) {
            Severity::Error
        } else {
            rule.default_severity()
        }
    }
}

impl AnalysisEngine for LintEngine {
    fn name(&self) -> &str {
        "lint"
    }

    fn source(&self) -> IssueSource {
        IssueSource::Lint
    }

    fn analyze_file(&self, file: &FileId, content: &str) -> Result<Vec<Issue>, AnalysisError> {
        let mut issues = Vec::new();
        for rule in &self.rules {
            if self.allowed.contains(rule.name()) {
                continue;
            }
            let severity = self.severity_for(rule.as_ref());
            issues.extend(rule.check_file(content).into_iter().map(|v| {
                Issue::warning(
                    IssueSource::Lint,
                    file.clone(),
                    v.line,
                    v.column,
                    rule.name(),
                    v.message,
                )
                .with_severity(severity)
            }));
        }
        Ok(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lint::Violation;

    struct DummyRule;
    impl LintRule for DummyRule {
        fn name(&self) -> &str {
            "dummy-rule"
        }
        fn description(&self) -> &str {
            "a test rule"
        }
        fn default_severity(&self) -> Severity {
            Severity::Warning
        }
        fn check_file(&self, _content: &str) -> Vec<Violation> {
            vec![Violation {
                line: 1,
                column: 1,
                message: "dummy warning".into(),
            }]
        }
    }

    fn run(engine: &LintEngine, content: &str) -> Vec<Issue> {
        engine.analyze_file(&FileId::from("a.ts"), content).unwrap()
    }

    #[test]
    fn engine_registers_builtin_rules() {
        let engine = LintEngine::with_defaults();
        assert_eq!(engine.rule_count(), 3);
        assert_eq!(
            engine.rule_names(),
            vec!["trailing-whitespace", "max-line-length", "no-tabs"]
        );
    }

    #[test]
    fn engine_custom_rule() {
        let mut engine = LintEngine::with_defaults();
        engine.register(Box::new(DummyRule));
        let issues = run(&engine, "clean\n");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, "dummy-rule");
        assert_eq!(issues[0].severity, Severity::Warning);
        assert_eq!(issues[0].source, IssueSource::Lint);
    }

    #[test]
    fn allow_suppresses_rule() {
        let config = EngineConfig {
            allow: vec!["trailing-whitespace".into()],
            ..EngineConfig::default()
        };
        let engine = LintEngine::new(&config);
        assert!(run(&engine, "let a = 1;  \n").is_empty());
    }

    #[test]
    fn deny_promotes_to_error() {
        let config = EngineConfig {
            deny: vec!["no-tabs".into()],
            ..EngineConfig::default()
        };
        let engine = LintEngine::new(&config);
        let issues = run(&engine, "\tlet a = 1;\n");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, "no-tabs");
        assert_eq!(issues[0].severity, Severity::Error);
    }

    #[test]
    fn max_line_length_follows_config() {
        let config = EngineConfig {
            max_line_length: 10,
            ..EngineConfig::default()
        };
        let engine = LintEngine::new(&config);
        let issues = run(&engine, "short\nthis line is too long\n");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, "max-line-length");
        assert_eq!((issues[0].line, issues[0].column), (2, 11));
    }
}
