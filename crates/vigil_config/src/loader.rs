//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::{ProjectConfig, MAX_WORKERS, SEVERITY_NAMES};
use std::path::Path;

/// Name of the configuration file looked up in a project directory.
pub const CONFIG_FILE_NAME: &str = "vigil.toml";

/// Loads and validates `vigil.toml` from a project directory.
pub fn load_config(project_dir: &Path) -> Result<ProjectConfig, ConfigError> {
    load_config_file(&project_dir.join(CONFIG_FILE_NAME))
}

/// Loads and validates a configuration file at an explicit path.
pub fn load_config_file(path: &Path) -> Result<ProjectConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_config_from_str(&content)
}

/// Parses and validates a configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<ProjectConfig, ConfigError> {
    let config: ProjectConfig =
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that required fields are present and values are consistent.
fn validate_config(config: &ProjectConfig) -> Result<(), ConfigError> {
    if config.project.name.is_empty() {
        return Err(ConfigError::MissingField("project.name".to_string()));
    }
    if config.files.include.is_empty() {
        return Err(ConfigError::MissingField("files.include".to_string()));
    }
    if config.files.extensions.is_empty() {
        return Err(ConfigError::MissingField("files.extensions".to_string()));
    }

    if let Some(severity) = &config.issues.min_severity {
        if !SEVERITY_NAMES.contains(&severity.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "issues.min_severity must be one of {}, got '{severity}'",
                SEVERITY_NAMES.join(", ")
            )));
        }
    }

    let engines = config.enabled_engines();
    if engines.is_empty() {
        return Err(ConfigError::ValidationError(
            "no analysis engine is enabled".to_string(),
        ));
    }
    for (kind, engine) in engines {
        if engine.workers == 0 || engine.workers > MAX_WORKERS {
            return Err(ConfigError::ValidationError(format!(
                "engines.{kind}.workers must be between 1 and {MAX_WORKERS}, got {}",
                engine.workers
            )));
        }
        if engine.include.as_ref().is_some_and(Vec::is_empty) {
            return Err(ConfigError::ValidationError(format!(
                "engines.{kind}.include must not be empty"
            )));
        }
        if engine.max_line_length == 0 {
            return Err(ConfigError::ValidationError(format!(
                "engines.{kind}.max_line_length must be positive"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EngineKind;

    #[test]
    fn parse_minimal_config() {
        let toml = r#"
[project]
name = "demo"

[engines.lint]
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.project.name, "demo");
        assert_eq!(config.files.include, vec!["src"]);
        assert_eq!(config.watch.poll_interval_ms, 500);
        let engines = config.enabled_engines();
        assert_eq!(engines.len(), 1);
        assert_eq!(engines[0].0, EngineKind::Lint);
    }

    #[test]
    fn parse_full_config() {
        let toml = r#"
[project]
name = "demo"
description = "sample project"

[files]
include = ["src", "lib"]
exclude = "src/generated"
extensions = ["ts"]

[watch]
poll_interval_ms = 250

[engines.check]
workers = 4
include = "src"

[engines.lint]
max_line_length = 100
deny = ["no-tabs"]
allow = ["trailing-whitespace"]
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.files.include, vec!["src", "lib"]);
        assert_eq!(config.files.exclude, vec!["src/generated"]);
        assert_eq!(config.watch.poll_interval_ms, 250);

        let engines = config.enabled_engines();
        assert_eq!(engines[0].0, EngineKind::Check);
        assert_eq!(engines[0].1.workers, 4);
        assert_eq!(engines[0].1.include.as_deref(), Some(&["src".to_string()][..]));
        assert_eq!(engines[1].0, EngineKind::Lint);
        assert_eq!(engines[1].1.max_line_length, 100);
        assert_eq!(engines[1].1.deny, vec!["no-tabs"]);
    }

    #[test]
    fn disabled_engine_is_skipped() {
        let toml = r#"
[project]
name = "demo"

[engines.check]
enabled = false

[engines.lint]
"#;
        let config = load_config_from_str(toml).unwrap();
        let kinds: Vec<_> = config.enabled_engines().iter().map(|(k, _)| *k).collect();
        assert_eq!(kinds, vec![EngineKind::Lint]);
    }

    #[test]
    fn missing_name_errors() {
        let toml = r#"
[project]
name = ""

[engines.lint]
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn no_engine_errors() {
        let toml = r#"
[project]
name = "demo"
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn zero_workers_errors() {
        let toml = r#"
[project]
name = "demo"

[engines.check]
workers = 0
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(err.to_string().contains("workers"));
    }

    #[test]
    fn unknown_engine_errors() {
        let toml = r#"
[project]
name = "demo"

[engines.tslint]
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn empty_extensions_errors() {
        let toml = r#"
[project]
name = "demo"

[files]
extensions = []

[engines.lint]
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::MissingField(_)));
    }

    #[test]
    fn parse_issue_filter() {
        let toml = r#"
[project]
name = "demo"

[engines.check]

[issues]
exclude = "src/generated"
exclude_codes = ["E003", "no-tabs"]
min_severity = "error"
"#;
        let config = load_config_from_str(toml).unwrap();
        assert!(config.issues.include.is_empty());
        assert_eq!(config.issues.exclude, vec!["src/generated"]);
        assert_eq!(config.issues.exclude_codes, vec!["E003", "no-tabs"]);
        assert_eq!(config.issues.min_severity.as_deref(), Some("error"));
    }

    #[test]
    fn unknown_min_severity_is_rejected() {
        let toml = "[project]\nname = \"demo\"\n\n[engines.check]\n\n[issues]\nmin_severity = \"fatal\"\n";
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(ref m) if m.contains("min_severity")));
    }

    #[test]
    fn invalid_toml_errors() {
        let err = load_config_from_str("this is not valid toml {{{}}}").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn unreachable_file_fails_fast() {
        let err = load_config(Path::new("/nonexistent/dir")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn load_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "[project]\nname = \"disk\"\n\n[engines.check]\n",
        )
        .unwrap();
        let config = load_config(dir.path()).unwrap();
        assert_eq!(config.project.name, "disk");
    }
}
