//! Configuration types deserialized from `vigil.toml`.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer};
use std::fmt;

/// Upper bound on workers per engine.
pub const MAX_WORKERS: usize = 64;

/// The top-level project configuration parsed from `vigil.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    /// Project metadata.
    pub project: ProjectMeta,
    /// Which files are analyzed.
    #[serde(default)]
    pub files: FilesConfig,
    /// Watch-mode settings.
    #[serde(default)]
    pub watch: WatchConfig,
    /// Per-engine settings.
    #[serde(default)]
    pub engines: EnginesConfig,
    /// Which issues are published.
    #[serde(default)]
    pub issues: IssuesConfig,
}

impl ProjectConfig {
    /// Returns the enabled engines in engine order (type-check first, then lint).
    pub fn enabled_engines(&self) -> Vec<(EngineKind, &EngineConfig)> {
        EngineKind::ALL
            .iter()
            .filter_map(|kind| {
                self.engines
                    .get(*kind)
                    .filter(|engine| engine.enabled)
                    .map(|engine| (*kind, engine))
            })
            .collect()
    }
}

/// Core project metadata.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectMeta {
    /// The project name.
    pub name: String,
    /// A brief description of the project.
    #[serde(default)]
    pub description: String,
}

/// Global file selection shared by all engines.
///
/// Patterns are paths relative to the project root. A file is selected when
/// it lies under one of the `include` directories (or is one of the listed
/// files), is not under any `exclude` entry, and has one of the `extensions`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    /// Directories or files to analyze.
    #[serde(deserialize_with = "deserialize_string_or_vec")]
    pub include: Vec<String>,
    /// Directories or files to skip.
    #[serde(deserialize_with = "deserialize_string_or_vec")]
    pub exclude: Vec<String>,
    /// File extensions to analyze, without the leading dot.
    #[serde(deserialize_with = "deserialize_string_or_vec")]
    pub extensions: Vec<String>,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            include: vec!["src".to_string()],
            exclude: Vec::new(),
            extensions: ["js", "jsx", "ts", "tsx"].map(String::from).to_vec(),
        }
    }
}

/// Watch-mode settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// How often the file set is re-hashed to detect changes.
    pub poll_interval_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
        }
    }
}

/// The `[issues]` table: a filter applied to every resolved report.
///
/// Paths are prefixes relative to the project root, matched per component
/// (`src/gen` covers `src/gen/a.ts` but not `src/generated.ts`).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IssuesConfig {
    /// Only publish issues in files under these paths; empty means everywhere.
    #[serde(deserialize_with = "deserialize_string_or_vec")]
    pub include: Vec<String>,
    /// Never publish issues in files under these paths.
    #[serde(deserialize_with = "deserialize_string_or_vec")]
    pub exclude: Vec<String>,
    /// Never publish issues with these codes.
    #[serde(deserialize_with = "deserialize_string_or_vec")]
    pub exclude_codes: Vec<String>,
    /// Least severe issue to publish, `"warning"` or `"error"`.
    pub min_severity: Option<String>,
}

/// Names accepted by `issues.min_severity`.
pub const SEVERITY_NAMES: [&str; 2] = ["warning", "error"];

/// The built-in analysis engines.
///
/// Declaration order is engine order: issues of `Check` are presented
/// before issues of `Lint`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EngineKind {
    /// The delimiter-balance checker (type-check family).
    Check,
    /// The line-based linter (lint family).
    Lint,
}

impl EngineKind {
    /// All engines in engine order.
    pub const ALL: [EngineKind; 2] = [EngineKind::Check, EngineKind::Lint];

    /// Returns the configuration and command-line name of the engine.
    pub fn name(self) -> &'static str {
        match self {
            EngineKind::Check => "check",
            EngineKind::Lint => "lint",
        }
    }

    /// Parses an engine name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The `[engines]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnginesConfig {
    /// Settings for the `check` engine; absent means disabled.
    pub check: Option<EngineConfig>,
    /// Settings for the `lint` engine; absent means disabled.
    pub lint: Option<EngineConfig>,
}

impl EnginesConfig {
    /// Returns the settings for one engine, if configured.
    pub fn get(&self, kind: EngineKind) -> Option<&EngineConfig> {
        match kind {
            EngineKind::Check => self.check.as_ref(),
            EngineKind::Lint => self.lint.as_ref(),
        }
    }
}

/// Settings for a single engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Whether the engine runs at all.
    pub enabled: bool,
    /// Number of worker processes used for the initial full run.
    pub workers: usize,
    /// Overrides `files.include` for this engine.
    #[serde(deserialize_with = "deserialize_optional_string_or_vec")]
    pub include: Option<Vec<String>>,
    /// Overrides `files.exclude` for this engine.
    #[serde(deserialize_with = "deserialize_optional_string_or_vec")]
    pub exclude: Option<Vec<String>>,
    /// Rule names to suppress.
    pub allow: Vec<String>,
    /// Rule names to promote to errors.
    pub deny: Vec<String>,
    /// Longest allowed line, in characters.
    pub max_line_length: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            workers: 1,
            include: None,
            exclude: None,
            allow: Vec::new(),
            deny: Vec::new(),
            max_line_length: 120,
        }
    }
}

/// Deserializes a field that can be either a single string or a list of strings.
///
/// Allows TOML config to accept both `include = "src"` (string) and
/// `include = ["src", "lib"]` (array of strings).
fn deserialize_string_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct StringOrVec;

    impl<'de> Visitor<'de> for StringOrVec {
        type Value = Vec<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
            formatter.write_str("a string or a list of strings")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            Ok(vec![v.to_string()])
        }

        fn visit_seq<A: de::SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            let mut vec = Vec::new();
            while let Some(val) = seq.next_element::<String>()? {
                vec.push(val);
            }
            Ok(vec)
        }
    }

    deserializer.deserialize_any(StringOrVec)
}

fn deserialize_optional_string_or_vec<'de, D>(
    deserializer: D,
) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    deserialize_string_or_vec(deserializer).map(Some)
}
