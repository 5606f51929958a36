//! Per-engine file selection.
//!
//! A [`FileSelection`] decides which project files an engine analyzes. It is
//! used both to discover the initial file set and to filter change sets, so
//! a file outside the selection never reaches an engine.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use vigil_common::FileId;

use crate::error::ConfigError;
use crate::types::{EngineKind, ProjectConfig};

/// The set of files one engine is responsible for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileSelection {
    root: PathBuf,
    include: Vec<PathBuf>,
    exclude: Vec<PathBuf>,
    extensions: Vec<String>,
}

impl FileSelection {
    /// Creates a selection from explicit patterns relative to `root`.
    pub fn new(
        root: impl Into<PathBuf>,
        include: &[String],
        exclude: &[String],
        extensions: &[String],
    ) -> Self {
        Self {
            root: root.into(),
            include: include.iter().map(|p| normalize(Path::new(p))).collect(),
            exclude: exclude.iter().map(|p| normalize(Path::new(p))).collect(),
            extensions: extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_string())
                .collect(),
        }
    }

    /// Builds the selection for one engine, applying its include/exclude overrides.
    pub fn for_engine(config: &ProjectConfig, kind: EngineKind, root: impl Into<PathBuf>) -> Self {
        let engine = config.engines.get(kind);
        let include = engine
            .and_then(|e| e.include.as_deref())
            .unwrap_or(&config.files.include);
        let exclude = engine
            .and_then(|e| e.exclude.as_deref())
            .unwrap_or(&config.files.exclude);
        Self::new(root, include, exclude, &config.files.extensions)
    }

    /// Returns the project root the patterns are relative to.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns `true` if the file at `path` belongs to this selection.
    ///
    /// `path` may be absolute (under the root) or relative to the root.
    pub fn matches(&self, path: &Path) -> bool {
        let relative = path.strip_prefix(&self.root).unwrap_or(path);
        let relative = normalize(relative);
        if relative.is_absolute() || is_hidden(&relative) {
            return false;
        }
        let has_extension = relative
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| self.extensions.iter().any(|x| x == ext));
        has_extension
            && self.include.iter().any(|inc| relative.starts_with(inc))
            && !self.exclude.iter().any(|exc| relative.starts_with(exc))
    }

    /// Returns `true` if the file identified by `file` belongs to this selection.
    pub fn contains(&self, file: &FileId) -> bool {
        self.matches(file.as_path())
    }

    /// Walks the include entries and returns every selected file, in file order.
    ///
    /// Include entries that do not exist are skipped.
    pub fn discover(&self) -> Result<Vec<FileId>, ConfigError> {
        let mut found = BTreeSet::new();
        for include in &self.include {
            let path = self.root.join(include);
            if path.is_dir() {
                self.walk_dir(&path, &mut found)?;
            } else if path.is_file() && self.matches(&path) {
                found.insert(FileId::new(include.clone()));
            }
        }
        Ok(found.into_iter().collect())
    }

    fn walk_dir(&self, dir: &Path, found: &mut BTreeSet<FileId>) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        };
        for entry in std::fs::read_dir(dir).map_err(io_err)? {
            let path = entry.map_err(io_err)?.path();
            let hidden = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with('.'));
            if hidden {
                continue;
            }
            if path.is_dir() {
                self.walk_dir(&path, found)?;
            } else if self.matches(&path) {
                if let Ok(relative) = path.strip_prefix(&self.root) {
                    found.insert(FileId::new(relative));
                }
            }
        }
        Ok(())
    }
}

/// Drops `.` components so `./src` and `src` compare equal.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

fn is_hidden(path: &Path) -> bool {
    path.components().any(|c| match c {
        Component::Normal(name) => name.to_str().is_some_and(|n| n.starts_with('.')),
        _ => false,
    })
}
