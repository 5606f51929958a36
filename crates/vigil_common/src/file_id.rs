//! Path-based identifier for source files under analysis.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Identifies a source file by its path.
///
/// File order (the order used when presenting issues and when partitioning
/// work) is the lexicographic order of the underlying paths.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(PathBuf);

impl FileId {
    /// Creates a `FileId` from anything convertible into a path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Returns the path this identifier refers to.
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Consumes the identifier and returns the owned path.
    pub fn into_path(self) -> PathBuf {
        self.0
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl From<PathBuf> for FileId {
    fn from(path: PathBuf) -> Self {
        Self(path)
    }
}

impl From<&Path> for FileId {
    fn from(path: &Path) -> Self {
        Self(path.to_path_buf())
    }
}

impl From<&str> for FileId {
    fn from(path: &str) -> Self {
        Self(PathBuf::from(path))
    }
}

impl AsRef<Path> for FileId {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}
