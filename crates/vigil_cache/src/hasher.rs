//! Source file hashing and change detection.
//!
//! Computes content hashes for the selected project files and compares two
//! snapshots to identify which files are new, modified, deleted, or
//! unchanged since the previous poll.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use vigil_common::{FileId, FilesChange};

use crate::error::CacheError;

/// A 128-bit content hash computed using XXH3.
///
/// Two files with the same `ContentHash` are assumed to have identical content.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash([u8; 16]);

impl ContentHash {
    /// Computes a content hash from a byte slice using XXH3-128.
    pub fn from_bytes(data: &[u8]) -> Self {
        Self(xxhash_rust::xxh3::xxh3_128(data).to_le_bytes())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({:02x}{:02x}..)", self.0[0], self.0[1])
    }
}

/// Content hashes of a set of project files, keyed in file order.
pub type HashSnapshot = BTreeMap<FileId, ContentHash>;

/// Result of comparing a fresh snapshot against the previous one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Files absent from the previous snapshot.
    pub new_files: Vec<FileId>,
    /// Files whose content hash differs from the previous snapshot.
    pub modified_files: Vec<FileId>,
    /// Files present in the previous snapshot but gone now.
    pub deleted_files: Vec<FileId>,
    /// Files whose content hash did not change.
    pub unchanged_files: Vec<FileId>,
}

impl ChangeSet {
    /// Returns `true` if there are no new, modified, or deleted files.
    pub fn is_empty(&self) -> bool {
        self.new_files.is_empty() && self.modified_files.is_empty() && self.deleted_files.is_empty()
    }

    /// Returns the number of files that need reanalysis (new + modified).
    pub fn dirty_count(&self) -> usize {
        self.new_files.len() + self.modified_files.len()
    }

    /// Converts into the change set handed to the orchestrator.
    pub fn into_files_change(self) -> FilesChange {
        FilesChange::new()
            .with_changed(self.new_files.into_iter().chain(self.modified_files))
            .with_deleted(self.deleted_files)
    }
}

/// Computes content hashes of source files and diffs snapshots.
pub struct SourceHasher;

impl SourceHasher {
    /// Reads a file and returns its XXH3-128 content hash.
    pub fn hash_file(path: &Path) -> Result<ContentHash, CacheError> {
        let content = std::fs::read(path).map_err(|e| CacheError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Ok(ContentHash::from_bytes(&content))
    }

    /// Hashes every file (relative to `root`) into a snapshot.
    ///
    /// Files that cannot be read are skipped, so a file removed between
    /// discovery and hashing shows up as deleted in the next diff.
    pub fn hash_files(root: &Path, files: &[FileId]) -> HashSnapshot {
        files
            .iter()
            .filter_map(|file| {
                Self::hash_file(&root.join(file.as_path()))
                    .ok()
                    .map(|hash| (file.clone(), hash))
            })
            .collect()
    }

    /// Compares the current snapshot against the previous one.
    pub fn detect_changes(current: &HashSnapshot, previous: &HashSnapshot) -> ChangeSet {
        let mut changes = ChangeSet::default();
        for (file, hash) in current {
            match previous.get(file) {
                Some(old) if old == hash => changes.unchanged_files.push(file.clone()),
                Some(_) => changes.modified_files.push(file.clone()),
                None => changes.new_files.push(file.clone()),
            }
        }
        changes.deleted_files = previous
            .keys()
            .filter(|file| !current.contains_key(*file))
            .cloned()
            .collect();
        changes
    }
}
