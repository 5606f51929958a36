//! File-change sets and the accumulator that merges them between cycles.
//!
//! A [`FilesChange`] is produced by the environment on every trigger. The
//! [`ChangeAccumulator`] merges consecutive changes until a new check cycle
//! drains them. When a file is both changed and deleted in the same
//! unconsumed buffer, the deletion wins: a file cannot be "changed" after it
//! is gone, and deletions always evict cached results.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::file_id::FileId;

/// A batch of changed and deleted files.
///
/// Sets are ordered by file order and cannot hold duplicates.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilesChange {
    /// Files whose contents changed (or were created).
    #[serde(default)]
    pub changed_files: BTreeSet<FileId>,
    /// Files that were removed.
    #[serde(default)]
    pub deleted_files: BTreeSet<FileId>,
}

impl FilesChange {
    /// Creates an empty change.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds changed files to this change.
    pub fn with_changed<I, F>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<FileId>,
    {
        self.changed_files.extend(files.into_iter().map(Into::into));
        self.normalize();
        self
    }

    /// Adds deleted files to this change.
    pub fn with_deleted<I, F>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<FileId>,
    {
        self.deleted_files.extend(files.into_iter().map(Into::into));
        self.normalize();
        self
    }

    /// Returns `true` if no file changed or was deleted.
    pub fn is_empty(&self) -> bool {
        self.changed_files.is_empty() && self.deleted_files.is_empty()
    }

    /// Returns `true` if the file is mentioned in either set.
    pub fn touches(&self, file: &FileId) -> bool {
        self.changed_files.contains(file) || self.deleted_files.contains(file)
    }

    /// Merges another change into this one, applying the deletion-wins rule.
    pub fn merge(&mut self, other: FilesChange) {
        self.changed_files.extend(other.changed_files);
        self.deleted_files.extend(other.deleted_files);
        self.normalize();
    }

    /// Drops every changed file that is also deleted.
    fn normalize(&mut self) {
        let deleted = &self.deleted_files;
        self.changed_files.retain(|file| !deleted.contains(file));
    }
}

/// Buffers file changes between consecutive check cycles.
#[derive(Debug, Default)]
pub struct ChangeAccumulator {
    pending: FilesChange,
}

impl ChangeAccumulator {
    /// Creates an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges a new change into the pending buffer.
    pub fn accumulate(&mut self, change: FilesChange) {
        self.pending.merge(change);
    }

    /// Returns and clears the pending buffer.
    pub fn drain(&mut self) -> FilesChange {
        std::mem::take(&mut self.pending)
    }

    /// Returns the pending buffer without consuming it.
    pub fn pending(&self) -> &FilesChange {
        &self.pending
    }

    /// Returns `true` if nothing is waiting to be consumed.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
