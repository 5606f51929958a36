//! The per-engine, per-file result cache.

use std::collections::BTreeMap;

use vigil_common::{FileId, FilesChange};

/// Memoized last-known analysis result per file.
///
/// One instance is owned by one engine. Entries survive across cycles until
/// the file shows up in a change set: [`invalidate`](Self::invalidate) drops
/// every changed or deleted file, and the caller re-records the changed ones
/// after analyzing them. Iteration order is file order.
#[derive(Clone, Debug)]
pub struct IncrementalCache<R> {
    entries: BTreeMap<FileId, R>,
}

impl<R> Default for IncrementalCache<R> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<R> IncrementalCache<R> {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes the entries of every changed and deleted file.
    ///
    /// Returns the number of entries removed.
    pub fn invalidate(&mut self, change: &FilesChange) -> usize {
        let before = self.entries.len();
        for file in change.changed_files.iter().chain(&change.deleted_files) {
            self.entries.remove(file);
        }
        before - self.entries.len()
    }

    /// Inserts or replaces the result for `file`.
    pub fn record_result(&mut self, file: FileId, result: R) {
        self.entries.insert(file, result);
    }

    /// Returns the cached result for `file`, if any.
    pub fn get(&self, file: &FileId) -> Option<&R> {
        self.entries.get(file)
    }

    /// Returns `true` if `file` has a cached result.
    pub fn contains(&self, file: &FileId) -> bool {
        self.entries.contains_key(file)
    }

    /// Iterates over cached entries in file order.
    pub fn iter(&self) -> impl Iterator<Item = (&FileId, &R)> {
        self.entries.iter()
    }

    /// Drops every entry. Used before a full run.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of cached files.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<R: Clone> IncrementalCache<R> {
    /// Returns a copy of every cached result, in file order.
    pub fn snapshot(&self) -> Vec<R> {
        self.entries.values().cloned().collect()
    }
}
