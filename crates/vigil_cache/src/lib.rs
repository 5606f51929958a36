//! Per-engine incremental result caching and source change detection.
//!
//! [`IncrementalCache`] memoizes the last analysis result of every file an
//! engine has seen, so later cycles only recompute files named in a
//! [`FilesChange`](vigil_common::FilesChange). [`SourceHasher`] turns two
//! content-hash snapshots of the project into such a change set, which is how
//! watch mode detects edits without a platform file watcher.

#![warn(missing_docs)]

pub mod cache;
pub mod error;
pub mod hasher;

pub use cache::IncrementalCache;
pub use error::CacheError;
pub use hasher::{ChangeSet, ContentHash, HashSnapshot, SourceHasher};
