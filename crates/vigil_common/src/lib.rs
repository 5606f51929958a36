//! Shared foundational types used across the Vigil analysis orchestrator.
//!
//! This crate provides file identifiers, file-change sets and their
//! accumulator, the cooperative cancellation token that crosses the worker
//! process boundary, and the index-modulo work partitioner.

#![warn(missing_docs)]

pub mod cancellation;
pub mod change;
pub mod file_id;
pub mod panic;
pub mod partition;

pub use cancellation::{CancellationPayload, CancellationToken, Cancelled};
pub use change::{ChangeAccumulator, FilesChange};
pub use file_id::FileId;
pub use panic::panic_message;
pub use partition::{partition, Partition};
