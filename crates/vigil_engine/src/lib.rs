//! Analysis engines and the reporters that run them incrementally.
//!
//! An [`AnalysisEngine`] analyzes one file at a time. An
//! [`IncrementalReporter`] drives an engine over a file selection, caching
//! per-file results between cycles and honoring cooperative cancellation.
//! [`WorkerService`] exposes a reporter over RPC from inside a worker
//! process; the orchestrator talks to every engine through the [`Reporter`]
//! trait, whether it runs in-process or in a worker.
//!
//! # Built-in engines
//!
//! - **check** (`type-check` issues): delimiter balance
//! - **lint** (`lint` issues): trailing whitespace, line length, tab indentation

#![warn(missing_docs)]

pub mod check;
pub mod engine;
pub mod error;
pub mod factory;
pub mod incremental;
pub mod lint;
pub mod protocol;
pub mod reporter;
pub mod service;

pub use check::CheckEngine;
pub use engine::AnalysisEngine;
pub use error::AnalysisError;
pub use factory::{build_engine, build_reporter};
pub use incremental::IncrementalReporter;
pub use lint::{LintEngine, LintRule, Violation};
pub use reporter::{PartitionableReporter, Reporter};
pub use service::WorkerService;
