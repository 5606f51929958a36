//! Incremental analysis orchestration for Vigil.
//!
//! The [`Orchestrator`] owns one [`Reporter`](vigil_engine::Reporter) per
//! engine and turns host triggers into analysis cycles. Only the latest
//! cycle's [`Report`] is ever published; earlier ones are cancelled and
//! their late results discarded.
//!
//! Engines either run in-process or in `vigil worker` processes managed by
//! a [`WorkerHandle`] and reached through an [`RpcReporter`]. An engine
//! configured with several workers splits its cold full run across a
//! [`PartitionedReporter`].

#![warn(missing_docs)]

pub mod client;
pub mod error;
pub mod factory;
pub mod filter;
pub mod lifecycle;
pub mod pool;
pub mod worker;

pub use client::RpcReporter;
pub use error::CycleError;
pub use factory::{build_reporters, Placement};
pub use filter::IssueFilter;
pub use lifecycle::{
    LifecycleState, Orchestrator, Report, ReportId, ReportState, ResultSink, Trigger,
};
pub use pool::PartitionedReporter;
pub use worker::{WorkerCommand, WorkerHandle};
