//! The reporter contract the orchestrator drives.

use async_trait::async_trait;
use vigil_common::{CancellationToken, FilesChange, Partition};
use vigil_diagnostics::Issue;

use crate::error::AnalysisError;

/// One engine as seen by the orchestrator.
///
/// A reporter may run in-process or forward to a worker process. Every
/// cycle calls [`connect`](Self::connect) and then
/// [`get_report`](Self::get_report) with the changes accumulated since the
/// previous cycle.
#[async_trait]
pub trait Reporter: Send + Sync {
    /// Name of the engine behind this reporter.
    fn name(&self) -> &str;

    /// Makes the reporter ready. Idempotent.
    async fn connect(&self) -> Result<(), AnalysisError>;

    /// Produces the full issue list for the current file set.
    ///
    /// Resolves with [`AnalysisError::Cancelled`] when `token` was signalled
    /// before the work finished.
    async fn get_report(
        &self,
        change: FilesChange,
        token: CancellationToken,
    ) -> Result<Vec<Issue>, AnalysisError>;

    /// Releases the reporter's resources.
    async fn disconnect(&self) -> Result<(), AnalysisError> {
        Ok(())
    }
}

/// A reporter that can split its cold full run across several instances.
///
/// Each instance analyzes one [`Partition`] of the file set; one of them is
/// then seeded with the others' issues so it can continue incrementally on
/// its own.
#[async_trait]
pub trait PartitionableReporter: Reporter {
    /// Runs a full analysis of one share of the file set, from scratch.
    async fn get_partitioned_report(
        &self,
        partition: Partition,
        token: CancellationToken,
    ) -> Result<Vec<Issue>, AnalysisError>;

    /// Caches issues analyzed by another instance as if produced here.
    async fn seed(&self, issues: Vec<Issue>) -> Result<(), AnalysisError>;
}
