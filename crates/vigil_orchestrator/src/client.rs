//! A [`Reporter`] that forwards to a worker process.

use async_trait::async_trait;
use tracing::debug;
use vigil_common::{CancellationToken, FilesChange, Partition};
use vigil_diagnostics::Issue;
use vigil_engine::protocol::{CancelPayload, RunPayload, RunResponse, SeedPayload, CANCEL, RUN, SEED};
use vigil_engine::{AnalysisError, PartitionableReporter, Reporter};

use crate::worker::{WorkerCommand, WorkerHandle};

/// Drives one engine running in a worker process.
///
/// When the cycle's token is cancelled while a run is outstanding, a
/// `cancel` notification is sent so the worker stops between files; the
/// run then settles with the worker's answer.
pub struct RpcReporter {
    worker: WorkerHandle,
}

impl RpcReporter {
    /// Creates a reporter whose worker is started with `command`.
    pub fn new(name: impl Into<String>, command: WorkerCommand) -> Self {
        Self {
            worker: WorkerHandle::new(name, command),
        }
    }

    /// Returns the underlying worker.
    pub fn worker(&self) -> &WorkerHandle {
        &self.worker
    }

    async fn run(
        &self,
        payload: RunPayload,
        token: &CancellationToken,
    ) -> Result<Vec<Issue>, AnalysisError> {
        let call = self.worker.request::<_, RunResponse>(RUN, &payload);
        tokio::pin!(call);
        tokio::select! {
            outcome = &mut call => outcome,
            _ = token.cancelled() => {
                debug!(worker = self.worker.name(), token = token.id(), "forwarding cancellation");
                if let Err(e) = self.worker.notify(CANCEL, &CancelPayload { token: token.id() }) {
                    debug!(worker = self.worker.name(), error = %e, "cancel not delivered");
                }
                call.await
            }
        }
    }
}

#[async_trait]
impl Reporter for RpcReporter {
    fn name(&self) -> &str {
        self.worker.name()
    }

    async fn connect(&self) -> Result<(), AnalysisError> {
        self.worker.connect().await
    }

    async fn get_report(
        &self,
        change: FilesChange,
        token: CancellationToken,
    ) -> Result<Vec<Issue>, AnalysisError> {
        let payload = RunPayload {
            change: Some(change),
            partition: None,
            cancellation: token.to_payload(),
        };
        self.run(payload, &token).await
    }

    async fn disconnect(&self) -> Result<(), AnalysisError> {
        self.worker.disconnect().await
    }
}

#[async_trait]
impl PartitionableReporter for RpcReporter {
    async fn get_partitioned_report(
        &self,
        partition: Partition,
        token: CancellationToken,
    ) -> Result<Vec<Issue>, AnalysisError> {
        let payload = RunPayload {
            change: None,
            partition: Some(partition),
            cancellation: token.to_payload(),
        };
        self.run(payload, &token).await
    }

    async fn seed(&self, issues: Vec<Issue>) -> Result<(), AnalysisError> {
        self.worker.request(SEED, &SeedPayload { issues }).await
    }
}
