//! Splitting an engine's cold full run across several reporters.

use async_trait::async_trait;
use futures::future::join_all;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use vigil_common::{CancellationToken, FilesChange, Partition};
use vigil_diagnostics::{sort_issues, Issue};
use vigil_engine::{AnalysisError, PartitionableReporter, Reporter};

/// One engine backed by several reporters.
///
/// The first cycle runs every reporter on its own [`Partition`] of the file
/// set in parallel. The first reporter (the primary) is then seeded with
/// the others' issues and the rest are disconnected; later cycles are
/// incremental and go to the primary alone.
pub struct PartitionedReporter<R> {
    name: String,
    workers: Vec<R>,
    full_done: Mutex<bool>,
}

impl<R: PartitionableReporter> PartitionedReporter<R> {
    /// Creates a pool over `workers`. The first one becomes the primary.
    pub fn new(name: impl Into<String>, workers: Vec<R>) -> Self {
        Self {
            name: name.into(),
            workers,
            full_done: Mutex::new(false),
        }
    }

    /// Returns the number of reporters in the pool.
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// Returns `true` when the pool has no reporters.
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    fn primary(&self) -> Result<&R, AnalysisError> {
        self.workers
            .first()
            .ok_or_else(|| AnalysisError::Configuration(format!("engine '{}' has no workers", self.name)))
    }

    async fn full_run(&self, token: &CancellationToken) -> Result<Vec<Issue>, AnalysisError> {
        let count = self.workers.len();
        info!(engine = %self.name, workers = count, "partitioned full run");

        for outcome in join_all(self.workers.iter().map(|worker| worker.connect())).await {
            outcome?;
        }
        let outcomes = join_all(self.workers.iter().enumerate().map(|(index, worker)| {
            worker.get_partitioned_report(Partition::new(index, count), token.clone())
        }))
        .await;

        let mut shares = Vec::with_capacity(count);
        for outcome in outcomes {
            match outcome {
                Ok(issues) => shares.push(issues),
                Err(_) if token.is_cancellation_requested() => return Err(AnalysisError::Cancelled),
                Err(err) => return Err(err),
            }
        }

        let mut shares = shares.into_iter();
        let mut issues = shares.next().unwrap_or_default();
        let others: Vec<Issue> = shares.flatten().collect();
        self.primary()?.seed(others.clone()).await?;
        for worker in self.workers.iter().skip(1) {
            if let Err(e) = worker.disconnect().await {
                warn!(engine = %self.name, error = %e, "failed to release partition worker");
            }
        }
        debug!(engine = %self.name, seeded = others.len(), "primary seeded");

        issues.extend(others);
        sort_issues(&mut issues);
        Ok(issues)
    }
}

#[async_trait]
impl<R: PartitionableReporter> Reporter for PartitionedReporter<R> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn connect(&self) -> Result<(), AnalysisError> {
        self.primary()?.connect().await
    }

    async fn get_report(
        &self,
        change: FilesChange,
        token: CancellationToken,
    ) -> Result<Vec<Issue>, AnalysisError> {
        let mut full_done = self.full_done.lock().await;
        if *full_done {
            drop(full_done);
            return self.primary()?.get_report(change, token).await;
        }
        token.check()?;
        let issues = self.full_run(&token).await?;
        *full_done = true;
        Ok(issues)
    }

    async fn disconnect(&self) -> Result<(), AnalysisError> {
        let mut first_error = None;
        for worker in &self.workers {
            if let Err(e) = worker.disconnect().await {
                first_error.get_or_insert(e);
            }
        }
        *self.full_done.lock().await = false;
        first_error.map_or(Ok(()), Err)
    }
}
