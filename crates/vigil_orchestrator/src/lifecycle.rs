//! The report lifecycle: at most one current report.
//!
//! Every trigger starts a new cycle on all reporters and makes its
//! [`Report`] current; the previous cycle's token is cancelled. Reports are
//! tagged with a monotonically increasing [`ReportId`] and compared with
//! the current id when they settle, so a superseded cycle never reaches
//! the [`ResultSink`], whatever order the cycles finish in.
//!
//! Cycles reach their reporters in trigger order: each cycle waits until the
//! previous one has handed its change to every reporter before starting its
//! own calls. A panicking reporter fails its cycle like any engine error.

use std::panic::AssertUnwindSafe;
use std::pin::pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::Poll;

use futures::future::join_all;
use futures::FutureExt;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use vigil_common::{panic_message, CancellationToken, ChangeAccumulator, FilesChange};
use vigil_diagnostics::Issue;
use vigil_engine::{AnalysisError, Reporter};

use crate::error::CycleError;
use crate::filter::IssueFilter;

/// Identifies one analysis cycle. Later cycles have larger ids.
pub type ReportId = u64;

/// An event from the host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Trigger {
    /// The first run after startup.
    Initial,
    /// Files changed since the previous trigger.
    Incremental(FilesChange),
    /// The host is shutting down.
    Teardown,
}

/// How a cycle is going.
#[derive(Clone, Debug)]
pub enum ReportState {
    /// At least one reporter has not settled yet.
    Running,
    /// Every reporter answered; issues in engine order, after the
    /// orchestrator's [`IssueFilter`].
    Resolved(Arc<[Issue]>),
    /// The cycle was superseded or torn down.
    Cancelled,
    /// An engine failed.
    Errored(CycleError),
}

impl ReportState {
    fn is_settled(&self) -> bool {
        !matches!(self, ReportState::Running)
    }
}

/// The state of the current report, as seen by [`Orchestrator::status`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    /// No cycle was triggered yet.
    Idle,
    /// The current cycle is running.
    Running,
    /// The current cycle resolved.
    Resolved,
    /// The current cycle was cancelled.
    Cancelled,
    /// The current cycle failed.
    Errored,
}

impl From<&ReportState> for LifecycleState {
    fn from(state: &ReportState) -> Self {
        match state {
            ReportState::Running => LifecycleState::Running,
            ReportState::Resolved(_) => LifecycleState::Resolved,
            ReportState::Cancelled => LifecycleState::Cancelled,
            ReportState::Errored(_) => LifecycleState::Errored,
        }
    }
}

/// Receives the outcome of current reports.
pub trait ResultSink: Send + Sync {
    /// The current report is still running.
    fn waiting(&self) {}

    /// The current report resolved.
    fn resolved(&self, issues: &[Issue]);

    /// The current report was cancelled.
    fn cancelled(&self);

    /// The current report failed.
    fn errored(&self, error: &CycleError);
}

/// A handle to the eventual outcome of one cycle.
#[derive(Clone, Debug)]
pub struct Report {
    id: ReportId,
    state: watch::Receiver<ReportState>,
    current: Arc<AtomicU64>,
}

impl Report {
    /// Returns this report's id.
    pub fn id(&self) -> ReportId {
        self.id
    }

    /// Returns `true` while no later trigger has superseded this report.
    pub fn is_current(&self) -> bool {
        self.current.load(Ordering::SeqCst) == self.id
    }

    /// Returns the state right now.
    pub fn state(&self) -> ReportState {
        self.state.borrow().clone()
    }

    /// Waits until the cycle settles.
    ///
    /// Returns `None` when the cycle was dropped without settling.
    pub async fn settled(&self) -> Option<ReportState> {
        let mut state = self.state.clone();
        let settled = state.wait_for(ReportState::is_settled).await.ok()?;
        Some(settled.clone())
    }

    /// Publishes this report to `sink` if it is still current once settled.
    ///
    /// A superseded report is discarded without any signal.
    pub async fn deliver(&self, sink: &dyn ResultSink) {
        if !self.is_current() {
            return;
        }
        if !self.state.borrow().is_settled() {
            sink.waiting();
        }
        let Some(state) = self.settled().await else {
            debug!(report = self.id, "report dropped before settling");
            return;
        };
        if !self.is_current() {
            debug!(report = self.id, "discarding stale report");
            return;
        }
        match state {
            ReportState::Resolved(issues) => sink.resolved(&issues),
            ReportState::Cancelled => sink.cancelled(),
            ReportState::Errored(error) => sink.errored(&error),
            ReportState::Running => {}
        }
    }
}

struct Cycle {
    token: CancellationToken,
    report: Report,
    /// Resolves (or drops) once this cycle's reporters have their change.
    started: Option<oneshot::Receiver<()>>,
}

/// Drives every reporter through analysis cycles.
pub struct Orchestrator {
    reporters: Arc<[Arc<dyn Reporter>]>,
    filter: Arc<IssueFilter>,
    accumulator: Mutex<ChangeAccumulator>,
    current_id: Arc<AtomicU64>,
    current: Mutex<Option<Cycle>>,
}

impl Orchestrator {
    /// Creates an orchestrator over `reporters`, in engine order.
    pub fn new(reporters: Vec<Arc<dyn Reporter>>) -> Self {
        Self {
            reporters: reporters.into(),
            filter: Arc::new(IssueFilter::default()),
            accumulator: Mutex::new(ChangeAccumulator::new()),
            current_id: Arc::new(AtomicU64::new(0)),
            current: Mutex::new(None),
        }
    }

    /// Publishes only the resolved issues `filter` matches.
    pub fn with_filter(mut self, filter: IssueFilter) -> Self {
        self.filter = Arc::new(filter);
        self
    }

    /// Names of the reporters, in engine order.
    pub fn engines(&self) -> Vec<&str> {
        self.reporters.iter().map(|r| r.name()).collect()
    }

    /// Starts a new cycle for `change` and makes its report current.
    ///
    /// The previous cycle is cancelled; its report will never be delivered.
    /// The new cycle's reporter calls start only after the previous cycle's
    /// have, so changes reach each reporter in trigger order on any runtime
    /// flavor. Must be called within a tokio runtime.
    pub fn trigger(&self, change: FilesChange) -> Report {
        let change = {
            let mut accumulator = lock(&self.accumulator);
            accumulator.accumulate(change);
            accumulator.drain()
        };

        let id = self.current_id.fetch_add(1, Ordering::SeqCst) + 1;
        let token = CancellationToken::new();
        let (state_tx, state_rx) = watch::channel(ReportState::Running);
        let report = Report {
            id,
            state: state_rx,
            current: Arc::clone(&self.current_id),
        };

        let (started_tx, started_rx) = oneshot::channel();
        let previous = lock(&self.current).replace(Cycle {
            token: token.clone(),
            report: report.clone(),
            started: Some(started_rx),
        });
        let after = previous.and_then(|mut previous| {
            debug!(report = previous.report.id, "superseding report");
            previous.token.request_cancellation();
            previous.started.take()
        });

        info!(
            report = id,
            changed = change.changed_files.len(),
            deleted = change.deleted_files.len(),
            "starting analysis cycle"
        );
        let reporters = Arc::clone(&self.reporters);
        let filter = Arc::clone(&self.filter);
        tokio::spawn(async move {
            if let Some(after) = after {
                let _ = after.await;
            }
            let state = run_cycle(&reporters, &filter, change, &token, started_tx).await;
            debug!(report = id, state = ?LifecycleState::from(&state), "cycle settled");
            let _ = state_tx.send(state);
        });
        report
    }

    /// Returns the current report, if any cycle was triggered.
    pub fn current_report(&self) -> Option<Report> {
        lock(&self.current).as_ref().map(|cycle| cycle.report.clone())
    }

    /// Returns the state of the current report.
    pub fn status(&self) -> LifecycleState {
        match lock(&self.current).as_ref() {
            Some(cycle) => LifecycleState::from(&*cycle.report.state.borrow()),
            None => LifecycleState::Idle,
        }
    }

    /// Cancels the current cycle and disconnects every reporter.
    pub async fn teardown(&self) {
        if let Some(cycle) = lock(&self.current).as_ref() {
            cycle.token.request_cancellation();
        }
        info!("tearing down reporters");
        for reporter in self.reporters.iter() {
            if let Err(e) = reporter.disconnect().await {
                warn!(engine = reporter.name(), error = %e, "failed to disconnect");
            }
        }
    }

    /// Handles host triggers until [`Trigger::Teardown`] or the channel closes.
    ///
    /// Each report is delivered to `sink` as it settles. On exit the
    /// orchestrator is torn down and outstanding deliveries are awaited.
    pub async fn run(&self, mut triggers: mpsc::Receiver<Trigger>, sink: Arc<dyn ResultSink>) {
        let mut deliveries = JoinSet::new();
        while let Some(trigger) = triggers.recv().await {
            let change = match trigger {
                Trigger::Initial => FilesChange::new(),
                Trigger::Incremental(change) => change,
                Trigger::Teardown => break,
            };
            let report = self.trigger(change);
            let sink = Arc::clone(&sink);
            deliveries.spawn(async move { report.deliver(sink.as_ref()).await });
            while deliveries.try_join_next().is_some() {}
        }
        self.teardown().await;
        while deliveries.join_next().await.is_some() {}
    }
}

/// Runs one cycle on every reporter and classifies the outcome.
///
/// `started` fires after every reporter's `get_report` has been polled once,
/// which is where reporters take their place in line for the change.
async fn run_cycle(
    reporters: &[Arc<dyn Reporter>],
    filter: &IssueFilter,
    change: FilesChange,
    token: &CancellationToken,
    started: oneshot::Sender<()>,
) -> ReportState {
    let connected = join_all(reporters.iter().map(|reporter| guarded(reporter.connect()))).await;
    let mut reports = pin!(join_all(reporters.iter().zip(connected).map(
        |(reporter, connected)| {
            let change = change.clone();
            let token = token.clone();
            async move {
                connected?;
                guarded(reporter.get_report(change, token)).await
            }
        }
    )));
    let first = futures::poll!(reports.as_mut());
    let _ = started.send(());
    let outcomes = match first {
        Poll::Ready(outcomes) => outcomes,
        Poll::Pending => reports.await,
    };
    let outcomes: Vec<_> = reporters
        .iter()
        .zip(outcomes)
        .map(|(reporter, outcome)| {
            outcome.map_err(|failure| match failure {
                Failure::Analysis(err) => err,
                Failure::Panic(message) => {
                    warn!(engine = reporter.name(), %message, "reporter panicked");
                    AnalysisError::engine(reporter.name(), format!("panicked: {message}"))
                }
            })
        })
        .collect();

    if token.is_cancellation_requested() {
        return ReportState::Cancelled;
    }
    let mut issues = Vec::new();
    let mut cancelled = false;
    for (reporter, outcome) in reporters.iter().zip(outcomes) {
        match outcome {
            Ok(found) => issues.extend(found),
            Err(AnalysisError::Cancelled) => cancelled = true,
            Err(err) => return ReportState::Errored(CycleError::new(reporter.name(), err)),
        }
    }
    if cancelled {
        return ReportState::Cancelled;
    }
    filter.apply(&mut issues);
    ReportState::Resolved(issues.into())
}

enum Failure {
    Analysis(AnalysisError),
    Panic(String),
}

/// Runs a reporter call, turning a panic into a [`Failure::Panic`].
async fn guarded<T>(
    call: impl std::future::Future<Output = Result<T, AnalysisError>>,
) -> Result<T, Failure> {
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(outcome) => outcome.map_err(Failure::Analysis),
        Err(payload) => Err(Failure::Panic(panic_message(payload.as_ref()))),
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
