//! The worker side of the orchestrator protocol.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, info};
use vigil_common::CancellationToken;
use vigil_rpc::{RemoteError, RpcEndpoint};

use crate::incremental::IncrementalReporter;
use crate::protocol::{
    CancelPayload, ConnectResponse, RunPayload, SeedPayload, CANCEL, CONNECT, DISCONNECT, RUN,
    SEED,
};
use crate::reporter::{PartitionableReporter, Reporter};

type TokenRegistry = Arc<Mutex<HashMap<u64, CancellationToken>>>;

/// Serves one engine to the orchestrator over an RPC endpoint.
///
/// Every `run` request reconstructs the host's cancellation token and keeps
/// it in a registry until the run settles, so a later `cancel`
/// notification can flip it while the engine is between files.
pub struct WorkerService {
    endpoint: RpcEndpoint,
}

impl WorkerService {
    /// Registers the protocol handlers on `endpoint`.
    pub fn new(endpoint: RpcEndpoint, reporter: Arc<IncrementalReporter>) -> Self {
        let tokens: TokenRegistry = Arc::default();

        let engine = reporter.name().to_string();
        endpoint.register_handler(CONNECT, move |_: serde_json::Value| {
            let engine = engine.clone();
            async move {
                debug!(%engine, "connect handshake");
                Ok(ConnectResponse { engine })
            }
        });

        let run_reporter = Arc::clone(&reporter);
        let run_tokens = Arc::clone(&tokens);
        endpoint.register_handler(RUN, move |payload: RunPayload| {
            // Registered before the future is spawned, so a cancel that
            // arrives right behind this request finds the token.
            let token = CancellationToken::from_payload(payload.cancellation);
            lock(&run_tokens).insert(token.id(), token.clone());

            let reporter = Arc::clone(&run_reporter);
            let tokens = Arc::clone(&run_tokens);
            async move {
                let outcome = match payload.partition {
                    Some(partition) => {
                        reporter
                            .get_partitioned_report(partition, token.clone())
                            .await
                    }
                    None => {
                        let change = payload.change.unwrap_or_default();
                        reporter.get_report(change, token.clone()).await
                    }
                };
                lock(&tokens).remove(&token.id());
                outcome.map_err(RemoteError::from)
            }
        });

        let seed_reporter = Arc::clone(&reporter);
        endpoint.register_handler(SEED, move |payload: SeedPayload| {
            let reporter = Arc::clone(&seed_reporter);
            async move {
                reporter.seed(payload.issues).await.map_err(RemoteError::from)
            }
        });

        let engine = reporter.name().to_string();
        endpoint.register_handler(DISCONNECT, move |_: serde_json::Value| {
            info!(engine = %engine, "disconnect requested");
            async { Ok::<_, RemoteError>(()) }
        });

        endpoint.register_notification_handler(CANCEL, move |payload: CancelPayload| {
            match lock(&tokens).get(&payload.token) {
                Some(token) => {
                    debug!(token = payload.token, "cancelling run");
                    token.request_cancellation();
                }
                None => debug!(token = payload.token, "cancel for settled run"),
            }
        });

        Self { endpoint }
    }

    /// Returns the endpoint this service answers on.
    pub fn endpoint(&self) -> &RpcEndpoint {
        &self.endpoint
    }

    /// Serves until the channel closes.
    pub async fn run(self) {
        self.endpoint.closed().await;
        info!(
            reason = %self.endpoint.close_reason().unwrap_or_default(),
            "worker channel closed"
        );
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::CheckEngine;
    use crate::protocol::RunResponse;
    use std::fs;
    use vigil_common::{FilesChange, Partition};
    use vigil_config::FileSelection;
    use vigil_rpc::{ErrorKind, Message, Notification, Request, RpcError};

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/a.ts"), "foo(\n").unwrap();
        fs::write(dir.path().join("src/b.ts"), "bar()\n").unwrap();
        dir
    }

    fn reporter(dir: &tempfile::TempDir) -> Arc<IncrementalReporter> {
        let selection = FileSelection::new(dir.path(), &["src".into()], &[], &["ts".into()]);
        Arc::new(IncrementalReporter::new(Arc::new(CheckEngine::new()), selection))
    }

    fn connected(dir: &tempfile::TempDir) -> RpcEndpoint {
        let (host, worker) = tokio::io::duplex(64 * 1024);
        let (host_read, host_write) = tokio::io::split(host);
        let (worker_read, worker_write) = tokio::io::split(worker);
        let worker = RpcEndpoint::spawn(worker_read, worker_write);
        let service = WorkerService::new(worker, reporter(dir));
        tokio::spawn(service.run());
        RpcEndpoint::spawn(host_read, host_write)
    }

    fn run_payload(change: Option<FilesChange>, partition: Option<Partition>) -> RunPayload {
        RunPayload {
            change,
            partition,
            cancellation: CancellationToken::new().to_payload(),
        }
    }

    #[tokio::test]
    async fn connect_reports_engine() {
        let dir = project();
        let host = connected(&dir);
        let response: ConnectResponse = host.request(CONNECT, &()).await.unwrap();
        assert_eq!(response.engine, "check");
    }

    #[tokio::test]
    async fn run_returns_issues() {
        let dir = project();
        let host = connected(&dir);
        let issues: RunResponse = host.request(RUN, &run_payload(None, None)).await.unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, "E001");
        assert_eq!(issues[0].file.to_string(), "src/a.ts");
    }

    #[tokio::test]
    async fn partitioned_run_then_seed() {
        let dir = project();
        fs::write(dir.path().join("src/b.ts"), "bar(\n").unwrap();
        let host = connected(&dir);

        let payload = run_payload(None, Some(Partition::new(0, 2)));
        let mine: RunResponse = host.request(RUN, &payload).await.unwrap();
        assert_eq!(mine.len(), 1);

        let other = vigil_diagnostics::Issue::error(
            vigil_diagnostics::IssueSource::TypeCheck,
            "src/b.ts".into(),
            1,
            4,
            "E001",
            "unclosed delimiter '('",
        );
        host.request::<_, ()>(SEED, &SeedPayload { issues: vec![other] })
            .await
            .unwrap();
        let all: RunResponse = host
            .request(RUN, &run_payload(Some(FilesChange::new()), None))
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn pre_cancelled_run_answers_cancelled() {
        let dir = project();
        let host = connected(&dir);
        let token = CancellationToken::new();
        token.request_cancellation();
        let payload = RunPayload {
            change: None,
            partition: None,
            cancellation: token.to_payload(),
        };
        let err = host.request::<_, RunResponse>(RUN, &payload).await.unwrap_err();
        assert!(matches!(err, RpcError::Remote(ref r) if r.kind == ErrorKind::Cancelled));
    }

    #[tokio::test]
    async fn cancel_notification_reaches_inflight_run() {
        let dir = project();
        let (endpoint, mut outbound) = RpcEndpoint::new();
        let _service = WorkerService::new(endpoint.clone(), reporter(&dir));

        let token = CancellationToken::new();
        let payload = RunPayload {
            change: None,
            partition: None,
            cancellation: token.to_payload(),
        };
        endpoint.dispatch(Message::Request(Request {
            id: 1,
            topic: RUN.into(),
            payload: serde_json::to_value(&payload).unwrap(),
        }));
        endpoint.dispatch(Message::Notification(Notification {
            topic: CANCEL.into(),
            payload: serde_json::to_value(CancelPayload { token: token.id() }).unwrap(),
        }));

        let Some(Message::Response(response)) = outbound.recv().await else {
            panic!("expected a response");
        };
        let err = response.into_outcome().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Cancelled);
    }

    #[tokio::test]
    async fn cancel_for_unknown_token_is_ignored() {
        let dir = project();
        let host = connected(&dir);
        host.notify(CANCEL, &CancelPayload { token: 999_999 }).unwrap();
        let issues: RunResponse = host.request(RUN, &run_payload(None, None)).await.unwrap();
        assert_eq!(issues.len(), 1);
    }

    #[tokio::test]
    async fn disconnect_is_acknowledged_and_channel_stays_open() {
        let dir = project();
        let (endpoint, mut outbound) = RpcEndpoint::new();
        let _service = WorkerService::new(endpoint.clone(), reporter(&dir));
        endpoint.dispatch(Message::Request(Request {
            id: 7,
            topic: DISCONNECT.into(),
            payload: serde_json::Value::Null,
        }));

        let Some(Message::Response(response)) = outbound.recv().await else {
            panic!("expected a response");
        };
        assert_eq!(response.id, 7);
        assert!(response.into_outcome().is_ok());
        assert!(!endpoint.is_closed());
    }

    #[tokio::test]
    async fn service_returns_when_channel_closes() {
        let dir = project();
        let (endpoint, _outbound) = RpcEndpoint::new();
        let service = WorkerService::new(endpoint.clone(), reporter(&dir));
        endpoint.close("host went away");
        service.run().await;
    }
}
