//! Worker process lifecycle.
//!
//! A [`WorkerHandle`] owns one worker process running a single engine. The
//! process is spawned lazily by [`WorkerHandle::connect`] and reused across
//! cycles. A supervisor task watches it; when the process exits (or is
//! killed) the RPC endpoint closes, which rejects every outstanding call
//! with a transport error instead of leaving it hanging. The next
//! `connect()` spawns a fresh process.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::process::Command;
use tokio::sync::{oneshot, OnceCell};
use tracing::{debug, info, warn};
use vigil_config::EngineKind;
use vigil_engine::protocol::{ConnectResponse, CONNECT, DISCONNECT};
use vigil_engine::AnalysisError;
use vigil_rpc::RpcEndpoint;

/// How long a worker may take to acknowledge `disconnect` before it is killed.
const DISCONNECT_GRACE: Duration = Duration::from_millis(500);

/// How to start a worker process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerCommand {
    program: PathBuf,
    args: Vec<OsString>,
}

impl WorkerCommand {
    /// A command running `program` with no arguments.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Appends one argument.
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// `vigil worker --engine <kind> --config <config>` using the running executable.
    pub fn for_engine(kind: EngineKind, config: &Path) -> Result<Self, AnalysisError> {
        let exe = std::env::current_exe().map_err(|e| {
            AnalysisError::Configuration(format!("cannot locate the vigil executable: {e}"))
        })?;
        Ok(Self::new(exe)
            .arg("worker")
            .arg("--engine")
            .arg(kind.name())
            .arg("--config")
            .arg(config))
    }

    /// Returns the program path.
    pub fn program(&self) -> &Path {
        &self.program
    }
}

struct Live {
    endpoint: RpcEndpoint,
    pid: Option<u32>,
    ready: Arc<OnceCell<()>>,
    kill: Option<oneshot::Sender<()>>,
}

impl Live {
    fn stop(&mut self, reason: &str) {
        if let Some(kill) = self.kill.take() {
            let _ = kill.send(());
        }
        self.endpoint.close(reason);
    }
}

/// A lazily spawned, restartable worker process.
pub struct WorkerHandle {
    name: String,
    command: WorkerCommand,
    live: Mutex<Option<Live>>,
}

impl WorkerHandle {
    /// Creates a handle; no process is started until [`connect`](Self::connect).
    pub fn new(name: impl Into<String>, command: WorkerCommand) -> Self {
        Self {
            name: name.into(),
            command,
            live: Mutex::new(None),
        }
    }

    /// Name of the engine this worker runs.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Spawns the worker if needed and waits for the handshake. Idempotent.
    pub async fn connect(&self) -> Result<(), AnalysisError> {
        let (endpoint, ready) = self.ensure_spawned()?;
        ready
            .get_or_try_init(|| async {
                let response: ConnectResponse = endpoint.request(CONNECT, &()).await?;
                debug!(worker = %self.name, engine = %response.engine, "worker connected");
                Ok::<_, AnalysisError>(())
            })
            .await?;
        Ok(())
    }

    fn ensure_spawned(&self) -> Result<(RpcEndpoint, Arc<OnceCell<()>>), AnalysisError> {
        let mut live = lock(&self.live);
        if let Some(current) = live.as_mut() {
            if !current.endpoint.is_closed() {
                return Ok((current.endpoint.clone(), Arc::clone(&current.ready)));
            }
            warn!(
                worker = %self.name,
                reason = %current.endpoint.close_reason().unwrap_or_default(),
                "worker is gone, respawning"
            );
            current.stop("worker replaced");
        }
        let spawned = self.spawn()?;
        let handles = (spawned.endpoint.clone(), Arc::clone(&spawned.ready));
        *live = Some(spawned);
        Ok(handles)
    }

    fn spawn(&self) -> Result<Live, AnalysisError> {
        let mut child = Command::new(&self.command.program)
            .args(&self.command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                AnalysisError::engine(
                    &self.name,
                    format!("failed to spawn {}: {e}", self.command.program.display()),
                )
            })?;
        let pid = child.id();

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(AnalysisError::engine(&self.name, "worker stdio is not piped"));
        };
        let endpoint = RpcEndpoint::spawn(stdout, stdin);
        info!(worker = %self.name, pid, "worker spawned");

        let (kill_tx, kill_rx) = oneshot::channel::<()>();
        let supervised = endpoint.clone();
        let name = self.name.clone();
        tokio::spawn(async move {
            let reason = tokio::select! {
                status = child.wait() => match status {
                    Ok(status) => format!("worker exited with {status}"),
                    Err(e) => format!("failed to wait for worker: {e}"),
                },
                _ = kill_rx => {
                    let _ = child.kill().await;
                    "worker killed".to_string()
                }
            };
            if supervised.is_closed() {
                debug!(worker = %name, %reason, "worker stopped");
            } else {
                warn!(worker = %name, %reason, "worker died");
            }
            supervised.close(reason);
        });

        Ok(Live {
            endpoint,
            pid,
            ready: Arc::new(OnceCell::new()),
            kill: Some(kill_tx),
        })
    }

    /// Returns the endpoint of the live process.
    pub fn endpoint(&self) -> Result<RpcEndpoint, AnalysisError> {
        lock(&self.live)
            .as_ref()
            .map(|live| live.endpoint.clone())
            .ok_or_else(|| AnalysisError::TransportClosed {
                reason: format!("worker '{}' is not running", self.name),
            })
    }

    /// Sends a request to the worker.
    pub async fn request<Req, Res>(&self, topic: &str, payload: &Req) -> Result<Res, AnalysisError>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        Ok(self.endpoint()?.request(topic, payload).await?)
    }

    /// Sends a notification to the worker.
    pub fn notify<P>(&self, topic: &str, payload: &P) -> Result<(), AnalysisError>
    where
        P: Serialize + ?Sized,
    {
        Ok(self.endpoint()?.notify(topic, payload)?)
    }

    /// Returns `true` while a process is running and its channel is open.
    pub fn is_alive(&self) -> bool {
        lock(&self.live)
            .as_ref()
            .is_some_and(|live| !live.endpoint.is_closed())
    }

    /// Returns the OS process id of the live worker.
    pub fn pid(&self) -> Option<u32> {
        lock(&self.live).as_ref().and_then(|live| live.pid)
    }

    /// Terminates the worker process. Outstanding calls reject.
    pub fn kill(&self) {
        if let Some(mut live) = lock(&self.live).take() {
            info!(worker = %self.name, pid = live.pid, "killing worker");
            live.stop("worker killed");
        }
    }

    /// Asks the worker to shut down, then kills it.
    pub async fn disconnect(&self) -> Result<(), AnalysisError> {
        if self.is_alive() {
            let ack = self.request::<_, ()>(DISCONNECT, &());
            match tokio::time::timeout(DISCONNECT_GRACE, ack).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => debug!(worker = %self.name, error = %e, "disconnect request failed"),
                Err(_) => debug!(worker = %self.name, "worker did not acknowledge disconnect"),
            }
        }
        self.kill();
        Ok(())
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        if let Some(mut live) = lock(&self.live).take() {
            live.stop("worker handle dropped");
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
