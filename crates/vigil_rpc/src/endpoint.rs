//! The request/response endpoint.

use std::collections::HashMap;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot, watch};
use vigil_common::panic_message;

use crate::codec::{read_message, write_message};
use crate::error::{ErrorKind, RemoteError, RpcError};
use crate::message::{Message, Notification, Request, Response};

type RequestHandler =
    Arc<dyn Fn(Value) -> BoxFuture<'static, Result<Value, RemoteError>> + Send + Sync>;
type NotificationHandler = Arc<dyn Fn(Value) + Send + Sync>;
type Reply = oneshot::Sender<Result<Value, RpcError>>;

#[derive(Default)]
struct Pending {
    closed: Option<String>,
    calls: HashMap<u64, Reply>,
}

struct Inner {
    next_id: AtomicU64,
    pending: Mutex<Pending>,
    handlers: Mutex<HashMap<String, RequestHandler>>,
    notification_handlers: Mutex<HashMap<String, NotificationHandler>>,
    outbound: mpsc::UnboundedSender<Message>,
    closed: watch::Sender<bool>,
}

/// One side of an RPC channel.
///
/// Cloning is cheap; clones share the pending-call table and handlers.
#[derive(Clone)]
pub struct RpcEndpoint {
    inner: Arc<Inner>,
}

impl RpcEndpoint {
    /// Creates an endpoint with no transport attached.
    ///
    /// Messages it wants to send are delivered on the returned receiver and
    /// incoming messages are fed in through [`dispatch`](Self::dispatch).
    /// [`spawn`](Self::spawn) wires both ends to a byte stream instead.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Message>) {
        let (outbound, rx) = mpsc::unbounded_channel();
        let (closed, _) = watch::channel(false);
        let endpoint = Self {
            inner: Arc::new(Inner {
                next_id: AtomicU64::new(1),
                pending: Mutex::new(Pending::default()),
                handlers: Mutex::new(HashMap::new()),
                notification_handlers: Mutex::new(HashMap::new()),
                outbound,
                closed,
            }),
        };
        (endpoint, rx)
    }

    /// Creates an endpoint that talks NDJSON over `reader` and `writer`.
    ///
    /// Handlers should be registered before the peer starts sending, i.e.
    /// right after this returns and before any `.await`.
    pub fn spawn<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (endpoint, outbound) = Self::new();
        tokio::spawn(endpoint.clone().write_loop(outbound, writer));
        tokio::spawn(endpoint.clone().read_loop(reader));
        endpoint
    }

    async fn write_loop<W>(self, mut outbound: mpsc::UnboundedReceiver<Message>, mut writer: W)
    where
        W: AsyncWrite + Unpin,
    {
        let mut closed = self.inner.closed.subscribe();
        loop {
            let message = tokio::select! {
                message = outbound.recv() => message,
                _ = closed.wait_for(|closed| *closed) => break,
            };
            let Some(message) = message else { break };
            if let Err(e) = write_message(&mut writer, &message).await {
                self.close(format!("write failed: {e}"));
                return;
            }
        }
        // Flush whatever was queued before the close, e.g. a final response.
        while let Ok(message) = outbound.try_recv() {
            if write_message(&mut writer, &message).await.is_err() {
                break;
            }
        }
        let _ = writer.shutdown().await;
    }

    async fn read_loop<R>(self, reader: R)
    where
        R: AsyncRead + Unpin,
    {
        let mut reader = BufReader::new(reader);
        let mut closed = self.inner.closed.subscribe();
        loop {
            let next = tokio::select! {
                next = read_message(&mut reader) => next,
                _ = closed.wait_for(|closed| *closed) => return,
            };
            match next {
                Ok(Some(message)) => self.dispatch(message),
                Ok(None) => {
                    self.close("peer closed the channel");
                    return;
                }
                Err(RpcError::Codec(e)) => {
                    tracing::warn!("dropping malformed message: {e}");
                }
                Err(e) => {
                    self.close(format!("read failed: {e}"));
                    return;
                }
            }
        }
    }

    /// Sends a request and waits for the matching response.
    pub async fn request<Req, Res>(&self, topic: &str, payload: &Req) -> Result<Res, RpcError>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let payload = serde_json::to_value(payload)?;
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = lock(&self.inner.pending);
            if let Some(reason) = &pending.closed {
                return Err(RpcError::closed(reason.clone()));
            }
            pending.calls.insert(id, tx);
        }

        let request = Message::Request(Request {
            id,
            topic: topic.to_string(),
            payload,
        });
        if self.inner.outbound.send(request).is_err() {
            lock(&self.inner.pending).calls.remove(&id);
            return Err(RpcError::closed("outbound queue dropped"));
        }
        tracing::trace!(id, topic, "request sent");

        let value = rx
            .await
            .map_err(|_| RpcError::closed("endpoint dropped"))??;
        Ok(serde_json::from_value(value)?)
    }

    /// Sends a notification. No response is expected.
    pub fn notify<P>(&self, topic: &str, payload: &P) -> Result<(), RpcError>
    where
        P: Serialize + ?Sized,
    {
        if let Some(reason) = &lock(&self.inner.pending).closed {
            return Err(RpcError::closed(reason.clone()));
        }
        let notification = Message::Notification(Notification {
            topic: topic.to_string(),
            payload: serde_json::to_value(payload)?,
        });
        self.inner
            .outbound
            .send(notification)
            .map_err(|_| RpcError::closed("outbound queue dropped"))
    }

    /// Registers the handler for requests on `topic`, replacing any previous one.
    ///
    /// `handler` itself runs synchronously inside [`dispatch`](Self::dispatch),
    /// so state it touches before returning its future is in place before the
    /// next incoming message is routed. The future runs on its own task.
    pub fn register_handler<Req, Res, F, Fut>(&self, topic: &str, handler: F)
    where
        Req: DeserializeOwned + 'static,
        Res: Serialize + Send + 'static,
        F: Fn(Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Res, RemoteError>> + Send + 'static,
    {
        let topic_name = topic.to_string();
        let wrapped: RequestHandler = Arc::new(move |payload: Value| {
            match serde_json::from_value::<Req>(payload) {
                Ok(request) => {
                    let fut = handler(request);
                    async move {
                        let response = fut.await?;
                        serde_json::to_value(response)
                            .map_err(|e| RemoteError::protocol(format!("unencodable result: {e}")))
                    }
                    .boxed()
                }
                Err(e) => {
                    let message = format!("invalid payload for '{topic_name}': {e}");
                    async move { Err(RemoteError::protocol(message)) }.boxed()
                }
            }
        });
        lock(&self.inner.handlers).insert(topic.to_string(), wrapped);
    }

    /// Registers the handler for notifications on `topic`.
    ///
    /// Malformed payloads are logged and dropped.
    pub fn register_notification_handler<P, F>(&self, topic: &str, handler: F)
    where
        P: DeserializeOwned + 'static,
        F: Fn(P) + Send + Sync + 'static,
    {
        let topic_name = topic.to_string();
        let wrapped: NotificationHandler =
            Arc::new(move |payload| match serde_json::from_value::<P>(payload) {
                Ok(payload) => handler(payload),
                Err(e) => tracing::warn!("invalid payload for notification '{topic_name}': {e}"),
            });
        lock(&self.inner.notification_handlers).insert(topic.to_string(), wrapped);
    }

    /// Routes one incoming message.
    ///
    /// Responses complete the matching pending call; requests run their
    /// topic's handler and send its outcome back (an unknown topic answers
    /// with a protocol error, a panicking handler with an engine error);
    /// notifications run their handler, unknown ones
    /// are ignored.
    pub fn dispatch(&self, message: Message) {
        match message {
            Message::Response(response) => {
                let reply = lock(&self.inner.pending).calls.remove(&response.id);
                match reply {
                    Some(reply) => {
                        let _ = reply.send(response.into_outcome().map_err(RpcError::Remote));
                    }
                    None => tracing::debug!(id = response.id, "response for unknown call"),
                }
            }
            Message::Request(Request { id, topic, payload }) => {
                let handler = lock(&self.inner.handlers).get(&topic).cloned();
                let outbound = self.inner.outbound.clone();
                match handler {
                    Some(handler) => {
                        let started = panic::catch_unwind(AssertUnwindSafe(|| handler(payload)));
                        tokio::spawn(async move {
                            let outcome = match started {
                                Ok(fut) => AssertUnwindSafe(fut).catch_unwind().await,
                                Err(payload) => Err(payload),
                            };
                            let outcome = outcome.unwrap_or_else(|payload| {
                                let message = panic_message(payload.as_ref());
                                tracing::error!(id, %topic, %message, "request handler panicked");
                                Err(RemoteError::new(
                                    ErrorKind::Engine,
                                    format!("worker: '{topic}' handler panicked: {message}"),
                                ))
                            });
                            let response = Response::from_outcome(id, outcome);
                            let _ = outbound.send(Message::Response(response));
                        });
                    }
                    None => {
                        let error = RemoteError::protocol(format!("unknown topic '{topic}'"));
                        let response = Response::from_outcome(id, Err(error));
                        let _ = outbound.send(Message::Response(response));
                    }
                }
            }
            Message::Notification(Notification { topic, payload }) => {
                let handler = lock(&self.inner.notification_handlers).get(&topic).cloned();
                match handler {
                    Some(handler) => handler(payload),
                    None => tracing::debug!(topic, "ignoring notification"),
                }
            }
        }
    }

    /// Closes the endpoint.
    ///
    /// Every pending call rejects with [`RpcError::TransportClosed`] carrying
    /// `reason`, and later calls fail immediately. Closing twice is a no-op.
    pub fn close(&self, reason: impl Into<String>) {
        let reason = reason.into();
        let calls = {
            let mut pending = lock(&self.inner.pending);
            if pending.closed.is_some() {
                return;
            }
            pending.closed = Some(reason.clone());
            std::mem::take(&mut pending.calls)
        };
        tracing::debug!(%reason, pending = calls.len(), "rpc endpoint closed");
        for (_, reply) in calls {
            let _ = reply.send(Err(RpcError::closed(reason.clone())));
        }
        self.inner.closed.send_replace(true);
    }

    /// Returns `true` once the endpoint has been closed.
    pub fn is_closed(&self) -> bool {
        lock(&self.inner.pending).closed.is_some()
    }

    /// Returns why the endpoint closed, if it has.
    pub fn close_reason(&self) -> Option<String> {
        lock(&self.inner.pending).closed.clone()
    }

    /// Resolves once the endpoint is closed.
    pub async fn closed(&self) {
        let mut closed = self.inner.closed.subscribe();
        let _ = closed.wait_for(|closed| *closed).await;
    }
}

/// Locks a mutex, recovering the data if a panicking thread poisoned it.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
