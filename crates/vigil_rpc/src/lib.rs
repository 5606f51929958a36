//! Message-passing RPC between the orchestrator and its worker processes.
//!
//! Messages are JSON objects, one per line (NDJSON), carried over any pair
//! of async byte streams; in practice the worker's stdin and stdout. An
//! [`RpcEndpoint`] correlates requests with responses by id, routes incoming
//! requests and notifications to registered handlers, and rejects every
//! outstanding call with [`RpcError::TransportClosed`] once the channel goes
//! away.

#![warn(missing_docs)]

pub mod codec;
pub mod endpoint;
pub mod error;
pub mod message;

pub use endpoint::RpcEndpoint;
pub use error::{ErrorKind, RemoteError, RpcError};
pub use message::{Message, Notification, Request, Response};
