//! Error types for the RPC channel.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of an error carried in a response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// The work was cancelled before it finished.
    Cancelled,
    /// The channel to a peer closed while the work was outstanding.
    TransportClosed,
    /// The analysis engine failed.
    Engine,
    /// The worker could not load or apply its configuration.
    Configuration,
    /// The message was malformed or addressed to an unknown topic.
    Protocol,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::TransportClosed => "transport_closed",
            ErrorKind::Engine => "engine",
            ErrorKind::Configuration => "configuration",
            ErrorKind::Protocol => "protocol",
        };
        f.write_str(name)
    }
}

/// An error reported by the remote side of a call.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct RemoteError {
    /// What kind of failure occurred.
    pub kind: ErrorKind,
    /// Human-readable description.
    pub message: String,
}

impl RemoteError {
    /// Creates a remote error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Shorthand for a [`ErrorKind::Protocol`] error.
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Protocol, message)
    }
}

/// Errors returned by [`RpcEndpoint`](crate::RpcEndpoint) operations.
#[derive(Debug, thiserror::Error)]
pub enum RpcError {
    /// The channel closed before a response arrived, or was already closed.
    #[error("transport closed: {reason}")]
    TransportClosed {
        /// Why the channel closed.
        reason: String,
    },

    /// The peer answered with an error.
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// A payload could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Reading from or writing to the underlying stream failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RpcError {
    /// Builds a [`RpcError::TransportClosed`] with the given reason.
    pub fn closed(reason: impl Into<String>) -> Self {
        RpcError::TransportClosed {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::TransportClosed).unwrap();
        assert_eq!(json, "\"transport_closed\"");
        assert_eq!(ErrorKind::TransportClosed.to_string(), "transport_closed");
    }

    #[test]
    fn remote_error_display() {
        let err = RemoteError::new(ErrorKind::Engine, "lint crashed");
        assert_eq!(err.to_string(), "engine: lint crashed");
    }

    #[test]
    fn transport_closed_display() {
        let err = RpcError::closed("worker exited");
        assert_eq!(err.to_string(), "transport closed: worker exited");
    }

    #[test]
    fn remote_converts_into_rpc_error() {
        let err: RpcError = RemoteError::protocol("unknown topic").into();
        assert!(matches!(err, RpcError::Remote(ref r) if r.kind == ErrorKind::Protocol));
    }
}
