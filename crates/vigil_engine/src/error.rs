//! Error types for analysis runs.

use vigil_common::Cancelled;
use vigil_config::ConfigError;
use vigil_rpc::{ErrorKind, RemoteError, RpcError};

/// Why an analysis run did not produce a report.
///
/// Each variant maps to a wire [`ErrorKind`], so the same error survives the
/// trip from a worker process back to the orchestrator.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    /// The run observed a cancellation request and stopped early.
    #[error("analysis cancelled")]
    Cancelled,

    /// The channel to the worker closed while the run was outstanding.
    #[error("transport closed: {reason}")]
    TransportClosed {
        /// Why the channel closed.
        reason: String,
    },

    /// The engine itself failed.
    #[error("{engine} failed: {message}")]
    Engine {
        /// Name of the failing engine.
        engine: String,
        /// What went wrong.
        message: String,
    },

    /// The worker could not be configured.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A message violated the worker protocol.
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl AnalysisError {
    /// Builds an [`AnalysisError::Engine`].
    pub fn engine(engine: impl Into<String>, message: impl Into<String>) -> Self {
        AnalysisError::Engine {
            engine: engine.into(),
            message: message.into(),
        }
    }

    /// Returns `true` for the cancellation outcome.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AnalysisError::Cancelled)
    }

    /// The wire classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::Cancelled => ErrorKind::Cancelled,
            AnalysisError::TransportClosed { .. } => ErrorKind::TransportClosed,
            AnalysisError::Engine { .. } => ErrorKind::Engine,
            AnalysisError::Configuration(_) => ErrorKind::Configuration,
            AnalysisError::Protocol(_) => ErrorKind::Protocol,
        }
    }
}

impl From<Cancelled> for AnalysisError {
    fn from(_: Cancelled) -> Self {
        AnalysisError::Cancelled
    }
}

impl From<ConfigError> for AnalysisError {
    fn from(err: ConfigError) -> Self {
        AnalysisError::Configuration(err.to_string())
    }
}

impl From<AnalysisError> for RemoteError {
    fn from(err: AnalysisError) -> Self {
        let kind = err.kind();
        let message = match err {
            AnalysisError::Cancelled => "analysis cancelled".to_string(),
            AnalysisError::TransportClosed { reason } => reason,
            AnalysisError::Engine { engine, message } => format!("{engine}: {message}"),
            AnalysisError::Configuration(message) | AnalysisError::Protocol(message) => message,
        };
        RemoteError::new(kind, message)
    }
}

impl From<RemoteError> for AnalysisError {
    fn from(err: RemoteError) -> Self {
        match err.kind {
            ErrorKind::Cancelled => AnalysisError::Cancelled,
            ErrorKind::TransportClosed => AnalysisError::TransportClosed { reason: err.message },
            ErrorKind::Engine => match err.message.split_once(": ") {
                Some((engine, message)) => AnalysisError::engine(engine, message),
                None => AnalysisError::engine("worker", err.message),
            },
            ErrorKind::Configuration => AnalysisError::Configuration(err.message),
            ErrorKind::Protocol => AnalysisError::Protocol(err.message),
        }
    }
}

impl From<RpcError> for AnalysisError {
    fn from(err: RpcError) -> Self {
        match err {
            RpcError::TransportClosed { reason } => AnalysisError::TransportClosed { reason },
            RpcError::Remote(remote) => remote.into(),
            RpcError::Codec(e) => AnalysisError::Protocol(e.to_string()),
            RpcError::Io(e) => AnalysisError::TransportClosed {
                reason: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_engine_error() {
        let err = AnalysisError::engine("lint", "rule panicked");
        assert_eq!(err.to_string(), "lint failed: rule panicked");
    }

    #[test]
    fn wire_round_trip_preserves_kind_and_engine() {
        let cases = [
            AnalysisError::Cancelled,
            AnalysisError::TransportClosed {
                reason: "worker exited".into(),
            },
            AnalysisError::engine("check", "out of memory"),
            AnalysisError::Configuration("bad include".into()),
            AnalysisError::Protocol("unknown topic".into()),
        ];
        for err in cases {
            let remote = RemoteError::from(err.clone());
            assert_eq!(remote.kind, err.kind());
            assert_eq!(AnalysisError::from(remote), err);
        }
    }

    #[test]
    fn rpc_transport_closed_maps_directly() {
        let err = AnalysisError::from(RpcError::closed("peer closed the channel"));
        assert!(matches!(err, AnalysisError::TransportClosed { ref reason } if reason == "peer closed the channel"));
    }

    #[test]
    fn cancelled_converts() {
        let err: AnalysisError = Cancelled.into();
        assert!(err.is_cancelled());
    }
}
