//! Topics and payloads exchanged between the orchestrator and a worker.

use serde::{Deserialize, Serialize};
use vigil_common::{CancellationPayload, FilesChange, Partition};
use vigil_diagnostics::Issue;

/// Handshake request; answered with [`ConnectResponse`].
pub const CONNECT: &str = "connect";
/// Analysis request carrying a [`RunPayload`]; answered with the issue list.
pub const RUN: &str = "run";
/// Cache seeding request carrying a [`SeedPayload`].
pub const SEED: &str = "seed";
/// Request announcing that the host is done with the worker.
///
/// The worker only acknowledges; the host then kills the process, and a
/// worker that outlives that exits once its stdin closes.
pub const DISCONNECT: &str = "disconnect";
/// Notification carrying a [`CancelPayload`].
pub const CANCEL: &str = "cancel";

/// Answer to the `connect` handshake.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectResponse {
    /// Name of the engine the worker runs.
    pub engine: String,
}

/// Arguments of a `run` request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunPayload {
    /// Files changed since the previous run. `None` is the same as empty.
    #[serde(default)]
    pub change: Option<FilesChange>,
    /// When set, the worker runs a full analysis of this share of the file
    /// set and ignores `change`.
    #[serde(default)]
    pub partition: Option<Partition>,
    /// The host's cancellation token at the time of the request.
    pub cancellation: CancellationPayload,
}

/// Answer to a `run` request.
pub type RunResponse = Vec<Issue>;

/// Arguments of a `seed` request.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedPayload {
    /// Issues analyzed elsewhere, to be cached as if produced locally.
    pub issues: Vec<Issue>,
}

/// Arguments of a `cancel` notification.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelPayload {
    /// Id of the token to signal.
    pub token: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn run_payload_wire_shape() {
        let payload = RunPayload {
            change: Some(FilesChange::new().with_changed(["src/a.ts"])),
            partition: None,
            cancellation: CancellationPayload {
                id: 3,
                cancelled: false,
            },
        };
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(
            value,
            json!({
                "change": {"changedFiles": ["src/a.ts"], "deletedFiles": []},
                "partition": null,
                "cancellation": {"id": 3, "cancelled": false}
            })
        );
    }

    #[test]
    fn run_payload_defaults_optional_fields() {
        let payload: RunPayload =
            serde_json::from_value(json!({"cancellation": {"id": 1, "cancelled": true}})).unwrap();
        assert!(payload.change.is_none());
        assert!(payload.partition.is_none());
        assert!(payload.cancellation.cancelled);
    }
}
