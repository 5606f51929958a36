//! Cooperative cancellation that survives a process boundary.
//!
//! A [`CancellationToken`] is created by the host for every check cycle. Its
//! state is serialized into each outbound request as a
//! [`CancellationPayload`]; the worker reconstructs a token from that payload
//! and polls it between units of work. Later host-side cancellation is
//! forwarded as a notification carrying the token id, which flips the
//! worker-side token. Cancellation never preempts running work.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

static NEXT_TOKEN_ID: AtomicU64 = AtomicU64::new(1);

/// Returned by [`CancellationToken::check`] once cancellation was requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("operation cancelled")]
pub struct Cancelled;

/// The serialized form of a token, embedded in every run request.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancellationPayload {
    /// Identifier used to address the token in a later cancel notification.
    pub id: u64,
    /// Whether cancellation had already been requested when serialized.
    pub cancelled: bool,
}

struct TokenState {
    id: u64,
    cancelled: AtomicBool,
    notify: Notify,
}

/// A cloneable cooperative-cancellation signal.
///
/// Clones share state. Each token created with [`new`](Self::new) is
/// independent, so cancelling one cycle's token never affects another's.
#[derive(Clone)]
pub struct CancellationToken {
    state: Arc<TokenState>,
}

impl CancellationToken {
    /// Creates an unsignaled token with a fresh identifier.
    pub fn new() -> Self {
        Self::with_state(NEXT_TOKEN_ID.fetch_add(1, Ordering::Relaxed), false)
    }

    /// Reconstructs a token from its serialized form.
    pub fn from_payload(payload: CancellationPayload) -> Self {
        Self::with_state(payload.id, payload.cancelled)
    }

    fn with_state(id: u64, cancelled: bool) -> Self {
        Self {
            state: Arc::new(TokenState {
                id,
                cancelled: AtomicBool::new(cancelled),
                notify: Notify::new(),
            }),
        }
    }

    /// Returns the token identifier.
    pub fn id(&self) -> u64 {
        self.state.id
    }

    /// Returns `true` once cancellation has been requested.
    pub fn is_cancellation_requested(&self) -> bool {
        self.state.cancelled.load(Ordering::Acquire)
    }

    /// Requests cancellation. Idempotent and irreversible.
    pub fn request_cancellation(&self) {
        if !self.state.cancelled.swap(true, Ordering::AcqRel) {
            self.state.notify.notify_waiters();
        }
    }

    /// Returns `Err(Cancelled)` if cancellation has been requested.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancellation_requested() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    /// Waits until cancellation is requested.
    pub async fn cancelled(&self) {
        let notified = self.state.notify.notified();
        if self.is_cancellation_requested() {
            return;
        }
        notified.await;
    }

    /// Serializes the current state for a request payload.
    pub fn to_payload(&self) -> CancellationPayload {
        CancellationPayload {
            id: self.id(),
            cancelled: self.is_cancellation_requested(),
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("id", &self.id())
            .field("cancelled", &self.is_cancellation_requested())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_token_is_unsignaled() {
        let token = CancellationToken::new();
        assert!(!token.is_cancellation_requested());
        assert!(token.check().is_ok());
    }

    #[test]
    fn request_is_idempotent_and_irreversible() {
        let token = CancellationToken::new();
        token.request_cancellation();
        token.request_cancellation();
        assert!(token.is_cancellation_requested());
        assert_eq!(token.check(), Err(Cancelled));
    }

    #[test]
    fn clones_share_state() {
        let token = CancellationToken::new();
        let clone = token.clone();
        clone.request_cancellation();
        assert!(token.is_cancellation_requested());
    }

    #[test]
    fn tokens_are_independent() {
        let consumed = CancellationToken::new();
        let later = CancellationToken::new();
        assert_ne!(consumed.id(), later.id());
        consumed.request_cancellation();
        assert!(!later.is_cancellation_requested());
    }

    #[test]
    fn payload_roundtrip_preserves_state() {
        let token = CancellationToken::new();
        token.request_cancellation();
        let json = serde_json::to_string(&token.to_payload()).unwrap();
        let payload: CancellationPayload = serde_json::from_str(&json).unwrap();
        let remote = CancellationToken::from_payload(payload);
        assert_eq!(remote.id(), token.id());
        assert!(remote.is_cancellation_requested());
    }

    #[test]
    fn reconstructed_token_does_not_share_memory() {
        let token = CancellationToken::new();
        let remote = CancellationToken::from_payload(token.to_payload());
        token.request_cancellation();
        assert!(!remote.is_cancellation_requested());
    }

    #[tokio::test]
    async fn cancelled_resolves_after_request() {
        let token = CancellationToken::new();
        let waiter = {
            let token = token.clone();
            tokio::spawn(async move { token.cancelled().await })
        };
        tokio::task::yield_now().await;
        token.request_cancellation();
        waiter.await.unwrap();
    }

    #[tokio::test]
    async fn cancelled_returns_immediately_when_already_signaled() {
        let token = CancellationToken::new();
        token.request_cancellation();
        token.cancelled().await;
    }
}
