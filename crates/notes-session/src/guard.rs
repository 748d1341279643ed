//! Session termination
//!
//! The guard is the only place that clears credentials because of a
//! failure. It emits `SessionEvent::Terminated` once per session: after the
//! first clear the store is empty, so later terminations find nothing to
//! remove and stay silent. A store that fails to clear is signalled on the
//! first failure only, and the clear that eventually succeeds stays silent.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use notes_auth::CredentialStore;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::metrics;

const EVENT_CAPACITY: usize = 16;

/// Notification for the shell hosting the client (route to login).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    Terminated,
}

/// Why a session was ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// The refresh route itself answered 401.
    RefreshEndpointRejected,
    /// A replayed request was rejected again.
    RetryExhausted,
    /// A refresh was needed but no refresh token is stored.
    NoRefreshToken,
    /// The refresh call failed.
    RefreshFailed,
}

impl TerminationReason {
    pub fn label(&self) -> &'static str {
        match self {
            TerminationReason::RefreshEndpointRejected => "refresh_endpoint_rejected",
            TerminationReason::RetryExhausted => "retry_exhausted",
            TerminationReason::NoRefreshToken => "no_refresh_token",
            TerminationReason::RefreshFailed => "refresh_failed",
        }
    }
}

#[derive(Clone)]
pub struct SessionGuard {
    store: Arc<dyn CredentialStore>,
    events: broadcast::Sender<SessionEvent>,
    /// Set once a failed clear has been signalled.
    failure_signalled: Arc<AtomicBool>,
}

impl SessionGuard {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            events,
            failure_signalled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Clear stored credentials and signal termination.
    ///
    /// Returns whether the signal was sent. A store error still signals,
    /// but only the first one in a row.
    pub async fn terminate(&self, reason: TerminationReason) -> bool {
        let cleared = match self.store.clear().await {
            // A clear that lands after a signalled failure ends the same session
            Ok(cleared) => {
                let already_signalled = self.failure_signalled.swap(false, Ordering::SeqCst);
                cleared && !already_signalled
            }
            Err(e) => {
                warn!(reason = reason.label(), error = %e, "failed to clear credentials");
                !self.failure_signalled.swap(true, Ordering::SeqCst)
            }
        };

        if !cleared {
            debug!(reason = reason.label(), "session already terminated");
            return false;
        }

        warn!(reason = reason.label(), "session terminated, credentials cleared");
        metrics::record_termination(reason);
        // No subscribers is fine: the credentials are gone regardless
        let _ = self.events.send(SessionEvent::Terminated);
        true
    }
}
