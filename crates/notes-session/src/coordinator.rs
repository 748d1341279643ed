//! Single-flight credential refresh
//!
//! Every request rejected with 401 while a refresh is possible lands in one
//! FIFO queue. The first arrival starts the refresh cycle; later arrivals
//! only enqueue. When the cycle ends the queue is drained in arrival order:
//!
//! - refresh succeeded: every waiter is replayed with the new access token
//! - no refresh token: every waiter fails with its own 401
//! - refresh failed: every waiter fails with the refresh error
//!
//! The cycle runs on its own task, so a caller that stops waiting does not
//! strand the rest of the queue.
//!
//! State lives behind a `std::sync::Mutex` that is never held across an
//! await. "Enqueue and maybe start" is one critical section, and so is
//! "finish and take the queue": a 401 arriving at any point either joins the
//! running cycle or observes it finished.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::join_all;
use notes_auth::CredentialStore;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use transport::{ApiResponse, Transport};

use crate::decorator::decorate;
use crate::error::{Error, Result};
use crate::guard::{SessionGuard, TerminationReason};
use crate::metrics;
use crate::retry::{Attempt, RetryPolicy};

struct Waiter {
    attempt: Attempt,
    rejected: ApiResponse,
    slot: oneshot::Sender<Result<ApiResponse>>,
}

#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    closed: bool,
    /// Bumped each time a refresh stores new credentials.
    generation: u64,
    waiters: VecDeque<Waiter>,
}

enum Admission {
    Closed,
    Replay(Attempt),
    Queued {
        receiver: oneshot::Receiver<Result<ApiResponse>>,
        start_cycle: bool,
    },
}

enum CycleOutcome {
    Refreshed,
    NoRefreshToken,
    Failed(String),
}

pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
    store: Arc<dyn CredentialStore>,
    transport: Arc<dyn Transport>,
    guard: SessionGuard,
    policy: RetryPolicy,
}

impl RefreshCoordinator {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        transport: Arc<dyn Transport>,
        guard: SessionGuard,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            state: Mutex::new(RefreshState::default()),
            store,
            transport,
            guard,
            policy,
        }
    }

    fn state(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Requests currently waiting on a refresh cycle.
    pub fn pending(&self) -> usize {
        self.state().waiters.len()
    }

    pub fn is_refreshing(&self) -> bool {
        self.state().in_flight
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    /// Decorate and send one attempt.
    pub async fn dispatch(&self, attempt: &mut Attempt) -> Result<ApiResponse> {
        let generation = self.state().generation;
        attempt.set_generation(generation);
        let request = decorate(self.store.as_ref(), attempt.request().clone()).await?;
        Ok(self.transport.execute(request).await?)
    }

    /// Resolve a 401: end the session, join the refresh queue, or replay
    /// directly when credentials already rotated after `attempt` was sent.
    pub async fn handle_unauthorized(
        self: &Arc<Self>,
        mut attempt: Attempt,
        rejected: ApiResponse,
    ) -> Result<ApiResponse> {
        if let Some(reason) = self.policy.terminal_reason(&attempt) {
            return Err(self.terminate(reason, &rejected).await);
        }
        attempt.mark_retried();

        let admission = {
            let mut state = self.state();
            if state.closed {
                Admission::Closed
            } else if !state.in_flight && state.generation != attempt.generation() {
                Admission::Replay(attempt)
            } else {
                let (slot, receiver) = oneshot::channel();
                state.waiters.push_back(Waiter {
                    attempt,
                    rejected,
                    slot,
                });
                let start_cycle = !state.in_flight;
                state.in_flight = true;
                Admission::Queued {
                    receiver,
                    start_cycle,
                }
            }
        };

        match admission {
            Admission::Closed => Err(Error::Cancelled),
            Admission::Replay(attempt) => {
                debug!("credentials rotated since dispatch, replaying without refresh");
                self.replay(attempt).await
            }
            Admission::Queued {
                receiver,
                start_cycle,
            } => {
                metrics::record_waiter_queued();
                if start_cycle {
                    let coordinator = Arc::clone(self);
                    tokio::spawn(async move { coordinator.run_cycle().await });
                }
                receiver.await.unwrap_or(Err(Error::Cancelled))
            }
        }
    }

    /// Fail every queued request with `Cancelled` and refuse new ones.
    ///
    /// A refresh already on the wire still completes and stores its result.
    pub fn close(&self) {
        let waiters = {
            let mut state = self.state();
            state.closed = true;
            std::mem::take(&mut state.waiters)
        };
        if !waiters.is_empty() {
            warn!(waiters = waiters.len(), "cancelling requests queued on refresh");
        }
        for waiter in waiters {
            let _ = waiter.slot.send(Err(Error::Cancelled));
        }
    }

    async fn run_cycle(self: Arc<Self>) {
        match self.refresh().await {
            CycleOutcome::Refreshed => {
                let waiters = {
                    let mut state = self.state();
                    state.generation += 1;
                    state.in_flight = false;
                    std::mem::take(&mut state.waiters)
                };
                debug!(waiters = waiters.len(), "replaying queued requests");
                let this: &Self = &self;
                join_all(waiters.into_iter().map(|waiter| async move {
                    let result = this.replay(waiter.attempt).await;
                    let _ = waiter.slot.send(result);
                }))
                .await;
            }
            CycleOutcome::NoRefreshToken => {
                self.guard
                    .terminate(TerminationReason::NoRefreshToken)
                    .await;
                for waiter in self.finish() {
                    let _ = waiter.slot.send(Err(Error::unauthorized(&waiter.rejected)));
                }
            }
            CycleOutcome::Failed(reason) => {
                self.guard.terminate(TerminationReason::RefreshFailed).await;
                for waiter in self.finish() {
                    let _ = waiter
                        .slot
                        .send(Err(Error::RefreshFailed(reason.clone())));
                }
            }
        }
    }

    /// End a failed cycle. Credentials are already cleared, so nothing
    /// queued from here on can rotate back into a valid session.
    fn finish(&self) -> VecDeque<Waiter> {
        let mut state = self.state();
        state.in_flight = false;
        std::mem::take(&mut state.waiters)
    }

    async fn refresh(&self) -> CycleOutcome {
        let current = match self.store.get().await {
            Ok(current) => current,
            Err(e) => {
                metrics::record_refresh("failure");
                return CycleOutcome::Failed(format!("reading credentials: {e}"));
            }
        };
        let Some(refresh) = current
            .as_ref()
            .and_then(|pair| pair.refresh_token())
            .map(str::to_owned)
        else {
            metrics::record_refresh("no_refresh_token");
            info!("access token rejected and no refresh token stored");
            return CycleOutcome::NoRefreshToken;
        };

        info!(
            transport = self.transport.id(),
            "access token rejected, refreshing credentials"
        );
        match notes_auth::refresh_token(self.transport.as_ref(), &refresh).await {
            Ok(token) => {
                let pair = token.into_pair(current.as_ref());
                if let Err(e) = self.store.set(pair).await {
                    metrics::record_refresh("failure");
                    warn!(error = %e, "failed to store refreshed credentials");
                    return CycleOutcome::Failed(format!("storing refreshed credentials: {e}"));
                }
                metrics::record_refresh("success");
                info!("credentials refreshed");
                CycleOutcome::Refreshed
            }
            Err(e) => {
                metrics::record_refresh("failure");
                warn!(error = %e, "credential refresh failed");
                CycleOutcome::Failed(e.to_string())
            }
        }
    }

    /// Send an already-retried attempt once more. A second 401 is final.
    async fn replay(&self, mut attempt: Attempt) -> Result<ApiResponse> {
        metrics::record_replay();
        let response = self.dispatch(&mut attempt).await?;
        if !RetryPolicy::is_unauthorized(response.status) {
            return Ok(response);
        }
        let reason = self
            .policy
            .terminal_reason(&attempt)
            .unwrap_or(TerminationReason::RetryExhausted);
        Err(self.terminate(reason, &response).await)
    }

    async fn terminate(&self, reason: TerminationReason, rejected: &ApiResponse) -> Error {
        self.guard.terminate(reason).await;
        Error::unauthorized(rejected)
    }
}
