//! Authenticated request pipeline for the notes API
//!
//! Every call goes through `AuthClient::send`:
//! 1. The decorator sets `Authorization: Bearer <access>` from the store
//! 2. The transport sends the request; non-401 outcomes return as they are
//! 3. A 401 goes to the retry policy: the refresh route and already-retried
//!    requests are terminal, anything else joins the refresh queue
//! 4. The coordinator runs at most one refresh at a time and replays or
//!    fails the whole queue in arrival order
//! 5. Terminal failures go through the session guard, which clears the
//!    store and broadcasts `SessionEvent::Terminated` once

pub mod client;
pub mod coordinator;
pub mod decorator;
pub mod error;
pub mod guard;
pub mod metrics;
pub mod retry;

#[cfg(test)]
mod testing;

pub use client::AuthClient;
pub use coordinator::RefreshCoordinator;
pub use decorator::decorate;
pub use error::{Error, Result};
pub use guard::{SessionEvent, SessionGuard, TerminationReason};
pub use retry::{Attempt, RetryPolicy};
