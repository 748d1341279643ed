//! Authenticated client facade
//!
//! `AuthClient::send` is the single entry point for API calls: decorate,
//! send, and on 401 hand the attempt to the refresh coordinator. Every
//! other status comes back to the caller untouched.

use std::sync::Arc;

use notes_auth::{Claims, CredentialPair, CredentialStore, NewAccount, decode_claims};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument};
use transport::{ApiRequest, ApiResponse, Transport};

use crate::coordinator::RefreshCoordinator;
use crate::error::{Error, Result};
use crate::guard::{SessionEvent, SessionGuard};
use crate::retry::{Attempt, RetryPolicy};

/// Client owning one credential store and one refresh coordinator.
///
/// Dropping the client cancels requests still queued on a refresh.
pub struct AuthClient {
    coordinator: Arc<RefreshCoordinator>,
    store: Arc<dyn CredentialStore>,
    transport: Arc<dyn Transport>,
    guard: SessionGuard,
}

impl AuthClient {
    pub fn new(transport: Arc<dyn Transport>, store: Arc<dyn CredentialStore>) -> Self {
        let guard = SessionGuard::new(Arc::clone(&store));
        let coordinator = Arc::new(RefreshCoordinator::new(
            Arc::clone(&store),
            Arc::clone(&transport),
            guard.clone(),
            RetryPolicy::default(),
        ));
        Self {
            coordinator,
            store,
            transport,
            guard,
        }
    }

    /// Receiver for `SessionEvent::Terminated`.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.guard.subscribe()
    }

    /// Send a request with the current access token.
    ///
    /// A 401 is recovered at most once through a shared refresh. Transport
    /// failures and non-401 statuses are returned as they are.
    #[instrument(
        skip_all,
        fields(request_id = %request.id, method = %request.method, path = %request.route())
    )]
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
        if self.coordinator.is_closed() {
            return Err(Error::Cancelled);
        }

        let mut attempt = Attempt::new(request);
        let response = self.coordinator.dispatch(&mut attempt).await?;
        if !RetryPolicy::is_unauthorized(response.status) {
            return Ok(response);
        }

        debug!("request rejected with 401");
        self.coordinator.handle_unauthorized(attempt, response).await
    }

    /// Password login. Stores the returned pair, replacing any existing one.
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        let token = notes_auth::login(self.transport.as_ref(), username, password).await?;
        self.store.set(token.into_pair(None)).await?;
        info!("logged in");
        Ok(())
    }

    /// Create an account. Does not log in.
    pub async fn register(&self, account: &NewAccount<'_>) -> Result<serde_json::Value> {
        Ok(notes_auth::register(self.transport.as_ref(), account).await?)
    }

    /// Forget the stored credentials. User-initiated, so no termination
    /// event is emitted. Returns whether anything was stored.
    pub async fn logout(&self) -> Result<bool> {
        let cleared = self.store.clear().await?;
        if cleared {
            info!("logged out");
        }
        Ok(cleared)
    }

    pub async fn credentials(&self) -> Result<Option<CredentialPair>> {
        Ok(self.store.get().await?)
    }

    pub async fn is_authenticated(&self) -> Result<bool> {
        Ok(self.credentials().await?.is_some())
    }

    /// Claims of the stored access token, for display. `None` when logged
    /// out or when the token is not a JWT.
    pub async fn access_claims(&self) -> Result<Option<Claims>> {
        Ok(self
            .credentials()
            .await?
            .and_then(|pair| decode_claims(pair.access_token())))
    }

    /// `exp` of the stored access token, unix seconds.
    pub async fn access_token_expiry(&self) -> Result<Option<u64>> {
        Ok(self.access_claims().await?.and_then(|claims| claims.exp))
    }

    /// Requests waiting on a refresh cycle.
    pub fn pending(&self) -> usize {
        self.coordinator.pending()
    }

    pub fn is_refreshing(&self) -> bool {
        self.coordinator.is_refreshing()
    }

    /// Cancel queued requests and refuse new ones.
    pub fn shutdown(&self) {
        self.coordinator.close();
    }
}

impl Drop for AuthClient {
    fn drop(&mut self) {
        self.coordinator.close();
    }
}
