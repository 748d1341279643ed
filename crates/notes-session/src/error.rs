//! Error types for authenticated requests

use transport::{ApiResponse, TransportError};

/// Outcome of a request that did not produce a response for the caller.
///
/// Business-level failures (404, 422, 500 ...) are not errors here: they
/// come back as `Ok(ApiResponse)` with their status untouched.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Terminal authorization failure. Carries the rejected response.
    #[error("authorization failed ({status}): {body}")]
    Unauthorized { status: u16, body: String },

    #[error("credential refresh failed: {0}")]
    RefreshFailed(String),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("request cancelled: client is shutting down")]
    Cancelled,

    #[error("authentication error: {0}")]
    Auth(#[from] notes_auth::Error),

    #[error("access token is not a valid header value")]
    InvalidToken,
}

impl Error {
    pub(crate) fn unauthorized(response: &ApiResponse) -> Self {
        Self::Unauthorized {
            status: response.status,
            body: response.text(),
        }
    }

    /// Whether this error ended the authenticated session.
    pub fn ends_session(&self) -> bool {
        matches!(self, Self::Unauthorized { .. } | Self::RefreshFailed(_))
    }
}

/// Result alias for session operations.
pub type Result<T> = std::result::Result<T, Error>;
