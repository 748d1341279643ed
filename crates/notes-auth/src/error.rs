//! Error types for credential storage and token endpoint calls

/// Errors from authentication operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("transport failure: {0}")]
    Transport(#[from] transport::TransportError),

    #[error("credentials rejected: {0}")]
    InvalidCredentials(String),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("registration rejected ({status}): {detail}")]
    Registration { status: u16, detail: String },

    #[error("credential parse error: {0}")]
    CredentialParse(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
