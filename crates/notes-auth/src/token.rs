//! Token endpoint calls
//!
//! Handles the two interactions that mint credentials:
//! 1. Password login (`LOGIN_PATH`, form encoded)
//! 2. Token refresh (`REFRESH_PATH`, JSON `{"refresh_token": ...}`)
//!
//! Both go through the given `Transport` without an Authorization header
//! and without any refresh-on-401 handling: a rejection here is final.

use std::fmt;

use serde::{Deserialize, Serialize};
use transport::{ApiRequest, ApiResponse, Transport};

use crate::constants::{LOGIN_PATH, REFRESH_PATH};
use crate::credentials::CredentialPair;
use crate::error::{Error, Result};

/// Body returned by both token routes.
///
/// `refresh_token` is optional on refresh; when absent the caller keeps
/// the refresh token it already holds.
#[derive(Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
}

impl TokenResponse {
    /// Build the pair to store, falling back to `current`'s refresh token.
    pub fn into_pair(self, current: Option<&CredentialPair>) -> CredentialPair {
        match current {
            Some(current) => current.rotate(self.access_token, self.refresh_token),
            None => CredentialPair::new(self.access_token, self.refresh_token),
        }
    }
}

impl fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Exchange a refresh token for a new access token.
///
/// Any non-success status is a failure; 401/403 mean the refresh token
/// itself is expired or revoked.
pub async fn refresh_token(transport: &dyn Transport, refresh: &str) -> Result<TokenResponse> {
    let request =
        ApiRequest::post(REFRESH_PATH).json(serde_json::json!({ "refresh_token": refresh }));
    let response = transport.execute(request).await?;
    parse_token_response(&response, "refresh")
}

/// Log in with username (the account email) and password.
pub async fn login(
    transport: &dyn Transport,
    username: &str,
    password: &str,
) -> Result<TokenResponse> {
    let request =
        ApiRequest::post(LOGIN_PATH).form([("username", username), ("password", password)]);
    let response = transport.execute(request).await?;
    parse_token_response(&response, "login")
}

fn parse_token_response(response: &ApiResponse, operation: &str) -> Result<TokenResponse> {
    let status = response.status;
    if !response.is_success() {
        let body = response.text();
        if status == 401 || status == 403 {
            return Err(Error::InvalidCredentials(format!(
                "{operation} rejected ({status}): {body}"
            )));
        }
        return Err(Error::TokenExchange(format!(
            "{operation} returned {status}: {body}"
        )));
    }

    let token: TokenResponse = response
        .json()
        .map_err(|e| Error::TokenExchange(format!("invalid {operation} response: {e}")))?;
    if token.access_token.is_empty() {
        return Err(Error::TokenExchange(format!(
            "{operation} response carried an empty access token"
        )));
    }
    Ok(token)
}
