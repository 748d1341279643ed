//! Account creation
//!
//! Registration is unauthenticated and does not log the user in: the
//! caller follows up with `token::login`.

use serde::Serialize;
use transport::{ApiResponse, Transport};

use crate::constants::REGISTER_PATH;
use crate::error::{Error, Result};

#[derive(Serialize)]
pub struct NewAccount<'a> {
    pub email: &'a str,
    pub password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<&'a str>,
}

/// Create an account. Returns the created user as the API describes it.
pub async fn register(
    transport: &dyn Transport,
    account: &NewAccount<'_>,
) -> Result<serde_json::Value> {
    let body = serde_json::to_value(account)
        .map_err(|e| Error::CredentialParse(format!("encoding registration: {e}")))?;
    let request = transport::ApiRequest::post(REGISTER_PATH).json(body);
    let response = transport.execute(request).await?;

    if !response.is_success() {
        return Err(Error::Registration {
            status: response.status,
            detail: error_detail(&response),
        });
    }
    response
        .json()
        .map_err(|e| Error::CredentialParse(format!("invalid registration response: {e}")))
}

/// The API reports failures as `{"detail": "..."}`; validation errors carry
/// a list instead, which is returned as raw JSON.
fn error_detail(response: &ApiResponse) -> String {
    match response.json::<serde_json::Value>() {
        Ok(serde_json::Value::Object(map)) => match map.get("detail") {
            Some(serde_json::Value::String(detail)) => detail.clone(),
            Some(other) => other.to_string(),
            None => response.text(),
        },
        _ => response.text(),
    }
}
