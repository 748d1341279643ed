//! reqwest-backed transport
//!
//! Joins each request path onto the configured API base URL, maps the
//! `Body` variants onto reqwest's body builders, and returns the upstream
//! response verbatim (error statuses included).

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use tracing::{debug, warn};

use crate::request::{ApiRequest, ApiResponse, Body};
use crate::{Transport, TransportError, TransportFuture};

/// Transport that performs real HTTP calls.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

impl Transport for HttpTransport {
    fn id(&self) -> &str {
        "http"
    }

    fn execute(&self, request: ApiRequest) -> TransportFuture<'_> {
        Box::pin(async move {
            let ApiRequest {
                id,
                method,
                path,
                headers,
                body,
            } = request;
            let url = self.url_for(&path);

            let builder = self
                .client
                .request(method.clone(), &url)
                .headers(headers)
                .timeout(self.timeout);

            let builder = match body {
                Body::Empty => builder,
                Body::Json(value) => builder.json(&value),
                Body::Form(fields) => builder.form(&fields),
                Body::Raw { content_type, data } => builder
                    .header(reqwest::header::CONTENT_TYPE, content_type)
                    .body(data),
                Body::Multipart(file) => {
                    let part = Part::bytes(file.data.to_vec())
                        .file_name(file.file_name)
                        .mime_str(&file.mime)
                        .map_err(|e| TransportError::Request(format!("invalid mime type: {e}")))?;
                    builder.multipart(Form::new().part(file.field, part))
                }
            };

            let response = builder.send().await.map_err(|e| {
                warn!(request_id = %id, method = %method, path = %path, error = %e, "request failed");
                classify(&e)
            })?;

            let status = response.status().as_u16();
            let response_headers = response.headers().clone();
            let bytes = response
                .bytes()
                .await
                .map_err(|e| TransportError::Body(e.to_string()))?;

            debug!(request_id = %id, method = %method, path = %path, status, "response received");

            Ok(ApiResponse {
                status,
                headers: response_headers,
                body: bytes,
            })
        })
    }
}

/// Map a reqwest failure onto the transport taxonomy.
fn classify(err: &reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout(err.to_string())
    } else if err.is_connect() {
        TransportError::Connect(err.to_string())
    } else {
        TransportError::Request(err.to_string())
    }
}
