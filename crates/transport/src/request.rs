//! Request and response descriptors
//!
//! `ApiRequest` is the unit every layer above the transport works with.
//! It is cheap to clone so the same logical request can be replayed after
//! a credential refresh. Payloads are carried opaquely: nothing above the
//! transport looks inside `Body`.

use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;

/// A file attached as `multipart/form-data`.
#[derive(Debug, Clone)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub mime: String,
    pub data: Bytes,
}

/// Request payload.
#[derive(Debug, Clone, Default)]
pub enum Body {
    #[default]
    Empty,
    Json(serde_json::Value),
    /// `application/x-www-form-urlencoded` fields, in order
    Form(Vec<(String, String)>),
    Raw {
        content_type: String,
        data: Bytes,
    },
    Multipart(FilePart),
}

/// A logical API call relative to the configured base URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    /// Correlation id for logs (`req_<uuid>`), stable across replays
    pub id: String,
    pub method: Method,
    /// Path and optional query, e.g. `/notes/?limit=10`
    pub path: String,
    pub headers: HeaderMap,
    pub body: Body,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            id: format!("req_{}", uuid::Uuid::new_v4().as_simple()),
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            body: Body::Empty,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn json(mut self, value: serde_json::Value) -> Self {
        self.body = Body::Json(value);
        self
    }

    pub fn form<I, K, V>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.body = Body::Form(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    pub fn multipart(mut self, part: FilePart) -> Self {
        self.body = Body::Multipart(part);
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// The path without its query string.
    pub fn route(&self) -> &str {
        self.path
            .split_once('?')
            .map_or(self.path.as_str(), |(route, _)| route)
    }
}

/// Raw outcome of a call: status, headers and body bytes.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ids_are_prefixed_and_unique() {
        let a = ApiRequest::get("/notes/");
        let b = ApiRequest::get("/notes/");
        assert!(a.id.starts_with("req_"), "got: {}", a.id);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn clone_keeps_request_id() {
        let original = ApiRequest::post("/live/start");
        let replay = original.clone();
        assert_eq!(original.id, replay.id);
    }

    #[test]
    fn route_strips_query_string() {
        let req = ApiRequest::get("/history/search?q=meeting");
        assert_eq!(req.route(), "/history/search");
        assert_eq!(ApiRequest::get("/media/").route(), "/media/");
    }

    #[test]
    fn form_collects_fields_in_order() {
        let req = ApiRequest::post("/auth/login").form([("username", "a@b.c"), ("password", "pw")]);
        match req.body {
            Body::Form(fields) => {
                assert_eq!(fields[0], ("username".to_string(), "a@b.c".to_string()));
                assert_eq!(fields[1], ("password".to_string(), "pw".to_string()));
            }
            other => panic!("expected form body, got {other:?}"),
        }
    }

    #[test]
    fn response_success_range() {
        assert!(ApiResponse::new(200, "").is_success());
        assert!(ApiResponse::new(204, "").is_success());
        assert!(!ApiResponse::new(401, "").is_success());
        assert!(!ApiResponse::new(500, "").is_success());
    }

    #[test]
    fn response_json_decodes_body() {
        let resp = ApiResponse::new(200, r#"{"status":"ok"}"#);
        let value: serde_json::Value = resp.json().unwrap();
        assert_eq!(value["status"], "ok");
        assert_eq!(resp.text(), r#"{"status":"ok"}"#);
    }
}
