//! Typed helpers over the authenticated client
//!
//! Each helper is one route of the notes API and returns the JSON body as
//! the server sent it. Non-2xx statuses other than a session-ending 401
//! become `Error::Status`.

use std::path::Path;

use bytes::Bytes;
use notes_session::AuthClient;
use serde_json::Value;
use tracing::debug;
use transport::{ApiRequest, FilePart};

use crate::error::{Error, Result};

pub struct NotesApi {
    client: AuthClient,
}

impl NotesApi {
    pub fn new(client: AuthClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &AuthClient {
        &self.client
    }

    pub async fn me(&self) -> Result<Value> {
        self.call(ApiRequest::get("/users/me")).await
    }

    pub async fn list_media(&self) -> Result<Value> {
        self.call(ApiRequest::get("/media/")).await
    }

    pub async fn list_notes(&self) -> Result<Value> {
        self.call(ApiRequest::get("/notes/")).await
    }

    pub async fn get_note(&self, id: &str) -> Result<Value> {
        self.call(ApiRequest::get(format!("/notes/{id}"))).await
    }

    pub async fn media_history(&self) -> Result<Value> {
        self.call(ApiRequest::get("/history/media")).await
    }

    pub async fn notes_history(&self) -> Result<Value> {
        self.call(ApiRequest::get("/history/notes")).await
    }

    pub async fn start_live(&self) -> Result<Value> {
        self.call(ApiRequest::post("/live/start")).await
    }

    pub async fn stop_live(&self, session_id: &str) -> Result<Value> {
        self.call(ApiRequest::post(format!("/live/stop/{session_id}")))
            .await
    }

    pub async fn list_exports(&self) -> Result<Value> {
        self.call(ApiRequest::get("/export/")).await
    }

    pub async fn health(&self) -> Result<Value> {
        self.call(ApiRequest::get("/health/")).await
    }

    /// Upload a media file as `multipart/form-data` field `file`.
    pub async fn upload_media(&self, path: &Path) -> Result<Value> {
        let data = tokio::fs::read(path).await.map_err(|source| Error::File {
            path: path.to_path_buf(),
            source,
        })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        debug!(file_name = %file_name, bytes = data.len(), "uploading media");

        let part = FilePart {
            field: "file".into(),
            mime: mime_for(path).into(),
            file_name,
            data: Bytes::from(data),
        };
        self.call(ApiRequest::post("/media/upload").multipart(part))
            .await
    }

    async fn call(&self, request: ApiRequest) -> Result<Value> {
        let response = self.client.send(request).await?;
        if !response.is_success() {
            return Err(Error::Status {
                status: response.status,
                body: response.text(),
            });
        }
        if response.body.is_empty() {
            return Ok(Value::Null);
        }
        response.json().map_err(|e| Error::Decode(e.to_string()))
    }
}

/// Content type from the file extension; the bytes are never inspected.
fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("mp3") => "audio/mpeg",
        Some("wav") => "audio/wav",
        Some("m4a") => "audio/mp4",
        Some("ogg") => "audio/ogg",
        Some("webm") => "video/webm",
        Some("mp4") => "video/mp4",
        Some("pdf") => "application/pdf",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("txt") => "text/plain",
        _ => "application/octet-stream",
    }
}
