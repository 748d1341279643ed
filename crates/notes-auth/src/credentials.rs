//! Credential storage for the session's token pair
//!
//! A client instance serves exactly one identity, so a store holds at most
//! one `CredentialPair`. Every operation replaces or removes the whole pair
//! under one lock: a reader never sees a new refresh token next to a stale
//! access token.
//!
//! `MemoryStore` is volatile. `FileStore` keeps the pair in a JSON file,
//! written with temp-file + rename; credentials live exactly as long as
//! that file does.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use common::Secret;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Access credential plus the optional refresh credential.
///
/// Tokens are opaque. Both are redacted from `Debug` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialPair {
    access: Secret<String>,
    refresh: Option<Secret<String>>,
}

impl CredentialPair {
    pub fn new(access: impl Into<String>, refresh: Option<String>) -> Self {
        Self {
            access: Secret::new(access.into()),
            refresh: refresh.filter(|r| !r.is_empty()).map(Secret::new),
        }
    }

    pub fn access_token(&self) -> &str {
        self.access.expose_str()
    }

    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh.as_ref().map(Secret::expose_str)
    }

    /// The pair that replaces this one after a refresh.
    ///
    /// The endpoint may omit a new refresh token; the current one is kept then.
    pub fn rotate(&self, access: String, refresh: Option<String>) -> Self {
        let rotated = Self::new(access, refresh);
        Self {
            refresh: rotated.refresh.or_else(|| self.refresh.clone()),
            access: rotated.access,
        }
    }
}

/// Boxed future returned by `CredentialStore` operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Holder of the current credential pair.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn CredentialStore>`).
pub trait CredentialStore: Send + Sync {
    /// Current pair, or `None` when unauthenticated.
    fn get(&self) -> StoreFuture<'_, Option<CredentialPair>>;

    /// Replace the whole pair.
    fn set(&self, pair: CredentialPair) -> StoreFuture<'_, ()>;

    /// Remove the pair. Returns whether one was present, so repeated
    /// clears can be told apart from the first.
    fn clear(&self) -> StoreFuture<'_, bool>;
}

/// Volatile store, lost when the process exits.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<Option<CredentialPair>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pair(pair: CredentialPair) -> Self {
        Self {
            state: RwLock::new(Some(pair)),
        }
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self) -> StoreFuture<'_, Option<CredentialPair>> {
        Box::pin(async move { Ok(self.state.read().await.clone()) })
    }

    fn set(&self, pair: CredentialPair) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            *self.state.write().await = Some(pair);
            Ok(())
        })
    }

    fn clear(&self) -> StoreFuture<'_, bool> {
        Box::pin(async move { Ok(self.state.write().await.take().is_some()) })
    }
}

/// On-disk form of a pair.
#[derive(Serialize, Deserialize)]
struct StoredCredentials {
    access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    refresh_token: Option<String>,
}

/// File-backed store.
///
/// The Mutex serializes writes and keeps the in-memory copy in step with
/// the file. Reads clone the in-memory copy and never touch the disk.
pub struct FileStore {
    path: PathBuf,
    state: Mutex<Option<CredentialPair>>,
}

impl FileStore {
    /// Load the pair from `path`.
    ///
    /// A missing file is a cold start: the store begins unauthenticated and
    /// the file is only created by the first `set`.
    pub async fn load(path: PathBuf) -> Result<Self> {
        let state = if path.exists() {
            let contents = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| Error::Io(format!("reading credential file: {e}")))?;
            let stored: StoredCredentials = serde_json::from_str(&contents)
                .map_err(|e| Error::CredentialParse(format!("parsing credential file: {e}")))?;
            info!(path = %path.display(), "loaded credentials");
            Some(CredentialPair::new(stored.access_token, stored.refresh_token))
        } else {
            info!(path = %path.display(), "credential file not found, starting unauthenticated");
            None
        };

        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileStore {
    fn get(&self) -> StoreFuture<'_, Option<CredentialPair>> {
        Box::pin(async move { Ok(self.state.lock().await.clone()) })
    }

    fn set(&self, pair: CredentialPair) -> StoreFuture<'_, ()> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            // Disk first: a failed write leaves the previous pair in place
            write_atomic(&self.path, &pair).await?;
            *state = Some(pair);
            debug!("stored credential pair");
            Ok(())
        })
    }

    fn clear(&self) -> StoreFuture<'_, bool> {
        Box::pin(async move {
            let mut state = self.state.lock().await;
            if state.is_none() {
                return Ok(false);
            }
            // Disk first: a failed delete keeps the pair so the clear can be retried
            match tokio::fs::remove_file(&self.path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(Error::Io(format!("removing credential file: {e}"))),
            }
            *state = None;
            debug!(path = %self.path.display(), "cleared credentials");
            Ok(true)
        })
    }
}

/// Write the pair to a file atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target. Sets file permissions to 0600 since the file holds tokens.
async fn write_atomic(path: &Path, pair: &CredentialPair) -> Result<()> {
    let stored = StoredCredentials {
        access_token: pair.access_token().to_owned(),
        refresh_token: pair.refresh_token().map(str::to_owned),
    };
    let json = serde_json::to_string_pretty(&stored)
        .map_err(|e| Error::CredentialParse(format!("serializing credentials: {e}")))?;

    let dir = path
        .parent()
        .ok_or_else(|| Error::Io("credential path has no parent directory".into()))?;
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| Error::Io(format!("creating credential directory: {e}")))?;

    let tmp_path = dir.join(format!(".credentials.tmp.{}", std::process::id()));

    tokio::fs::write(&tmp_path, json.as_bytes())
        .await
        .map_err(|e| Error::Io(format!("writing temp credential file: {e}")))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(&tmp_path, perms)
            .await
            .map_err(|e| Error::Io(format!("setting credential file permissions: {e}")))?;
    }

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Error::Io(format!("renaming temp credential file: {e}")))?;

    debug!(path = %path.display(), "persisted credentials");
    Ok(())
}
