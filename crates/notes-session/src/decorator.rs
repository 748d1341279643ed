//! Authorization header injection
//!
//! Runs on every outbound call, replays included, and reads the store each
//! time: a replay after a refresh carries the new token, never a cached one.

use notes_auth::{BEARER_PREFIX, CredentialStore};
use reqwest::header::{AUTHORIZATION, HeaderValue};
use tracing::trace;
use transport::ApiRequest;

use crate::error::{Error, Result};

/// Set `Authorization: Bearer <access>` from the store's current pair.
///
/// Without a stored pair the request is returned unmodified and the server
/// decides whether the route needs authentication.
pub async fn decorate(store: &dyn CredentialStore, mut request: ApiRequest) -> Result<ApiRequest> {
    match store.get().await? {
        Some(pair) => {
            let mut value = HeaderValue::from_str(&format!("{BEARER_PREFIX}{}", pair.access_token()))
                .map_err(|_| Error::InvalidToken)?;
            value.set_sensitive(true);
            request.headers.insert(AUTHORIZATION, value);
        }
        None => trace!(request_id = %request.id, "no credentials, sending unauthenticated"),
    }
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use notes_auth::{CredentialPair, MemoryStore};

    fn bearer(request: &ApiRequest) -> Option<&str> {
        request
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
    }

    #[tokio::test]
    async fn sets_bearer_from_store() {
        let store = MemoryStore::with_pair(CredentialPair::new("at_1", Some("rt_1".into())));
        let request = decorate(&store, ApiRequest::get("/users/me")).await.unwrap();
        assert_eq!(bearer(&request), Some("Bearer at_1"));
        assert!(request.headers.get(AUTHORIZATION).unwrap().is_sensitive());
    }

    #[tokio::test]
    async fn replaces_caller_supplied_authorization() {
        let store = MemoryStore::with_pair(CredentialPair::new("at_1", None));
        let request = ApiRequest::get("/notes/")
            .header(AUTHORIZATION, HeaderValue::from_static("Bearer stale"));
        let request = decorate(&store, request).await.unwrap();
        assert_eq!(bearer(&request), Some("Bearer at_1"));
        assert_eq!(request.headers.get_all(AUTHORIZATION).iter().count(), 1);
    }

    #[tokio::test]
    async fn leaves_request_untouched_without_credentials() {
        let store = MemoryStore::new();
        let request = decorate(&store, ApiRequest::get("/health")).await.unwrap();
        assert!(bearer(&request).is_none());
        assert!(request.headers.is_empty());
    }

    #[tokio::test]
    async fn reads_the_store_on_every_call() {
        let store = MemoryStore::with_pair(CredentialPair::new("at_old", None));
        let original = ApiRequest::get("/notes/");

        let first = decorate(&store, original.clone()).await.unwrap();
        store
            .set(CredentialPair::new("at_new", None))
            .await
            .unwrap();
        let replay = decorate(&store, original).await.unwrap();

        assert_eq!(bearer(&first), Some("Bearer at_old"));
        assert_eq!(bearer(&replay), Some("Bearer at_new"));
    }

    #[tokio::test]
    async fn rejects_token_that_cannot_be_a_header() {
        let store = MemoryStore::with_pair(CredentialPair::new("bad\ntoken", None));
        let err = decorate(&store, ApiRequest::get("/notes/")).await.unwrap_err();
        assert!(matches!(err, Error::InvalidToken));
    }
}
