//! In-process stand-in for the notes API
//!
//! Accepts exactly one access token on ordinary routes and answers 401
//! otherwise. Special routes:
//! - `REFRESH_PATH`: configurable reply, optionally held until `open_refresh`
//! - `LOGIN_PATH`: issues the accepted token for ada@example.com / hunter22
//! - `/down`: transport failure
//! - `/slow`: held until `open_slow`
//! - `/broken`, `/forbidden`: 500 and 403

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use notes_auth::{LOGIN_PATH, REFRESH_PATH};
use reqwest::header::AUTHORIZATION;
use tokio::sync::Semaphore;
use transport::{ApiRequest, ApiResponse, Body, Transport, TransportError, TransportFuture};

const OPEN: usize = 1024;

pub(crate) struct MockApi {
    accepted: String,
    refresh_reply: ApiResponse,
    refresh_unreachable: AtomicBool,
    refresh_gate: Semaphore,
    slow_gate: Semaphore,
    refresh_calls: AtomicUsize,
    log: Mutex<Vec<ApiRequest>>,
}

impl MockApi {
    pub fn new(accepted: &str) -> Self {
        Self {
            accepted: accepted.to_string(),
            refresh_reply: ApiResponse::new(
                200,
                serde_json::json!({ "access_token": accepted }).to_string(),
            ),
            refresh_unreachable: AtomicBool::new(false),
            refresh_gate: Semaphore::new(OPEN),
            slow_gate: Semaphore::new(0),
            refresh_calls: AtomicUsize::new(0),
            log: Mutex::new(Vec::new()),
        }
    }

    /// Hold refresh calls until `open_refresh`.
    pub fn gated(mut self) -> Self {
        self.refresh_gate = Semaphore::new(0);
        self
    }

    pub fn refresh_returns(mut self, status: u16, body: serde_json::Value) -> Self {
        self.refresh_reply = ApiResponse::new(status, body.to_string());
        self
    }

    pub fn refresh_unreachable(self) -> Self {
        self.refresh_unreachable.store(true, Ordering::SeqCst);
        self
    }

    pub fn open_refresh(&self) {
        self.refresh_gate.add_permits(OPEN);
    }

    pub fn open_slow(&self) {
        self.slow_gate.add_permits(OPEN);
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn requests_to(&self, route: &str) -> usize {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.route() == route)
            .count()
    }

    /// Route of every request received, in send order.
    pub fn routes(&self) -> Vec<String> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.route().to_string())
            .collect()
    }

    /// Authorization header of each request to `route`, in send order.
    pub fn authorizations(&self, route: &str) -> Vec<Option<String>> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.route() == route)
            .map(|r| {
                r.headers
                    .get(AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_owned)
            })
            .collect()
    }

    pub fn refresh_bodies(&self) -> Vec<serde_json::Value> {
        self.log
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.route() == REFRESH_PATH)
            .filter_map(|r| match &r.body {
                Body::Json(value) => Some(value.clone()),
                _ => None,
            })
            .collect()
    }

    fn login_reply(&self, request: &ApiRequest) -> ApiResponse {
        let expected = [
            ("username".to_string(), "ada@example.com".to_string()),
            ("password".to_string(), "hunter22".to_string()),
        ];
        match &request.body {
            Body::Form(fields) if fields.as_slice() == expected.as_slice() => ApiResponse::new(
                200,
                serde_json::json!({
                    "access_token": self.accepted,
                    "refresh_token": "rt_login",
                    "token_type": "bearer"
                })
                .to_string(),
            ),
            _ => ApiResponse::new(401, r#"{"detail":"Identifiants incorrects"}"#),
        }
    }
}

impl Transport for MockApi {
    fn id(&self) -> &str {
        "mock"
    }

    fn execute(&self, request: ApiRequest) -> TransportFuture<'_> {
        Box::pin(async move {
            self.log.lock().unwrap().push(request.clone());
            let route = request.route().to_string();

            if route == REFRESH_PATH {
                self.refresh_calls.fetch_add(1, Ordering::SeqCst);
                let _permit = self.refresh_gate.acquire().await.unwrap();
                if self.refresh_unreachable.load(Ordering::SeqCst) {
                    return Err(TransportError::Connect("connection refused".into()));
                }
                return Ok(self.refresh_reply.clone());
            }

            match route.as_str() {
                LOGIN_PATH => return Ok(self.login_reply(&request)),
                "/down" => return Err(TransportError::Connect("connection refused".into())),
                "/broken" => return Ok(ApiResponse::new(500, "internal error")),
                "/forbidden" => return Ok(ApiResponse::new(403, r#"{"detail":"forbidden"}"#)),
                "/slow" => {
                    let _permit = self.slow_gate.acquire().await.unwrap();
                }
                _ => {}
            }

            let expected = format!("Bearer {}", self.accepted);
            let presented = request
                .headers
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok());
            if presented == Some(expected.as_str()) {
                Ok(ApiResponse::new(
                    200,
                    serde_json::json!({ "route": route }).to_string(),
                ))
            } else {
                Ok(ApiResponse::new(401, r#"{"detail":"Token invalide"}"#))
            }
        })
    }
}

/// Poll `condition` until it holds, yielding to spawned tasks in between.
pub(crate) async fn wait_until(condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("condition not reached within 5s");
}
