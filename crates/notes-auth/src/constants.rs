//! Routes and defaults of the notes API
//!
//! Paths are relative to the API base URL; the transport joins them.

/// Base URL of a locally running API
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000/api/v1";

/// Exchanges a refresh token for a new access token
pub const REFRESH_PATH: &str = "/auth/refresh-token";

/// Password login (form encoded `username` + `password`)
pub const LOGIN_PATH: &str = "/auth/login";

/// Account creation (JSON body)
pub const REGISTER_PATH: &str = "/auth/register";

/// Authorization scheme prefix
pub const BEARER_PREFIX: &str = "Bearer ";
