//! Retry policy for rejected requests
//!
//! A 401 is recoverable at most once per logical request, and never on the
//! refresh route itself: refreshing to fix a failed refresh would loop.

use notes_auth::REFRESH_PATH;
use transport::ApiRequest;

use crate::guard::TerminationReason;

/// One logical request as it moves through the pipeline.
///
/// The original request is kept undecorated so a replay re-reads the
/// current credentials. `generation` is the credential generation the last
/// dispatch was sent under.
#[derive(Debug, Clone)]
pub struct Attempt {
    request: ApiRequest,
    retried: bool,
    generation: u64,
}

impl Attempt {
    pub fn new(request: ApiRequest) -> Self {
        Self {
            request,
            retried: false,
            generation: 0,
        }
    }

    pub fn request(&self) -> &ApiRequest {
        &self.request
    }

    pub fn is_retried(&self) -> bool {
        self.retried
    }

    pub(crate) fn mark_retried(&mut self) {
        self.retried = true;
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn set_generation(&mut self, generation: u64) {
        self.generation = generation;
    }
}

/// Decides whether a 401 may trigger refresh-and-replay.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    refresh_path: String,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(REFRESH_PATH)
    }
}

impl RetryPolicy {
    pub fn new(refresh_path: impl Into<String>) -> Self {
        Self {
            refresh_path: refresh_path.into(),
        }
    }

    /// Only 401 triggers recovery; 403 and everything else pass through.
    pub fn is_unauthorized(status: u16) -> bool {
        status == 401
    }

    pub fn targets_refresh(&self, request: &ApiRequest) -> bool {
        request.route().trim_end_matches('/') == self.refresh_path.trim_end_matches('/')
    }

    /// `None` when the rejected attempt may be recovered, otherwise the
    /// reason the session has to end.
    pub fn terminal_reason(&self, attempt: &Attempt) -> Option<TerminationReason> {
        if self.targets_refresh(attempt.request()) {
            Some(TerminationReason::RefreshEndpointRejected)
        } else if attempt.is_retried() {
            Some(TerminationReason::RetryExhausted)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_401_is_unauthorized() {
        assert!(RetryPolicy::is_unauthorized(401));
        for status in [200, 400, 403, 404, 422, 500] {
            assert!(!RetryPolicy::is_unauthorized(status), "{status}");
        }
    }

    #[test]
    fn fresh_attempt_is_recoverable() {
        let policy = RetryPolicy::default();
        let attempt = Attempt::new(ApiRequest::get("/notes/"));
        assert_eq!(policy.terminal_reason(&attempt), None);
    }

    #[test]
    fn retried_attempt_is_terminal() {
        let policy = RetryPolicy::default();
        let mut attempt = Attempt::new(ApiRequest::get("/notes/"));
        attempt.mark_retried();
        assert_eq!(
            policy.terminal_reason(&attempt),
            Some(TerminationReason::RetryExhausted)
        );
    }

    #[test]
    fn refresh_route_is_exempt_even_with_query_or_trailing_slash() {
        let policy = RetryPolicy::default();
        for path in [
            "/auth/refresh-token",
            "/auth/refresh-token/",
            "/auth/refresh-token?source=cli",
        ] {
            let attempt = Attempt::new(ApiRequest::post(path));
            assert_eq!(
                policy.terminal_reason(&attempt),
                Some(TerminationReason::RefreshEndpointRejected),
                "{path}"
            );
        }
    }

    #[test]
    fn similar_routes_are_not_the_refresh_route() {
        let policy = RetryPolicy::default();
        let attempt = Attempt::new(ApiRequest::post("/auth/refresh-token-status"));
        assert_eq!(policy.terminal_reason(&attempt), None);
    }

    #[test]
    fn marking_retried_is_sticky_across_clones() {
        let mut attempt = Attempt::new(ApiRequest::get("/notes/"));
        attempt.set_generation(4);
        attempt.mark_retried();
        let copy = attempt.clone();
        assert!(copy.is_retried());
        assert_eq!(copy.generation(), 4);
    }
}
