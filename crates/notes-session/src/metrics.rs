//! Counters for the authenticated request layer
//!
//! - `auth_refresh_total` (counter): label `outcome` = success | failure | no_refresh_token
//! - `auth_waiters_queued_total` (counter)
//! - `auth_replays_total` (counter)
//! - `auth_session_terminated_total` (counter): label `reason`
//!
//! Without an installed recorder these calls are no-ops.

use crate::guard::TerminationReason;

pub fn record_refresh(outcome: &'static str) {
    metrics::counter!("auth_refresh_total", "outcome" => outcome).increment(1);
}

pub fn record_waiter_queued() {
    metrics::counter!("auth_waiters_queued_total").increment(1);
}

pub fn record_replay() {
    metrics::counter!("auth_replays_total").increment(1);
}

pub fn record_termination(reason: TerminationReason) {
    metrics::counter!("auth_session_terminated_total", "reason" => reason.label()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;
    use metrics_exporter_prometheus::PrometheusBuilder;

    #[test]
    fn record_functions_do_not_panic_without_recorder() {
        record_refresh("success");
        record_waiter_queued();
        record_replay();
        record_termination(TerminationReason::RetryExhausted);
    }

    #[test]
    fn counters_render_with_labels() {
        // build_recorder() instead of install_recorder(): only one global
        // recorder may exist per process
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let _guard = metrics::set_default_local_recorder(&recorder);

        record_refresh("success");
        record_refresh("failure");
        record_replay();
        record_termination(TerminationReason::NoRefreshToken);

        let output = handle.render();
        assert!(output.contains("auth_refresh_total"), "got: {output}");
        assert!(output.contains("outcome=\"success\""));
        assert!(output.contains("outcome=\"failure\""));
        assert!(output.contains("auth_replays_total"));
        assert!(output.contains("reason=\"no_refresh_token\""));
    }
}
