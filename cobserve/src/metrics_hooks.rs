//! Metrics-based observability hooks for engine attempts and the wire layer.
//!
//! ```rust
//! use cobserve::MetricsChatHooks;
//! use cwire::WireHooks;
//!
//! fn accepts_wire_hooks(_hooks: &dyn WireHooks) {}
//!
//! let hooks = MetricsChatHooks;
//! accepts_wire_hooks(&hooks);
//! ```

use std::time::Duration;

use ccommon::SessionId;
use cengine::{AttemptKind, AttemptPhase, EngineHooks};
use cwire::{WireError, WireHooks};

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsChatHooks;

impl EngineHooks for MetricsChatHooks {
    fn on_attempt_phase(&self, _session_id: &SessionId, kind: AttemptKind, phase: AttemptPhase) {
        metrics::counter!(
            "confab_attempt_phase_total",
            "kind" => format!("{kind:?}"),
            "attempt_phase" => format!("{phase:?}")
        )
        .increment(1);
    }

    fn on_generation_finished(
        &self,
        _session_id: &SessionId,
        kind: AttemptKind,
        elapsed: Duration,
    ) {
        metrics::counter!(
            "confab_generation_finished_total",
            "kind" => format!("{kind:?}")
        )
        .increment(1);
        metrics::histogram!(
            "confab_generation_seconds",
            "kind" => format!("{kind:?}")
        )
        .record(elapsed.as_secs_f64());
    }
}

impl WireHooks for MetricsChatHooks {
    fn on_stream_started(&self, _session_id: &SessionId) {
        metrics::counter!("confab_stream_started_total").increment(1);
    }

    fn on_record_discarded(&self, _raw: &str, _error: &str) {
        metrics::counter!("confab_record_discarded_total").increment(1);
    }

    fn on_retry_scheduled(
        &self,
        operation: &str,
        _attempt: u32,
        delay: Duration,
        error: &WireError,
    ) {
        metrics::counter!(
            "confab_retry_scheduled_total",
            "operation" => operation.to_string(),
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!(
            "confab_retry_delay_seconds",
            "operation" => operation.to_string()
        )
        .record(delay.as_secs_f64());
    }

    fn on_stream_finished(&self, _session_id: &SessionId, aborted: bool) {
        metrics::counter!(
            "confab_stream_finished_total",
            "aborted" => aborted.to_string()
        )
        .increment(1);
    }
}
