//! Tracing-based observability hooks for engine attempts and the wire layer.
//!
//! ```rust
//! use cobserve::TracingChatHooks;
//! use cengine::EngineHooks;
//!
//! fn accepts_engine_hooks(_hooks: &dyn EngineHooks) {}
//!
//! let hooks = TracingChatHooks;
//! accepts_engine_hooks(&hooks);
//! ```

use std::time::Duration;

use ccommon::SessionId;
use cengine::{AttemptKind, AttemptPhase, EngineHooks};
use cwire::{WireError, WireHooks};

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingChatHooks;

impl EngineHooks for TracingChatHooks {
    fn on_attempt_phase(&self, session_id: &SessionId, kind: AttemptKind, phase: AttemptPhase) {
        tracing::info!(
            phase = "engine",
            event = "attempt_phase",
            session = %session_id,
            kind = ?kind,
            attempt_phase = ?phase
        );
    }

    fn on_generation_finished(
        &self,
        session_id: &SessionId,
        kind: AttemptKind,
        elapsed: Duration,
    ) {
        tracing::info!(
            phase = "engine",
            event = "generation_finished",
            session = %session_id,
            kind = ?kind,
            elapsed_ms = elapsed.as_millis() as u64
        );
    }
}

impl WireHooks for TracingChatHooks {
    fn on_stream_started(&self, session_id: &SessionId) {
        tracing::debug!(
            phase = "wire",
            event = "stream_started",
            session = %session_id
        );
    }

    fn on_record_discarded(&self, raw: &str, error: &str) {
        tracing::warn!(
            phase = "wire",
            event = "record_discarded",
            record_bytes = raw.len(),
            error
        );
    }

    fn on_retry_scheduled(
        &self,
        operation: &str,
        attempt: u32,
        delay: Duration,
        error: &WireError,
    ) {
        tracing::warn!(
            phase = "wire",
            event = "retry_scheduled",
            operation,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error_kind = ?error.kind,
            retryable = error.retryable,
            error = %error
        );
    }

    fn on_stream_finished(&self, session_id: &SessionId, aborted: bool) {
        tracing::debug!(
            phase = "wire",
            event = "stream_finished",
            session = %session_id,
            aborted
        );
    }
}
