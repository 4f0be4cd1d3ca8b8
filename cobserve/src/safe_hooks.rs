use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use ccommon::SessionId;
use cengine::{AttemptKind, AttemptPhase, EngineHooks};
use cwire::{WireError, WireHooks};

pub struct SafeEngineHooks<H> {
    inner: H,
}

impl<H> SafeEngineHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> EngineHooks for SafeEngineHooks<H>
where
    H: EngineHooks,
{
    fn on_attempt_phase(&self, session_id: &SessionId, kind: AttemptKind, phase: AttemptPhase) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_attempt_phase(session_id, kind, phase)
        }));
    }

    fn on_generation_finished(
        &self,
        session_id: &SessionId,
        kind: AttemptKind,
        elapsed: Duration,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_generation_finished(session_id, kind, elapsed)
        }));
    }
}

pub struct SafeWireHooks<H> {
    inner: H,
}

impl<H> SafeWireHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> WireHooks for SafeWireHooks<H>
where
    H: WireHooks,
{
    fn on_stream_started(&self, session_id: &SessionId) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_stream_started(session_id)
        }));
    }

    fn on_record_discarded(&self, raw: &str, error: &str) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_record_discarded(raw, error)
        }));
    }

    fn on_retry_scheduled(
        &self,
        operation: &str,
        attempt: u32,
        delay: Duration,
        error: &WireError,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_retry_scheduled(operation, attempt, delay, error)
        }));
    }

    fn on_stream_finished(&self, session_id: &SessionId, aborted: bool) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_stream_finished(session_id, aborted)
        }));
    }
}
