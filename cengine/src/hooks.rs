//! Runtime hook contracts for observing engine attempts.
//!
//! ```rust
//! use cengine::{EngineHooks, NoopEngineHooks};
//!
//! fn accepts_hooks(_hooks: &dyn EngineHooks) {}
//!
//! let hooks = NoopEngineHooks;
//! accepts_hooks(&hooks);
//! ```

use std::time::Duration;

use ccommon::SessionId;

use crate::types::{AttemptKind, AttemptPhase};

/// Observation points around the attempt state machine.
///
/// Whether a "generation finished" notification reaches the user is the
/// hook implementation's policy; the engine reports every user-initiated
/// attempt and nothing else (session loads are not attempts).
pub trait EngineHooks: Send + Sync {
    fn on_attempt_phase(&self, _session_id: &SessionId, _kind: AttemptKind, _phase: AttemptPhase) {}

    fn on_generation_finished(
        &self,
        _session_id: &SessionId,
        _kind: AttemptKind,
        _elapsed: Duration,
    ) {
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEngineHooks;

impl EngineHooks for NoopEngineHooks {}
