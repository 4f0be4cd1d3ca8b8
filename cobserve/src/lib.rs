//! Production-friendly observability hooks for the chat engine and wire layer.
//!
//! ```rust
//! use cobserve::{MetricsChatHooks, SafeEngineHooks, TracingChatHooks};
//!
//! let _engine_hooks = SafeEngineHooks::new(TracingChatHooks);
//! let _metrics = MetricsChatHooks;
//! ```

mod metrics_hooks;
mod safe_hooks;
mod tracing_hooks;

pub use metrics_hooks::MetricsChatHooks;
pub use safe_hooks::{SafeEngineHooks, SafeWireHooks};
pub use tracing_hooks::TracingChatHooks;

pub mod prelude {
    pub use crate::{MetricsChatHooks, SafeEngineHooks, SafeWireHooks, TracingChatHooks};
}
