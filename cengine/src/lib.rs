//! Conversation orchestration for the confab assistant client.

mod engine;
mod error;
mod history;
mod hooks;
mod normalize;
mod resolver;
mod store;
mod types;

pub mod prelude {
    pub use crate::{
        AttemptKind, AttemptPhase, ChatEngine, ChatEngineBuilder, ChatMessage, EngineError,
        EngineErrorKind, EngineHooks, EnginePolicy, FileRef, InMemoryKeyValueStore, KeyValueStore,
        MessageRole, NoopEngineHooks, OutgoingFile, SessionAccess, SessionDirectory, Variant,
        VariantDirection, history_for_backend, slugify,
    };
    pub use ccommon::{MessageId, MetadataMap, SendOptions, SessionId};
    pub use cwire::{
        CancelToken, Completion, GenerationTransport, SessionApi, StreamEvent, WidgetUpdate,
        WireError, WireErrorKind,
    };
}

pub use ccommon::{MessageId, MetadataMap, SendOptions, SessionId};
pub use engine::{ChatEngine, ChatEngineBuilder, EnginePolicy};
pub use error::{EngineError, EngineErrorKind};
pub use history::history_for_backend;
pub use hooks::{EngineHooks, NoopEngineHooks};
pub use resolver::{SessionDirectory, slugify};
pub use store::{InMemoryKeyValueStore, KeyValueStore};
pub use types::{
    AttemptKind, AttemptPhase, ChatMessage, FileRef, MessageRole, OutgoingFile, SessionAccess,
    Variant, VariantDirection,
};
