//! Wire protocol client for the confab generation backend.

mod cancel;
mod decode;
mod error;
mod event;
mod request;
mod resilience;
mod sessions;
mod transport;

pub use cancel::CancelToken;
pub use decode::{RecordDecoder, decode_document};
pub use error::{WireError, WireErrorKind};
pub use event::{
    BoxedEventStream, Completion, GenerationEventStream, StreamEvent, VecEventStream, WidgetUpdate,
};
pub use request::{
    ApiPart, ApiRole, ApiTurn, AttachmentUpload, FilePart, GenerateRequest, ImagePart,
};
pub use resilience::{NoopWireHooks, RetryPolicy, WireHooks, execute_with_retry};
pub use sessions::{
    HttpSessionApi, MAX_SESSION_PAGES, RawFileRef, RawImageRef, RawPart, RawTurn, SessionApi,
    SessionHistory, SessionListQuery, SessionPage, SessionSummary, ShareState, list_all_sessions,
};
pub use transport::{GenerationTransport, HttpGenerationTransport, WireFuture};
