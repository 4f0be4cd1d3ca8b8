//! Streaming event contracts and in-memory stream utilities.
//!
//! ```rust
//! use cwire::{BoxedEventStream, StreamEvent, VecEventStream};
//!
//! let stream = VecEventStream::new(vec![Ok(StreamEvent::TextDelta("hello".into()))]);
//! let _boxed: BoxedEventStream<'static> = Box::pin(stream);
//! ```

use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures_core::Stream;
use serde_json::Value;

use crate::WireError;

/// One widget mini-app state snapshot pushed mid-generation.
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetUpdate {
    pub tag: String,
    pub state: Value,
}

/// Terminal payload of one generation attempt.
///
/// Fields accumulate across stream records; `reply`, when present, is the
/// backend's authoritative full text and wins over concatenated deltas.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Completion {
    pub reply: Option<String>,
    pub images: Vec<String>,
    pub sources: Vec<Value>,
    pub thinking_time: Option<f64>,
    pub session_token: Option<String>,
    pub aborted: bool,
}

impl Completion {
    pub fn aborted() -> Self {
        Self {
            aborted: true,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    TextDelta(String),
    WidgetUpdate(WidgetUpdate),
    ImageGenerating { prompt: Option<String> },
    SessionRenamed { session_id: String, slug: Option<String> },
    Completion(Completion),
}

/// Generation stream contract.
///
/// Invariants for consumers:
/// - Events are emitted in wire order.
/// - Zero or more non-terminal events precede exactly one terminal item:
///   `Completion` or an `Err`.
/// - Cancellation terminates with `Completion { aborted: true }`, never `Err`.
/// - Once the stream yields `None`, it must not yield additional items.
pub trait GenerationEventStream: Stream<Item = Result<StreamEvent, WireError>> + Send {}

impl<T> GenerationEventStream for T where T: Stream<Item = Result<StreamEvent, WireError>> + Send {}

pub type BoxedEventStream<'a> = Pin<Box<dyn GenerationEventStream + 'a>>;

#[derive(Debug)]
pub struct VecEventStream {
    events: VecDeque<Result<StreamEvent, WireError>>,
}

impl VecEventStream {
    pub fn new(events: Vec<Result<StreamEvent, WireError>>) -> Self {
        Self {
            events: events.into(),
        }
    }
}

impl Stream for VecEventStream {
    type Item = Result<StreamEvent, WireError>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
    ) -> Poll<Option<Result<StreamEvent, WireError>>> {
        Poll::Ready(self.events.pop_front())
    }
}
