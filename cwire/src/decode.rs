//! Incremental decoder for the backend's `data: <json>` event framing.
//!
//! ```rust
//! use cwire::{RecordDecoder, StreamEvent};
//!
//! let mut decoder = RecordDecoder::new();
//! let events = decoder.feed(b"data: {\"reply_part\":\"Hi\"}\n\n");
//! assert_eq!(events, vec![StreamEvent::TextDelta("Hi".to_string())]);
//! ```

use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;

use crate::{Completion, NoopWireHooks, StreamEvent, WidgetUpdate, WireError, WireHooks};

/// One wire record, all fields optional and mixed per record.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawRecord {
    reply_part: Option<String>,
    widget_update: Option<RawWidgetUpdate>,
    status: Option<String>,
    prompt: Option<String>,
    reply: Option<String>,
    images: Option<Vec<String>>,
    sources: Option<Vec<Value>>,
    #[serde(rename = "thinkingTime")]
    thinking_time: Option<f64>,
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
    #[serde(rename = "sessionSlug")]
    session_slug: Option<String>,
    session_token: Option<String>,
    aborted: Option<bool>,
    end_of_stream: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawWidgetUpdate {
    tag: String,
    #[serde(default)]
    state: Value,
}

/// Splits buffered bytes on blank-line boundaries, holding back the trailing
/// partial record, and classifies each complete record into `StreamEvent`s.
///
/// A record that fails to parse is reported through the hooks and dropped;
/// it never terminates the stream. Unknown record shapes classify to nothing.
pub struct RecordDecoder {
    buffer: Vec<u8>,
    completion: Completion,
    finished: bool,
    hooks: Arc<dyn WireHooks>,
}

impl Default for RecordDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordDecoder {
    pub fn new() -> Self {
        Self::with_hooks(Arc::new(NoopWireHooks))
    }

    pub fn with_hooks(hooks: Arc<dyn WireHooks>) -> Self {
        Self {
            buffer: Vec::new(),
            completion: Completion::default(),
            finished: false,
            hooks,
        }
    }

    /// Feed arbitrary bytes into the decoder and drain complete records.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend_from_slice(bytes);
        let mut events = Vec::new();

        while let Some(split) = record_boundary(&self.buffer) {
            let record: Vec<u8> = self.buffer.drain(..split + 2).take(split).collect();
            self.apply_raw(&record, &mut events);
        }

        events
    }

    /// True once a record carried the end-of-stream marker; callers may stop
    /// reading early.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn has_buffered(&self) -> bool {
        !self.buffer.iter().all(|byte| byte.is_ascii_whitespace())
    }

    /// The accumulated terminal payload once the body is exhausted.
    pub fn finish(self) -> Completion {
        self.completion
    }

    /// The accumulated terminal payload after a cooperative cancellation.
    pub fn finish_aborted(mut self) -> Completion {
        self.completion.aborted = true;
        self.completion
    }

    fn apply_raw(&mut self, record: &[u8], events: &mut Vec<StreamEvent>) {
        let Ok(text) = std::str::from_utf8(record) else {
            self.hooks
                .on_record_discarded("<non-utf8 record>", "record is not valid UTF-8");
            return;
        };

        let Some(payload) = text.trim().strip_prefix("data:").map(str::trim) else {
            return;
        };

        if payload.is_empty() {
            return;
        }

        match serde_json::from_str::<RawRecord>(payload) {
            Ok(parsed) => self.apply_record(parsed, events),
            Err(error) => self.hooks.on_record_discarded(payload, &error.to_string()),
        }
    }

    fn apply_record(&mut self, record: RawRecord, events: &mut Vec<StreamEvent>) {
        // Session identity may ride on any record, independent of its primary
        // classification.
        if let Some(session_id) = record.session_id {
            events.push(StreamEvent::SessionRenamed {
                session_id,
                slug: record.session_slug,
            });
        }

        if let Some(token) = record.session_token {
            self.completion.session_token = Some(token);
        }

        if record.end_of_stream.unwrap_or(false) {
            self.finished = true;
        }

        if let Some(widget) = record.widget_update {
            if !widget.tag.is_empty() {
                events.push(StreamEvent::WidgetUpdate(WidgetUpdate {
                    tag: widget.tag,
                    state: widget.state,
                }));
            }

            // Widget records never contribute to text accumulation.
            return;
        }

        if record.status.as_deref() == Some("generating_image") {
            events.push(StreamEvent::ImageGenerating {
                prompt: record.prompt,
            });
            return;
        }

        if let Some(delta) = record.reply_part
            && !delta.is_empty()
        {
            events.push(StreamEvent::TextDelta(delta));
        }

        if let Some(reply) = record.reply {
            self.completion.reply = Some(reply);
        }

        if let Some(images) = record.images {
            self.completion.images = images;
        }

        if let Some(sources) = record.sources {
            self.completion.sources = sources;
        }

        if let Some(thinking_time) = record.thinking_time {
            self.completion.thinking_time = Some(thinking_time);
        }

        if record.aborted.unwrap_or(false) {
            self.completion.aborted = true;
        }
    }
}

/// Decode a single non-incremental JSON body into its event sequence.
pub fn decode_document(body: &str) -> Result<Vec<StreamEvent>, WireError> {
    let record: RawRecord = serde_json::from_str(body)
        .map_err(|error| WireError::transport(format!("malformed completion body: {error}")))?;

    let mut decoder = RecordDecoder::new();
    let mut events = Vec::new();
    decoder.apply_record(record, &mut events);
    events.push(StreamEvent::Completion(decoder.finish()));
    Ok(events)
}

fn record_boundary(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|pair| pair == b"\n\n")
}
