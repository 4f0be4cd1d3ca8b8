//! Generation transport trait and reqwest-based HTTP implementation.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_stream::try_stream;
use futures_util::StreamExt;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;

use crate::decode::{RecordDecoder, decode_document};
use crate::{
    BoxedEventStream, CancelToken, Completion, GenerateRequest, NoopWireHooks, StreamEvent,
    VecEventStream, WireError, WireHooks,
};

pub type WireFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Capability to run one generation attempt against the backend.
///
/// The returned stream yields zero or more non-terminal events followed by
/// exactly one `Completion`, or ends with a single error. Cancellation is
/// observed at every read boundary and terminates with
/// `Completion { aborted: true }`; it is never reported as an error.
pub trait GenerationTransport: Send + Sync {
    fn generate<'a>(
        &'a self,
        request: GenerateRequest,
        cancel: CancelToken,
    ) -> WireFuture<'a, Result<BoxedEventStream<'a>, WireError>>;
}

#[derive(Clone)]
pub struct HttpGenerationTransport {
    client: Client,
    base_url: String,
    hooks: Arc<dyn WireHooks>,
}

impl HttpGenerationTransport {
    pub fn new(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            hooks: Arc::new(NoopWireHooks),
        }
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn WireHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

impl GenerationTransport for HttpGenerationTransport {
    fn generate<'a>(
        &'a self,
        request: GenerateRequest,
        cancel: CancelToken,
    ) -> WireFuture<'a, Result<BoxedEventStream<'a>, WireError>> {
        Box::pin(async move {
            let form = build_form(&request)?;
            let mut builder = self.client.post(self.endpoint("chat")).multipart(form);
            if let Some(token) = &request.guest_token {
                builder = builder.bearer_auth(token);
            }

            let hooks = Arc::clone(&self.hooks);
            let session_id = request.session_id.clone();
            hooks.on_stream_started(&session_id);

            let sent = tokio::select! {
                _ = cancel.cancelled() => None,
                result = builder.send() => Some(result),
            };

            let response = match sent {
                None => {
                    hooks.on_stream_finished(&session_id, true);
                    return Ok(single_event_stream(StreamEvent::Completion(
                        Completion::aborted(),
                    )));
                }
                Some(result) => result.map_err(|err| {
                    if err.is_timeout() {
                        WireError::timeout(err.to_string())
                    } else {
                        WireError::transport(err.to_string())
                    }
                })?,
            };

            if !response.status().is_success() {
                return Err(error_from_response(response).await);
            }

            if !is_event_stream(&response) {
                let body = response
                    .text()
                    .await
                    .map_err(|err| WireError::transport(err.to_string()))?;
                let events = decode_document(&body)?;
                hooks.on_stream_finished(&session_id, false);
                return Ok(Box::pin(VecEventStream::new(
                    events.into_iter().map(Ok).collect(),
                )) as BoxedEventStream<'a>);
            }

            let stream = try_stream! {
                let mut decoder = RecordDecoder::with_hooks(Arc::clone(&hooks));
                let mut chunks = response.bytes_stream();

                loop {
                    let read = tokio::select! {
                        _ = cancel.cancelled() => None,
                        chunk = chunks.next() => Some(chunk),
                    };

                    let chunk = match read {
                        None => {
                            hooks.on_stream_finished(&session_id, true);
                            yield StreamEvent::Completion(decoder.finish_aborted());
                            return;
                        }
                        Some(None) => break,
                        Some(Some(chunk)) => {
                            chunk.map_err(|err| WireError::transport(err.to_string()))?
                        }
                    };

                    for event in decoder.feed(&chunk) {
                        yield event;
                    }

                    if cancel.is_cancelled() {
                        hooks.on_stream_finished(&session_id, true);
                        yield StreamEvent::Completion(decoder.finish_aborted());
                        return;
                    }

                    if decoder.is_finished() {
                        break;
                    }
                }

                hooks.on_stream_finished(&session_id, false);
                yield StreamEvent::Completion(decoder.finish());
            };

            Ok(Box::pin(stream) as BoxedEventStream<'a>)
        })
    }
}

fn single_event_stream<'a>(event: StreamEvent) -> BoxedEventStream<'a> {
    Box::pin(VecEventStream::new(vec![Ok(event)]))
}

fn build_form(request: &GenerateRequest) -> Result<Form, WireError> {
    let history = serde_json::to_string(&request.history)
        .map_err(|err| WireError::invalid_request(format!("history not serializable: {err}")))?;

    let mut form = Form::new()
        .text("message", request.message.clone())
        .text("model", request.model.clone())
        .text("user_id", request.session_id.to_string())
        .text("history", history)
        .text("webSearch", request.options.web_search.to_string())
        .text("censorship", request.options.censorship.to_string());

    if !request.options.metadata.is_empty() {
        let meta = serde_json::to_string(&request.options.metadata)
            .map_err(|err| WireError::invalid_request(format!("metadata not serializable: {err}")))?;
        form = form.text("meta", meta);
    }

    for (index, attachment) in request.attachments.iter().enumerate() {
        let part = Part::bytes(attachment.bytes.clone())
            .file_name(attachment.file_name.clone())
            .mime_str(&attachment.mime_type)
            .map_err(|err| {
                WireError::invalid_request(format!(
                    "attachment {} has an invalid mime type: {err}",
                    attachment.file_name
                ))
            })?;
        form = form.part(format!("file{index}"), part);
    }

    Ok(form)
}

fn is_event_stream(response: &Response) -> bool {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("text/event-stream"))
}

pub(crate) async fn error_from_response(response: Response) -> WireError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let message = extract_error_message(&body)
        .unwrap_or_else(|| format!("backend request failed with status {status}"));

    classify_status(status, message)
}

pub(crate) fn classify_status(status: StatusCode, message: String) -> WireError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => WireError::authentication(message),
        StatusCode::TOO_MANY_REQUESTS => WireError::rate_limited(message),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => WireError::timeout(message),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
            WireError::invalid_request(message)
        }
        StatusCode::SERVICE_UNAVAILABLE | StatusCode::BAD_GATEWAY => {
            WireError::unavailable(message)
        }
        _ => WireError::transport(message),
    }
}

pub(crate) fn extract_error_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorEnvelope {
        error: String,
    }

    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .map(|envelope| envelope.error)
}
