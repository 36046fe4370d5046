//! Server-sent-event decoding for the knowledge-base conversation stream.
//!
//! The backend answers a conversation request with a stream of
//! `event: <name>` / `data: <json>` frames. [`decode_events`] turns the raw
//! response body into a stream of [`StreamEvent`]s. [`dispatch`] drives such
//! a stream into a [`ChatHandler`].

mod decoder;

pub use decoder::{Frame, FrameDecoder};

use std::pin::Pin;

use futures::{Stream, StreamExt};

use crate::client::ClientError;

/// Boxed stream of conversation events, as returned by the knowledge service.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, ClientError>> + Send>>;

/// Events emitted while a conversation answer streams in.
///
/// # Examples
///
/// ```
/// use auroramind_core::stream::StreamEvent;
///
/// let delta = StreamEvent::Delta("Hello".to_string());
/// assert!(!delta.is_terminal());
/// assert!(StreamEvent::Done.is_terminal());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Incremental fragment of the assistant's answer.
    Delta(String),

    /// Server-assigned conversation id. Send it back to continue the chat.
    Meta(String),

    /// Retrieval context the answer is grounded on, passed through as-is.
    Context(serde_json::Map<String, serde_json::Value>),

    /// Non-fatal failure reported by the server inside the stream.
    Error(String),

    /// The server finished the answer. Nothing follows.
    Done,
}

impl StreamEvent {
    /// Whether this event ends the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Done)
    }
}

/// How a decoded stream finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    /// An explicit `done` frame was received.
    Done,
    /// The body ended without a `done` frame.
    Ended,
}

/// Receives conversation events in the order their frames complete.
///
/// Only [`on_chunk`](ChatHandler::on_chunk) and
/// [`on_meta`](ChatHandler::on_meta) are required. Context frames are dropped
/// unless `on_context` is overridden.
///
/// Handlers run between two reads of the response body and must not block.
pub trait ChatHandler {
    /// Called once per `delta` frame.
    fn on_chunk(&mut self, text: &str);

    /// Called once per `meta` frame.
    fn on_meta(&mut self, conversation_id: &str);

    /// Called once per `context` frame.
    fn on_context(&mut self, _context: &serde_json::Map<String, serde_json::Value>) {}

    /// Called once per `error` frame.
    fn on_error(&mut self, message: &str) {
        tracing::warn!(message, "stream: server reported an error frame");
    }
}

/// Decode a chunked SSE body into typed events.
///
/// Frames are yielded as soon as their delimiter arrives. A frame whose
/// payload is malformed is logged and skipped. The stream ends after
/// yielding [`StreamEvent::Done`], and any frames still buffered behind it
/// are discarded. It also ends, without `Done`, when the body runs out. A
/// body error is yielded once as [`ClientError::Stream`] and ends the stream.
pub fn decode_events<S, B, E>(body: S) -> impl Stream<Item = Result<StreamEvent, ClientError>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    async_stream::stream! {
        let mut body = std::pin::pin!(body);
        let mut decoder = FrameDecoder::new();

        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    tracing::debug!(error = %e, "stream: body read failed");
                    yield Err(ClientError::Stream(e.to_string()));
                    return;
                }
            };

            for frame in decoder.feed(chunk.as_ref()) {
                let name = frame.event.clone();
                match frame.into_event() {
                    Ok(Some(StreamEvent::Done)) => {
                        tracing::debug!("stream: done frame received");
                        yield Ok(StreamEvent::Done);
                        return;
                    }
                    Ok(Some(event)) => {
                        yield Ok(event);
                    }
                    Ok(None) => {
                        tracing::trace!(event = %name, "stream: ignoring unrecognised event");
                    }
                    Err(e) => {
                        tracing::warn!(event = %name, error = %e, "stream: skipping malformed frame");
                    }
                }
            }
        }

        if !decoder.remainder().trim().is_empty() {
            tracing::debug!(
                remainder = decoder.remainder(),
                "stream: body ended inside a frame"
            );
        }
        tracing::debug!("stream: body ended without done frame");
    }
}

/// Drive an event stream to completion, calling `handler` for each event.
///
/// # Errors
///
/// Returns the first error yielded by the stream. Events before it have
/// already been delivered to the handler.
pub async fn dispatch<S, H>(events: S, handler: &mut H) -> Result<StreamOutcome, ClientError>
where
    S: Stream<Item = Result<StreamEvent, ClientError>>,
    H: ChatHandler + ?Sized,
{
    let mut events = std::pin::pin!(events);

    while let Some(event) = events.next().await {
        match event? {
            StreamEvent::Delta(text) => handler.on_chunk(&text),
            StreamEvent::Meta(id) => handler.on_meta(&id),
            StreamEvent::Context(context) => handler.on_context(&context),
            StreamEvent::Error(message) => handler.on_error(&message),
            StreamEvent::Done => return Ok(StreamOutcome::Done),
        }
    }

    Ok(StreamOutcome::Ended)
}
