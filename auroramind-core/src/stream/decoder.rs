//! Incremental server-sent-event frame decoder.
//!
//! [`FrameDecoder`] accepts arbitrary byte chunks and returns the frames
//! completed by each one. Neither the `\n\n` delimiter nor a UTF-8 code
//! point needs to align with a chunk boundary.

use serde::Deserialize;

use super::StreamEvent;

/// Delimiter between two frames on the wire.
const FRAME_DELIMITER: &str = "\n\n";

/// Line prefix carrying the event name.
const EVENT_PREFIX: &str = "event:";

/// Line prefix carrying the JSON payload.
const DATA_PREFIX: &str = "data:";

/// One `event` + `data` unit read off the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    /// Event name, empty when the frame had no `event:` line.
    pub event: String,
    /// Raw payload text, empty when the frame had no `data:` line.
    pub data: String,
}

/// Payload of a `delta` frame.
#[derive(Debug, Deserialize)]
struct DeltaPayload {
    text: String,
}

/// Payload of a `meta` frame.
#[derive(Debug, Deserialize)]
struct MetaPayload {
    conversation_id: String,
}

/// Payload of an `error` frame.
#[derive(Debug, Deserialize)]
struct ErrorPayload {
    #[serde(alias = "detail")]
    message: String,
}

impl Frame {
    /// Parse a single delimiter-free frame segment.
    ///
    /// Lines that carry neither prefix are ignored. When a prefix repeats,
    /// the last occurrence wins.
    pub fn parse(segment: &str) -> Self {
        let mut frame = Frame::default();
        for line in segment.lines() {
            if let Some(rest) = line.strip_prefix(EVENT_PREFIX) {
                frame.event = rest.trim().to_string();
            } else if let Some(rest) = line.strip_prefix(DATA_PREFIX) {
                frame.data = rest.trim().to_string();
            }
        }
        frame
    }

    /// Convert this frame into a typed event.
    ///
    /// Returns `Ok(None)` for event names the client does not recognise.
    ///
    /// # Errors
    ///
    /// Returns the JSON error when a recognised event carries a payload that
    /// does not parse, or parses into the wrong shape.
    pub fn into_event(self) -> Result<Option<StreamEvent>, serde_json::Error> {
        let event = match self.event.as_str() {
            "delta" => {
                let payload: DeltaPayload = serde_json::from_str(&self.data)?;
                StreamEvent::Delta(payload.text)
            }
            "meta" => {
                let payload: MetaPayload = serde_json::from_str(&self.data)?;
                StreamEvent::Meta(payload.conversation_id)
            }
            "context" => StreamEvent::Context(serde_json::from_str(&self.data)?),
            "error" => {
                let payload: ErrorPayload = serde_json::from_str(&self.data)?;
                StreamEvent::Error(payload.message)
            }
            "done" => StreamEvent::Done,
            _ => return Ok(None),
        };
        Ok(Some(event))
    }
}

/// Buffers partial frames and partial UTF-8 sequences between reads.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Decoded text not yet terminated by a frame delimiter.
    buffer: String,
    /// Trailing bytes of a code point split across chunks.
    pending: Vec<u8>,
}

impl FrameDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return every frame it completed, in wire order.
    ///
    /// The unterminated remainder stays buffered for the next call.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Frame> {
        self.decode_utf8(chunk);

        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.find(FRAME_DELIMITER) {
            let frame = Frame::parse(&self.buffer[..pos]);
            self.buffer.drain(..pos + FRAME_DELIMITER.len());
            frames.push(frame);
        }
        frames
    }

    /// Text received after the last complete frame.
    pub fn remainder(&self) -> &str {
        &self.buffer
    }

    /// Append `chunk` to the text buffer, holding back an incomplete
    /// trailing sequence. Invalid bytes become U+FFFD.
    fn decode_utf8(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);

        let input = std::mem::take(&mut self.pending);
        let mut rest: &[u8] = &input;
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    self.buffer.push_str(text);
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    // Already validated up to this point.
                    self.buffer
                        .push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match err.error_len() {
                        Some(len) => {
                            self.buffer.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            self.pending = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }
    }
}
