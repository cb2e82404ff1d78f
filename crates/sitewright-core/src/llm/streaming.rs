//! Streaming response support for the chat completions API
//!
//! Server-Sent Events (SSE) parsing for streaming chat completions, plus a
//! combinator turning a raw byte stream into a stream of parsed events.

use async_stream::stream;
use futures_core::Stream;
use futures_util::StreamExt;
use serde::Deserialize;

use crate::error::{Error, Result};

use super::types::Usage;

/// A delta update in a streaming response
#[derive(Debug, Clone, Deserialize)]
pub struct StreamDelta {
    /// Content fragment
    pub content: Option<String>,
}

/// A streaming choice (partial response)
#[derive(Debug, Clone, Deserialize)]
pub struct StreamChoice {
    /// Incremental content update
    pub delta: StreamDelta,
    /// Reason for finishing (only in the final chunk)
    pub finish_reason: Option<String>,
}

/// A chunk from a streaming response
#[derive(Debug, Clone, Deserialize)]
pub struct StreamChunk {
    /// List of streaming choices
    #[serde(default)]
    pub choices: Vec<StreamChoice>,
    /// Token usage, reported on the final chunk by some providers
    #[serde(default)]
    pub usage: Option<Usage>,
}

impl StreamChunk {
    /// Get the content from this chunk (if any)
    pub fn content(&self) -> Option<&str> {
        self.choices.first()?.delta.content.as_deref()
    }

    /// Check if this is the final chunk
    pub fn is_done(&self) -> bool {
        self.choices
            .first()
            .and_then(|c| c.finish_reason.as_deref())
            .is_some()
    }
}

/// Event from streaming response parsing
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// A content chunk was received
    Chunk(StreamChunk),
    /// Stream completed
    Done,
    /// Error parsing chunk
    Error(String),
}

/// Parse a Server-Sent Events line into a StreamEvent
pub fn parse_sse_line(line: &str) -> Option<StreamEvent> {
    let line = line.trim();

    // Skip empty lines and comments
    if line.is_empty() || line.starts_with(':') {
        return None;
    }

    // Handle "data: [DONE]" marker
    if line == "data: [DONE]" {
        return Some(StreamEvent::Done);
    }

    // Parse "data: {json}" lines
    if let Some(data) = line.strip_prefix("data: ") {
        match serde_json::from_str::<StreamChunk>(data) {
            Ok(chunk) => Some(StreamEvent::Chunk(chunk)),
            Err(e) => Some(StreamEvent::Error(format!("Failed to parse chunk: {}", e))),
        }
    } else {
        None
    }
}

/// Turn a raw response byte stream into parsed SSE events.
///
/// Lines may span chunk boundaries; incomplete trailing data is buffered.
/// Transport failures end the stream with an `Err` item so callers can
/// distinguish them from a successful-but-empty response.
pub fn event_stream<S, B, E>(mut bytes: S) -> impl Stream<Item = Result<StreamEvent>>
where
    S: Stream<Item = std::result::Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Into<Error>,
{
    stream! {
        let mut buffer = String::new();

        while let Some(chunk) = bytes.next().await {
            match chunk {
                Ok(data) => {
                    buffer.push_str(&String::from_utf8_lossy(data.as_ref()));
                    while let Some(pos) = buffer.find('\n') {
                        let line: String = buffer.drain(..=pos).collect();
                        if let Some(event) = parse_sse_line(&line) {
                            yield Ok(event);
                        }
                    }
                }
                Err(e) => {
                    yield Err(e.into());
                    return;
                }
            }
        }

        // Flush a final unterminated line
        if let Some(event) = parse_sse_line(&buffer) {
            yield Ok(event);
        }
    }
}
