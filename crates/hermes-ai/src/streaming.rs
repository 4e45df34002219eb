//! Server-Sent Events (SSE) parsing.
//!
//! The Gemini streaming endpoint delivers incremental results as SSE.
//! `SseAssembler` is the pure line-by-line state machine;
//! `parse_sse_stream` feeds it from a reqwest response.

use futures_util::StreamExt;
use tokio::io::AsyncBufReadExt;
use tokio_util::io::StreamReader;

/// A single SSE event parsed from the stream.
#[derive(Debug, Clone)]
pub struct SseEvent {
    /// The event type, when the stream names one.
    pub event: Option<String>,
    /// The event data (JSON string).
    pub data: String,
}

/// Accumulates `event:`/`data:` lines into events. An empty line
/// terminates the current event; multiple `data:` lines concatenate
/// with newlines per the SSE spec.
#[derive(Debug, Default)]
pub struct SseAssembler {
    current_event: Option<String>,
    current_data: String,
}

impl SseAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line; returns a completed event when the line closes one.
    pub fn push_line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            if self.current_data.is_empty() {
                self.current_event = None;
                return None;
            }
            return Some(SseEvent {
                event: self.current_event.take(),
                data: std::mem::take(&mut self.current_data),
            });
        }

        if let Some(event_type) = line.strip_prefix("event: ") {
            self.current_event = Some(event_type.to_string());
        } else if let Some(data) = line.strip_prefix("data: ") {
            if !self.current_data.is_empty() {
                self.current_data.push('\n');
            }
            self.current_data.push_str(data);
        }
        // Other fields (id:, retry:, comments) are ignored.
        None
    }

    /// Flush a trailing event left open when the stream ends.
    pub fn finish(&mut self) -> Option<SseEvent> {
        if self.current_data.is_empty() {
            return None;
        }
        Some(SseEvent {
            event: self.current_event.take(),
            data: std::mem::take(&mut self.current_data),
        })
    }
}

/// Parse an SSE stream from a reqwest response, calling `on_event` for
/// each completed event.
pub async fn parse_sse_stream(
    response: reqwest::Response,
    mut on_event: impl FnMut(SseEvent),
) -> Result<(), crate::AiError> {
    let byte_stream = response
        .bytes_stream()
        .map(|result| result.map_err(std::io::Error::other));
    let reader = tokio::io::BufReader::new(StreamReader::new(byte_stream));
    let mut lines = reader.lines();

    let mut assembler = SseAssembler::new();
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| crate::AiError::Network(e.to_string()))?
    {
        if let Some(event) = assembler.push_line(&line) {
            on_event(event);
        }
    }

    if let Some(event) = assembler.finish() {
        on_event(event);
    }

    Ok(())
}
