//! Incremental decoder for the `text/event-stream` wire format.
//!
//! Wire format (one event):
//!
//! ```text
//! event: state        (optional)
//! id: 42              (optional)
//! data: first line
//! data: second line
//! <blank line>
//! ```
//!
//! Bytes arrive in arbitrary chunks; the decoder buffers partial lines and
//! emits complete events only when the terminating blank line is seen.
//! Neither a single line nor an event's joined data may exceed
//! [`MAX_EVENT_SIZE`]; past that the stream is rejected.

use std::time::Duration;

/// Maximum size of one line, and of one event's accumulated data (1 MiB).
pub const MAX_EVENT_SIZE: usize = 1024 * 1024;

const BOM: &[u8] = b"\xEF\xBB\xBF";

/// The server sent a line or an event larger than [`MAX_EVENT_SIZE`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("event too large: more than {max} bytes", max = MAX_EVENT_SIZE)]
pub struct EventTooLarge;

/// A single dispatched event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseEvent {
    /// Value of the `event:` field, if any.
    pub event: Option<String>,
    /// All `data:` lines joined with `\n`.
    pub data: String,
    // `id` and `retry` are decoded for completeness; nothing reconnects with them.
    /// Last event id seen on the stream.
    pub id: Option<String>,
    /// Reconnection delay requested by the server.
    pub retry: Option<Duration>,
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    line: Vec<u8>,
    skip_lf: bool,
    seen_first_line: bool,
    data: String,
    has_data: bool,
    event: Option<String>,
    last_id: Option<String>,
    retry: Option<Duration>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes, returning every event it completes.
    ///
    /// Once this returns [`EventTooLarge`] the decoder must be discarded.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<SseEvent>, EventTooLarge> {
        let mut events = Vec::new();
        for &b in chunk {
            if self.skip_lf {
                self.skip_lf = false;
                if b == b'\n' {
                    continue;
                }
            }
            match b {
                b'\n' => self.finish_line(&mut events)?,
                b'\r' => {
                    self.finish_line(&mut events)?;
                    self.skip_lf = true;
                }
                _ => {
                    if self.line.len() >= MAX_EVENT_SIZE {
                        return Err(self.overflow());
                    }
                    self.line.push(b);
                }
            }
        }
        Ok(events)
    }

    fn overflow(&mut self) -> EventTooLarge {
        self.line = Vec::new();
        self.data = String::new();
        tracing::warn!(max = MAX_EVENT_SIZE, "event-stream event too large");
        EventTooLarge
    }

    fn finish_line(&mut self, events: &mut Vec<SseEvent>) -> Result<(), EventTooLarge> {
        let mut bytes = std::mem::take(&mut self.line);
        if !self.seen_first_line {
            self.seen_first_line = true;
            if bytes.starts_with(BOM) {
                bytes.drain(..BOM.len());
            }
        }

        if bytes.is_empty() {
            if let Some(event) = self.dispatch() {
                events.push(event);
            }
            return Ok(());
        }

        let line = String::from_utf8_lossy(&bytes);
        if line.starts_with(':') {
            return Ok(());
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (&*line, ""),
        };

        match field {
            "data" => {
                if self.data.len() + value.len() + 1 > MAX_EVENT_SIZE {
                    return Err(self.overflow());
                }
                if self.has_data {
                    self.data.push('\n');
                }
                self.data.push_str(value);
                self.has_data = true;
            }
            "event" => self.event = Some(value.to_string()),
            "id" => {
                if !value.contains('\0') {
                    self.last_id = Some(value.to_string());
                }
            }
            "retry" => {
                if let Ok(ms) = value.parse::<u64>() {
                    self.retry = Some(Duration::from_millis(ms));
                }
            }
            other => tracing::trace!(field = other, "ignoring unknown event-stream field"),
        }
        Ok(())
    }

    fn dispatch(&mut self) -> Option<SseEvent> {
        let event = self.event.take();
        if !self.has_data {
            return None;
        }
        self.has_data = false;
        Some(SseEvent {
            event,
            data: std::mem::take(&mut self.data),
            id: self.last_id.clone(),
            retry: self.retry,
        })
    }
}
