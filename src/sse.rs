//! Server-Sent Events (SSE) frame parsing.
//!
//! [`SseParser`] consumes decoded text in pieces of any size and yields a
//! [`SseFrame`] each time a blank line terminates a frame that carried data.
//! Comments, reconnection hints and data-less frames never reach the caller.

/// A completed SSE frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseFrame {
    /// The `event:` field, if one was given.
    pub event: Option<String>,
    /// The `data:` lines, joined with `\n`.
    pub data: String,
    /// The `id:` field, if one was given.
    pub id: Option<String>,
}

impl SseFrame {
    /// Returns true if this frame is the `[DONE]` end-of-stream sentinel.
    pub fn is_done(&self) -> bool {
        self.data.trim() == "[DONE]"
    }
}

/// Incremental SSE parser.
///
/// Lines may end in `\n`, `\r\n` or `\r`; a `\r` at the end of one piece and a
/// `\n` at the start of the next are treated as a single line ending.
#[derive(Debug, Default)]
pub struct SseParser {
    line: String,
    skip_lf: bool,
    event: Option<String>,
    data: Vec<String>,
    id: Option<String>,
}

impl SseParser {
    /// Creates an empty parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a piece of text, returning every frame it completes.
    pub fn feed(&mut self, text: &str) -> Vec<SseFrame> {
        let mut frames = Vec::new();
        for ch in text.chars() {
            if self.skip_lf {
                self.skip_lf = false;
                if ch == '\n' {
                    continue;
                }
            }
            match ch {
                '\r' => {
                    self.skip_lf = true;
                    self.end_line(&mut frames);
                }
                '\n' => self.end_line(&mut frames),
                _ => self.line.push(ch),
            }
        }
        frames
    }

    /// Flushes a final frame that was not followed by a blank line.
    pub fn finish(&mut self) -> Option<SseFrame> {
        if !self.line.is_empty() {
            let line = std::mem::take(&mut self.line);
            self.process_line(&line);
        }
        self.skip_lf = false;
        self.take_frame()
    }

    fn end_line(&mut self, frames: &mut Vec<SseFrame>) {
        if self.line.is_empty() {
            if let Some(frame) = self.take_frame() {
                frames.push(frame);
            }
            return;
        }
        let line = std::mem::take(&mut self.line);
        self.process_line(&line);
    }

    fn process_line(&mut self, line: &str) {
        if line.starts_with(':') {
            return;
        }
        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "data" => self.data.push(value.to_string()),
            "event" => self.event = Some(value.to_string()),
            "id" if !value.contains('\0') => self.id = Some(value.to_string()),
            // `retry` and unknown fields carry nothing the client acts on.
            _ => {}
        }
    }

    fn take_frame(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseFrame {
            event,
            data,
            id: self.id.clone(),
        })
    }
}
