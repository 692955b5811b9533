//! Incremental UTF-8 decoding of a chunked byte stream.
//!
//! Transports hand out bytes with no regard for character boundaries, so a
//! multi-byte code point may straddle two chunks. [`Utf8Decoder`] holds the
//! incomplete tail of one chunk until the next arrives.

/// Streaming UTF-8 decoder.
///
/// Invalid byte sequences are replaced with U+FFFD rather than reported; only a
/// truncated sequence at the very end of the stream (see [`Utf8Decoder::finish`])
/// can produce a replacement character for bytes that were split, never a
/// sequence that is merely waiting for its continuation bytes.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Creates a decoder with no buffered state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decodes `chunk`, returning all text that is complete so far.
    pub fn decode(&mut self, chunk: &[u8]) -> String {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);

        let mut out = String::with_capacity(bytes.len());
        let mut rest = bytes.as_slice();
        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    break;
                }
                Err(err) => {
                    let (valid, tail) = rest.split_at(err.valid_up_to());
                    if let Ok(text) = std::str::from_utf8(valid) {
                        out.push_str(text);
                    }
                    match err.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &tail[len..];
                        }
                        None => {
                            // Incomplete sequence at the end: wait for more bytes.
                            self.pending = tail.to_vec();
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    /// Returns true if bytes of an unfinished code point are buffered.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Flushes the decoder at end of stream.
    pub fn finish(&mut self) -> String {
        if self.pending.is_empty() {
            return String::new();
        }
        let pending = std::mem::take(&mut self.pending);
        String::from_utf8_lossy(&pending).into_owned()
    }
}
