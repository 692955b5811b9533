//! Turning a chunked SSE body into an ordered sequence of callbacks.
//!
//! [`StreamDispatcher`] is the state machine behind every streamed turn. It owns
//! the incremental decoder, the frame parser and the accumulated text, and it
//! guarantees the callback contract of [`StreamHandler`]:
//!
//! ```text
//! Idle --start--> Streaming --[DONE] / finish--> Completed
//!   |                 |
//!   +------fail-------+-------------------------> Failed
//! ```
//!
//! At most one `on_start`, any number of `on_token`, then exactly one of
//! `on_end` or `on_error`. Once a terminal state is reached every further
//! operation is a no-op.

use std::time::Instant;

use crate::decode::Utf8Decoder;
use crate::error::Error;
use crate::observability::{
    STREAM_DURATION, STREAM_ERRORS, STREAM_FRAMES, STREAM_MALFORMED_FRAMES, STREAM_TOKENS,
};
use crate::sse::{SseFrame, SseParser};
use crate::types::ChatCompletionChunk;

/// Receives the callbacks of one streamed turn.
pub trait StreamHandler {
    /// The gateway accepted the request and the body is about to be read.
    fn on_start(&mut self) {}

    /// A non-empty content delta arrived.
    fn on_token(&mut self, token: &str);

    /// The stream completed; `text` is every token concatenated in order.
    fn on_end(&mut self, text: &str);

    /// The turn failed.
    fn on_error(&mut self, error: &Error);
}

impl<H: StreamHandler + ?Sized> StreamHandler for &mut H {
    fn on_start(&mut self) {
        (**self).on_start()
    }

    fn on_token(&mut self, token: &str) {
        (**self).on_token(token)
    }

    fn on_end(&mut self, text: &str) {
        (**self).on_end(text)
    }

    fn on_error(&mut self, error: &Error) {
        (**self).on_error(error)
    }
}

/// Where a dispatcher is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchState {
    /// No response has been accepted yet.
    Idle,
    /// The body is being read.
    Streaming,
    /// `on_end` has fired.
    Completed,
    /// `on_error` has fired.
    Failed,
}

impl DispatchState {
    /// Returns true for `Completed` and `Failed`.
    pub fn is_terminal(self) -> bool {
        matches!(self, DispatchState::Completed | DispatchState::Failed)
    }
}

/// The result of one streamed turn.
#[derive(Debug, Clone)]
pub enum StreamOutcome {
    /// The stream ended normally with this accumulated text.
    Completed(String),
    /// The stream failed.
    Failed(Error),
}

impl StreamOutcome {
    /// Returns the accumulated text of a completed stream.
    pub fn text(&self) -> Option<&str> {
        match self {
            StreamOutcome::Completed(text) => Some(text),
            StreamOutcome::Failed(_) => None,
        }
    }

    /// Converts the outcome into a `Result`.
    pub fn into_result(self) -> crate::Result<String> {
        match self {
            StreamOutcome::Completed(text) => Ok(text),
            StreamOutcome::Failed(err) => Err(err),
        }
    }
}

/// Incremental SSE-to-callback dispatcher.
pub struct StreamDispatcher<H: StreamHandler> {
    handler: H,
    decoder: Utf8Decoder,
    parser: SseParser,
    text: String,
    state: DispatchState,
    error: Option<Error>,
    started_at: Option<Instant>,
}

impl<H: StreamHandler> StreamDispatcher<H> {
    /// Creates an idle dispatcher that reports to `handler`.
    pub fn new(handler: H) -> Self {
        Self {
            handler,
            decoder: Utf8Decoder::new(),
            parser: SseParser::new(),
            text: String::new(),
            state: DispatchState::Idle,
            error: None,
            started_at: None,
        }
    }

    /// The current state.
    pub fn state(&self) -> DispatchState {
        self.state
    }

    /// Text accumulated so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Borrows the handler.
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Moves from `Idle` to `Streaming` and fires `on_start`.
    pub fn start(&mut self) {
        if self.state != DispatchState::Idle {
            return;
        }
        self.state = DispatchState::Streaming;
        self.started_at = Some(Instant::now());
        self.handler.on_start();
    }

    /// Feeds the next chunk of the body.
    ///
    /// Chunks that arrive after the stream has completed are drained and
    /// ignored.
    pub fn feed(&mut self, chunk: &[u8]) {
        if self.state != DispatchState::Streaming {
            return;
        }
        let text = self.decoder.decode(chunk);
        self.dispatch_text(&text);
    }

    /// Signals end-of-body.
    ///
    /// If no `[DONE]` sentinel was seen, the stream completes with whatever
    /// text has accumulated.
    pub fn finish(&mut self) {
        if self.state != DispatchState::Streaming {
            return;
        }
        let tail = self.decoder.finish();
        self.dispatch_text(&tail);
        if self.state != DispatchState::Streaming {
            return;
        }
        if let Some(frame) = self.parser.finish() {
            self.dispatch(frame);
        }
        if self.state == DispatchState::Streaming {
            tracing::debug!(
                chars = self.text.len(),
                "stream closed without a [DONE] sentinel"
            );
            self.complete();
        }
    }

    /// Fails the turn, unless it already reached a terminal state.
    pub fn fail(&mut self, error: Error) {
        if self.state.is_terminal() {
            tracing::debug!(%error, state = ?self.state, "ignoring failure after terminal state");
            return;
        }
        STREAM_ERRORS.click();
        tracing::debug!(%error, "stream failed");
        self.state = DispatchState::Failed;
        self.handler.on_error(&error);
        self.error = Some(error);
        self.record_duration();
    }

    /// Consumes the dispatcher, returning its handler and the turn outcome.
    ///
    /// A dispatcher that never reached a terminal state yields a streaming
    /// error outcome.
    pub fn into_parts(self) -> (H, StreamOutcome) {
        let outcome = match (self.state, self.error) {
            (DispatchState::Completed, _) => StreamOutcome::Completed(self.text),
            (_, Some(error)) => StreamOutcome::Failed(error),
            (state, None) => StreamOutcome::Failed(Error::streaming(
                format!("stream abandoned in state {state:?}"),
                None,
            )),
        };
        (self.handler, outcome)
    }

    fn dispatch_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        for frame in self.parser.feed(text) {
            self.dispatch(frame);
            if self.state != DispatchState::Streaming {
                break;
            }
        }
    }

    fn dispatch(&mut self, frame: SseFrame) {
        STREAM_FRAMES.click();
        if frame.is_done() {
            self.complete();
            return;
        }
        let chunk = match serde_json::from_str::<ChatCompletionChunk>(&frame.data) {
            Ok(chunk) => chunk,
            Err(err) => {
                STREAM_MALFORMED_FRAMES.click();
                tracing::debug!(%err, data = %frame.data, "ignoring non-JSON frame");
                return;
            }
        };
        if let Some(error) = &chunk.error {
            tracing::warn!(%error, "gateway reported an in-band error");
        }
        if let Some(token) = chunk.content() {
            STREAM_TOKENS.click();
            self.text.push_str(token);
            self.handler.on_token(token);
        }
    }

    fn complete(&mut self) {
        self.state = DispatchState::Completed;
        self.handler.on_end(&self.text);
        self.record_duration();
    }

    fn record_duration(&self) {
        if let Some(started_at) = self.started_at {
            STREAM_DURATION.add(started_at.elapsed().as_secs_f64());
        }
    }
}
