use serde::Serialize;
use url::Url;

use crate::types::ChatMessage;

/// Everything needed to issue one streaming chat request.
///
/// A request is built once per turn and never changes while it is in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamRequest {
    /// The chat-completions endpoint.
    pub endpoint: Url,

    /// The bearer credential.
    pub credential: String,

    /// The fully-qualified model identifier.
    pub model: String,

    /// The conversation so far, oldest first.
    pub messages: Vec<ChatMessage>,
}

impl StreamRequest {
    /// Create a new `StreamRequest`.
    pub fn new(
        endpoint: Url,
        credential: impl Into<String>,
        model: impl Into<String>,
        messages: Vec<ChatMessage>,
    ) -> Self {
        Self {
            endpoint,
            credential: credential.into(),
            model: model.into(),
            messages,
        }
    }

    /// The JSON body sent to the gateway.
    pub fn body(&self) -> ChatCompletionRequest<'_> {
        ChatCompletionRequest {
            model: &self.model,
            messages: &self.messages,
            stream: true,
        }
    }
}

/// Wire shape of a chat-completions request body.
#[derive(Debug, Clone, Serialize)]
pub struct ChatCompletionRequest<'a> {
    /// The model to run.
    pub model: &'a str,

    /// The conversation to continue.
    pub messages: &'a [ChatMessage],

    /// Always true; the client only speaks the streaming protocol.
    pub stream: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, to_value};

    #[test]
    fn body_serialization() {
        let request = StreamRequest::new(
            Url::parse("https://openrouter.ai/api/v1/chat/completions").unwrap(),
            "sk-test",
            "openai/gpt-4o-mini",
            vec![ChatMessage::user("Hello"), ChatMessage::assistant("Hi!")],
        );
        assert_eq!(
            to_value(request.body()).unwrap(),
            json!({
                "model": "openai/gpt-4o-mini",
                "messages": [
                    {"role": "user", "content": "Hello"},
                    {"role": "assistant", "content": "Hi!"}
                ],
                "stream": true
            })
        );
    }
}
