use serde::Deserialize;
use serde_json::Value;

/// One `data:` payload of a streaming chat-completions response.
///
/// Only the fields the client reads are modeled; everything else the gateway
/// sends is ignored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChatCompletionChunk {
    /// The identifier of the completion.
    #[serde(default)]
    pub id: Option<String>,

    /// The model that actually served the request.
    #[serde(default)]
    pub model: Option<String>,

    /// The choices carried by this chunk.
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,

    /// An error the gateway reported in-band.
    #[serde(default)]
    pub error: Option<Value>,
}

/// A single choice within a chunk.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChunkChoice {
    /// The incremental content.
    #[serde(default)]
    pub delta: ChunkDelta,

    /// Why generation stopped, on the final chunk.
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// The incremental part of a choice.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ChunkDelta {
    /// The text fragment, if any.
    #[serde(default)]
    pub content: Option<String>,
}

impl ChatCompletionChunk {
    /// Returns `choices[0].delta.content` when it is present and non-empty.
    pub fn content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.delta.content.as_deref())
            .filter(|content| !content.is_empty())
    }
}
