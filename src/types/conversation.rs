use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::types::ChatMessage;

/// A persisted conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    /// Unique identifier, used to replace the stored copy on update.
    pub id: Uuid,

    /// When the conversation was started.
    #[serde(with = "time::serde::rfc3339")]
    pub started_at: OffsetDateTime,

    /// The model active when the conversation was started.
    pub model: String,

    /// Messages in the order they were exchanged.
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
}

impl Conversation {
    /// Start a new, empty conversation.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: OffsetDateTime::now_utc(),
            model: model.into(),
            messages: Vec::new(),
        }
    }

    /// Append a message.
    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }
}
