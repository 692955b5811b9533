// Public modules
pub mod chat_completion_chunk;
pub mod chat_message;
pub mod conversation;
pub mod stream_request;

// Re-exports
pub use chat_completion_chunk::{ChatCompletionChunk, ChunkChoice, ChunkDelta};
pub use chat_message::{ChatMessage, Role};
pub use conversation::Conversation;
pub use stream_request::{ChatCompletionRequest, StreamRequest};
