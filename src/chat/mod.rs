//! Interactive chat with models behind the OpenRouter gateway.
//!
//! This module provides a streaming REPL chat interface built on top of the
//! gateway client. It supports:
//!
//! - Streaming responses with real-time token display
//! - Slash commands for session control
//! - Writing code blocks from responses to disk
//!
//! # Architecture
//!
//! - [`config`]: CLI argument parsing and configuration
//! - [`session`]: Conversation state and turn handling
//! - [`commands`]: Slash command parsing
//! - [`render`]: Terminal output

mod commands;
mod config;
mod render;
mod session;

pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig};
pub use render::{PlainTextRenderer, Renderer};
pub use session::ChatSession;
