//! percent: chat with hosted LLMs from the terminal.
//!
//! The crate has two cores. [`dispatch`] turns a chunked server-sent-events
//! body into `on_start`/`on_token`/`on_end`/`on_error` callbacks, and
//! [`codegen`] writes the fenced code blocks of a response to disk. Around
//! them sit the OpenRouter [`client`], model [`models`] aliases, persisted
//! [`config`] and [`history`], and the interactive [`chat`] front end.

// Public modules
pub mod chat;
pub mod client;
pub mod codegen;
pub mod config;
pub mod decode;
pub mod dispatch;
pub mod error;
pub mod history;
pub mod models;
pub mod observability;
pub mod sse;
pub mod types;

// Re-exports
pub use client::{DEFAULT_ENDPOINT, Gateway, default_endpoint};
pub use codegen::{
    CodeExtractor, ConflictDecision, ConflictResolver, Extraction, GeneratedFile, PathPolicy,
    WriteMode, generate_files_from_output,
};
pub use dispatch::{DispatchState, StreamDispatcher, StreamHandler, StreamOutcome};
pub use error::{Error, Result};
pub use models::{DEFAULT_MODEL, resolve_model};
pub use observability::{init_logging, register_biometrics};
pub use types::*;
