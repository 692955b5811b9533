//! Core chat session management.
//!
//! This module provides the `ChatSession` struct which owns the conversation
//! state and drives one streamed turn at a time.

use crate::Error;
use crate::chat::config::ChatConfig;
use crate::chat::render::Renderer;
use crate::client::Gateway;
use crate::codegen::{CodeExtractor, ConflictResolver, Extraction};
use crate::dispatch::{StreamHandler, StreamOutcome};
use crate::error::Result;
use crate::history::HistoryStore;
use crate::models::resolve_model;
use crate::types::{ChatMessage, Conversation, StreamRequest};

/// Forwards stream callbacks to a renderer.
struct RenderHandler<'a> {
    renderer: &'a mut dyn Renderer,
}

impl StreamHandler for RenderHandler<'_> {
    fn on_token(&mut self, token: &str) {
        self.renderer.print_text(token);
    }

    fn on_end(&mut self, _: &str) {
        self.renderer.finish_response();
    }

    fn on_error(&mut self, _: &Error) {
        // The caller reports the error; only tidy the terminal here.
        self.renderer.finish_response();
    }
}

/// A chat session that manages conversation state and gateway interactions.
///
/// Every turn sends the full message list. A turn that fails leaves the
/// message list as it was before the turn.
pub struct ChatSession {
    gateway: Gateway,
    config: ChatConfig,
    messages: Vec<ChatMessage>,
    conversation: Conversation,
    history: Option<HistoryStore>,
}

impl ChatSession {
    /// Creates a new chat session with the given gateway and configuration.
    pub fn new(gateway: Gateway, config: ChatConfig) -> Self {
        let conversation = Conversation::new(config.model.clone());
        Self {
            gateway,
            config,
            messages: Vec::new(),
            conversation,
            history: None,
        }
    }

    /// Persists the conversation to `store` after every completed turn.
    pub fn with_history(mut self, store: HistoryStore) -> Self {
        self.history = Some(store);
        self
    }

    /// Sends a user message and streams the response.
    ///
    /// This method:
    /// 1. Adds the user message to the conversation
    /// 2. Streams the response through `renderer`
    /// 3. Adds the complete assistant response to the conversation
    /// 4. Saves the conversation to history, if enabled
    ///
    /// # Errors
    ///
    /// Returns the stream failure; the user message is rolled back.
    pub async fn send_streaming(
        &mut self,
        user_input: &str,
        renderer: &mut dyn Renderer,
    ) -> Result<String> {
        let previous_len = self.messages.len();
        let previous_conversation_len = self.conversation.messages.len();

        let message = ChatMessage::user(user_input);
        self.messages.push(message.clone());
        self.conversation.push(message);

        let request = StreamRequest::new(
            self.config.endpoint.clone(),
            self.config.api_key.clone(),
            self.config.model.clone(),
            self.messages.clone(),
        );
        renderer.start_thinking();
        let (_, outcome) = self
            .gateway
            .stream_chat(&request, RenderHandler { renderer: &mut *renderer })
            .await;

        match outcome {
            StreamOutcome::Completed(text) => {
                let reply = ChatMessage::assistant(text.clone());
                self.messages.push(reply.clone());
                self.conversation.push(reply);
                self.save_history(renderer);
                Ok(text)
            }
            StreamOutcome::Failed(err) => {
                self.messages.truncate(previous_len);
                self.conversation.messages.truncate(previous_conversation_len);
                Err(err)
            }
        }
    }

    /// Writes the code blocks in `text` under the configured directory and
    /// reports each file through `renderer`.
    pub async fn write_code_blocks<R>(
        &self,
        text: &str,
        renderer: &mut dyn Renderer,
        resolver: &mut R,
    ) -> Result<Extraction>
    where
        R: ConflictResolver + ?Sized,
    {
        let extractor =
            CodeExtractor::new(&self.config.out_dir)?.with_policy(self.config.path_policy);
        let extraction = extractor.materialize(text, resolver).await;
        for file in &extraction.files {
            renderer.print_generated(&file.path, file.mode);
        }
        for path in &extraction.skipped {
            renderer.print_skipped(path);
        }
        for failure in &extraction.failures {
            renderer.print_warning(&format!("  not written: {}", failure.error));
        }
        Ok(extraction)
    }

    fn save_history(&self, renderer: &mut dyn Renderer) {
        let Some(store) = &self.history else {
            return;
        };
        if let Err(err) = store.upsert(&self.conversation) {
            tracing::warn!(error = %err, "failed to save history");
            renderer.print_warning(&format!("History not saved: {err}"));
        }
    }

    /// Returns the number of messages in the conversation.
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Returns the messages exchanged so far.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Returns the conversation as it is persisted.
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Changes the model, resolving aliases. Returns the resolved identifier.
    pub fn set_model(&mut self, model: &str) -> &str {
        self.config.model = resolve_model(Some(model), Some(&self.config.model));
        &self.config.model
    }

    /// Returns the current model.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Replaces the API key for subsequent turns.
    pub fn set_api_key(&mut self, api_key: impl Into<String>) {
        self.config.api_key = api_key.into();
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }
}
