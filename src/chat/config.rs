//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and the resolved
//! configuration a [`ChatSession`](super::ChatSession) runs with.

use std::path::PathBuf;

use arrrg_derive::CommandLine;
use url::Url;

use crate::client::default_endpoint;
use crate::codegen::PathPolicy;
use crate::models::{DEFAULT_MODEL, resolve_model};

/// Command-line arguments for the percent tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Model to use for chat.
    #[arrrg(optional, "Model or alias to use (e.g. claude, grok, openai/gpt-4o)", "MODEL")]
    pub model: Option<String>,

    /// Store an API key and exit.
    #[arrrg(optional, "Save the OpenRouter API key to the config file", "KEY")]
    pub set_key: Option<String>,

    /// Store a default model and exit.
    #[arrrg(optional, "Save the default model to the config file", "MODEL")]
    pub set_model: Option<String>,

    /// List model aliases and exit.
    #[arrrg(flag, "List model aliases")]
    pub models: bool,

    /// Print the version and exit.
    #[arrrg(flag, "Print the version")]
    pub version: bool,

    /// Directory code blocks are written into.
    #[arrrg(optional, "Write code blocks under DIR (default: current directory)", "DIR")]
    pub out_dir: Option<String>,

    /// Allow code blocks to be written outside the output directory.
    #[arrrg(flag, "Allow absolute and .. paths in code block headers")]
    pub permissive_paths: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat session.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Fully-qualified model identifier.
    pub model: String,

    /// Bearer credential for the gateway.
    pub api_key: String,

    /// The chat-completions endpoint.
    pub endpoint: Url,

    /// Directory code blocks are written into.
    pub out_dir: PathBuf,

    /// Where code blocks may be written.
    pub path_policy: PathPolicy,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a configuration with default values and no credential.
    pub fn new() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_key: String::new(),
            endpoint: default_endpoint(),
            out_dir: PathBuf::from("."),
            path_policy: PathPolicy::default(),
            use_color: true,
        }
    }

    /// Resolves command-line arguments against the stored default model.
    ///
    /// The stored default may itself be an alias.
    pub fn from_args(args: &ChatArgs, default_model: &str, api_key: impl Into<String>) -> Self {
        let fallback = resolve_model(Some(default_model), None);
        let policy = if args.permissive_paths {
            PathPolicy::Permissive
        } else {
            PathPolicy::Confined
        };
        let mut config = ChatConfig::new()
            .with_model(resolve_model(args.model.as_deref(), Some(&fallback)))
            .with_api_key(api_key)
            .with_path_policy(policy);
        if let Some(dir) = &args.out_dir {
            config = config.with_out_dir(dir);
        }
        if args.no_color {
            config = config.without_color();
        }
        config
    }

    /// Sets the model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    /// Sets the endpoint.
    pub fn with_endpoint(mut self, endpoint: Url) -> Self {
        self.endpoint = endpoint;
        self
    }

    /// Sets the output directory for code blocks.
    pub fn with_out_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.out_dir = dir.into();
        self
    }

    /// Sets the path policy.
    pub fn with_path_policy(mut self, policy: PathPolicy) -> Self {
        self.path_policy = policy;
        self
    }

    /// Disables ANSI colors.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ChatConfig::new();
        assert_eq!(config.model, "openai/gpt-4o-mini");
        assert!(config.api_key.is_empty());
        assert_eq!(config.endpoint, default_endpoint());
        assert_eq!(config.path_policy, PathPolicy::Confined);
        assert!(config.use_color);
    }

    #[test]
    fn config_from_args_defaults() {
        let config = ChatConfig::from_args(&ChatArgs::default(), "x/stored", "k");
        assert_eq!(config.model, "x/stored");
        assert_eq!(config.api_key, "k");
        assert_eq!(config.out_dir, PathBuf::from("."));
        assert!(config.use_color);
    }

    #[test]
    fn stored_alias_is_resolved() {
        let config = ChatConfig::from_args(&ChatArgs::default(), "grok", "k");
        assert_eq!(config.model, "xai/grok-2");
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            model: Some("Sonnet".to_string()),
            out_dir: Some("gen".to_string()),
            permissive_paths: true,
            no_color: true,
            ..ChatArgs::default()
        };
        let config = ChatConfig::from_args(&args, DEFAULT_MODEL, "k");
        assert_eq!(config.model, "anthropic/claude-3.5-sonnet");
        assert_eq!(config.out_dir, PathBuf::from("gen"));
        assert_eq!(config.path_policy, PathPolicy::Permissive);
        assert!(!config.use_color);
    }

    #[test]
    fn config_builder_pattern() {
        let endpoint = Url::parse("http://localhost:9999/v1/chat/completions").unwrap();
        let config = ChatConfig::new()
            .with_model("xai/grok-2")
            .with_api_key("sk")
            .with_endpoint(endpoint.clone())
            .with_out_dir("/tmp/out")
            .with_path_policy(PathPolicy::Permissive)
            .without_color();

        assert_eq!(config.model, "xai/grok-2");
        assert_eq!(config.api_key, "sk");
        assert_eq!(config.endpoint, endpoint);
        assert_eq!(config.out_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.path_policy, PathPolicy::Permissive);
        assert!(!config.use_color);
    }
}
