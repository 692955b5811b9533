//! Slash command parsing for the chat application.
//!
//! Input starting with `/` controls the session and is never sent to the
//! model.

/// A parsed chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand {
    /// Display help information.
    Help,

    /// List model aliases.
    Models,

    /// Change the model for the rest of the session.
    Model(String),

    /// Change the API key for the rest of the session.
    Key(String),

    /// Clear the terminal.
    Clear,

    /// Exit the chat application.
    Exit,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command, or `None` if it
/// should be sent as a regular message.
///
/// # Examples
///
/// ```
/// # use percent::chat::{ChatCommand, parse_command};
/// assert_eq!(parse_command("/exit"), Some(ChatCommand::Exit));
/// assert!(parse_command("/model grok").is_some());
/// assert!(parse_command("write me a haiku").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();
    let rest = input.strip_prefix('/')?;

    let mut parts = rest.splitn(2, char::is_whitespace);
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(str::trim).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "help" | "?" => ChatCommand::Help,
        "models" => ChatCommand::Models,
        "model" => match argument {
            Some(model) => ChatCommand::Model(model.to_string()),
            None => ChatCommand::Invalid("Usage: /model <name-or-alias>".to_string()),
        },
        "key" => match argument {
            Some(key) => ChatCommand::Key(key.to_string()),
            None => ChatCommand::Invalid("Usage: /key <api-key>".to_string()),
        },
        "clear" => ChatCommand::Clear,
        "exit" | "quit" => ChatCommand::Exit,
        _ => ChatCommand::Invalid(format!("Unknown command: /{command}")),
    };

    Some(result)
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /help                  Show this help message
  /models                List model aliases
  /model <name>          Switch model (alias or provider/model)
  /key <key>             Set and save the API key
  /clear                 Clear the screen
  /exit                  Exit the chat (also /quit)"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_not_a_command() {
        assert_eq!(parse_command("hello"), None);
        assert_eq!(parse_command("  path/to/file"), None);
    }

    #[test]
    fn exit_commands() {
        assert_eq!(parse_command("/exit"), Some(ChatCommand::Exit));
        assert_eq!(parse_command("/quit"), Some(ChatCommand::Exit));
        assert_eq!(parse_command("  /EXIT  "), Some(ChatCommand::Exit));
    }

    #[test]
    fn model_command() {
        assert_eq!(
            parse_command("/model haiku"),
            Some(ChatCommand::Model("haiku".to_string()))
        );
        assert_eq!(
            parse_command("/model   openai/gpt-4o  "),
            Some(ChatCommand::Model("openai/gpt-4o".to_string()))
        );
    }

    #[test]
    fn missing_arguments_produce_usage() {
        assert_eq!(
            parse_command("/model"),
            Some(ChatCommand::Invalid("Usage: /model <name-or-alias>".to_string()))
        );
        assert_eq!(
            parse_command("/key "),
            Some(ChatCommand::Invalid("Usage: /key <api-key>".to_string()))
        );
    }

    #[test]
    fn key_and_misc_commands() {
        assert_eq!(
            parse_command("/key sk-or-1"),
            Some(ChatCommand::Key("sk-or-1".to_string()))
        );
        assert_eq!(parse_command("/models"), Some(ChatCommand::Models));
        assert_eq!(parse_command("/clear"), Some(ChatCommand::Clear));
        assert_eq!(parse_command("/?"), Some(ChatCommand::Help));
    }

    #[test]
    fn unknown_command() {
        assert_eq!(
            parse_command("/frobnicate now"),
            Some(ChatCommand::Invalid("Unknown command: /frobnicate".to_string()))
        );
    }

    #[test]
    fn help_lists_every_command() {
        let help = help_text();
        for cmd in ["/help", "/models", "/model", "/key", "/clear", "/exit"] {
            assert!(help.contains(cmd), "{cmd}");
        }
    }

    #[test]
    fn help_says_key_is_saved() {
        let line = help_text()
            .lines()
            .find(|l| l.trim_start().starts_with("/key"))
            .unwrap();
        assert!(line.contains("Set and save the API key"), "{line}");
        assert!(!line.contains("for this session"), "{line}");
    }
}
