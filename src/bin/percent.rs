//! Chat with models behind OpenRouter from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Interactive chat with the default model
//! percent
//!
//! # Pick a model by alias or full identifier
//! percent --model claude
//!
//! # One-shot prompt
//! percent --model chatgpt "Explain quantum computing"
//!
//! # Store credentials and defaults
//! percent --set-key sk-or-...
//! percent --set-model haiku
//!
//! # Housekeeping
//! percent models
//! percent clear
//! ```
//!
//! Code blocks in a response are written to disk. A block whose header names
//! a file (```` ```ts file="src/a.ts" ````) goes to that path; others become
//! `snippet-N.<ext>`. When a target exists you are asked whether to
//! overwrite, append or skip.

use std::path::Path;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

use percent::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, PlainTextRenderer, Renderer, help_text,
    parse_command,
};
use percent::codegen::{ConflictDecision, ConflictResolver, FixedDecision};
use percent::config::{ConfigStore, Config};
use percent::history::HistoryStore;
use percent::models::alias_table;
use percent::{Gateway, init_logging};

const USAGE: &str = "percent [OPTIONS] [clear | models | PROMPT...]";
const VERSION: &str = env!("CARGO_PKG_VERSION");
const MISSING_KEY: &str =
    "Missing OpenRouter API key. Set OPENROUTER_API_KEY env or run: percent --set-key <key>";

/// Asks on the terminal what to do with files that already exist.
struct PromptResolver<'a> {
    editor: &'a mut DefaultEditor,
}

#[async_trait::async_trait(?Send)]
impl ConflictResolver for PromptResolver<'_> {
    async fn resolve(&mut self, path: &Path) -> ConflictDecision {
        println!("{} already exists.", path.display());
        loop {
            match self.editor.readline("[o]verwrite, [a]ppend or [s]kip? ") {
                Ok(answer) => match answer.parse() {
                    Ok(decision) => return decision,
                    Err(err) => println!("{err}"),
                },
                Err(_) => return ConflictDecision::Skip,
            }
        }
    }
}

/// Main entry point for the percent application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let raw: Vec<String> = std::env::args().skip(1).collect();
    if raw.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }
    if raw.iter().any(|a| a == "-v") {
        println!("{VERSION}");
        return Ok(());
    }

    let (args, free) = ChatArgs::from_command_line_relaxed(USAGE);
    if args.version {
        println!("{VERSION}");
        return Ok(());
    }
    let free: Vec<String> = free.into_iter().filter(|a| !a.starts_with("--")).collect();
    let subcommand = free.first().map(String::as_str);

    if args.models || subcommand == Some("models") {
        print_models();
        return Ok(());
    }
    if subcommand == Some("clear") {
        HistoryStore::from_env()?.clear()?;
        println!("✔ History cleared");
        return Ok(());
    }

    let store = ConfigStore::from_env()?;
    if let Some(key) = &args.set_key {
        store.write(&Config {
            api_key: Some(key.clone()),
            ..store.read()
        })?;
        println!("✔ API key saved to config");
        return Ok(());
    }
    if let Some(model) = &args.set_model {
        store.write(&Config {
            model: Some(model.clone()),
            ..store.read()
        })?;
        println!("✔ Default model saved to config");
        return Ok(());
    }

    let Some(api_key) = store.resolve_api_key() else {
        eprintln!("{MISSING_KEY}");
        std::process::exit(1);
    };
    let config = ChatConfig::from_args(&args, &store.resolve_default_model(), api_key);
    let gateway = Gateway::new()?;

    let prompt = free.join(" ");
    if !prompt.trim().is_empty() {
        one_shot(gateway, config, &prompt).await
    } else {
        repl(gateway, config, store).await
    }
}

async fn one_shot(
    gateway: Gateway,
    config: ChatConfig,
    prompt: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut renderer = PlainTextRenderer::with_color(config.use_color);
    let mut session = ChatSession::new(gateway, config);
    let text = match session.send_streaming(prompt, &mut renderer).await {
        Ok(text) => text,
        Err(err) => {
            renderer.print_error(&err.to_string());
            std::process::exit(1);
        }
    };
    match DefaultEditor::new() {
        Ok(mut editor) => {
            let mut resolver = PromptResolver {
                editor: &mut editor,
            };
            session
                .write_code_blocks(&text, &mut renderer, &mut resolver)
                .await?;
        }
        Err(err) => {
            tracing::warn!(error = %err, "no terminal for conflict prompts; skipping existing files");
            session
                .write_code_blocks(
                    &text,
                    &mut renderer,
                    &mut FixedDecision(ConflictDecision::Skip),
                )
                .await?;
        }
    }
    Ok(())
}

async fn repl(
    gateway: Gateway,
    config: ChatConfig,
    store: ConfigStore,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut renderer = PlainTextRenderer::with_color(config.use_color);
    let mut session = ChatSession::new(gateway, config);
    match HistoryStore::from_env() {
        Ok(history) => session = session.with_history(history),
        Err(err) => renderer.print_warning(&format!("History disabled: {err}")),
    }
    let mut rl = DefaultEditor::new()?;

    print_banner(&session);

    loop {
        match rl.readline("you: ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Exit => break,
                        ChatCommand::Clear => {
                            print!("\x1b[2J\x1b[H");
                            print_banner(&session);
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {line}");
                            }
                        }
                        ChatCommand::Models => print_models(),
                        ChatCommand::Model(name) => {
                            let model = session.set_model(&name).to_string();
                            renderer.print_info(&format!("→ Switched model to {model}"));
                        }
                        ChatCommand::Key(key) => {
                            session.set_api_key(key.clone());
                            let saved = store.write(&Config {
                                api_key: Some(key),
                                ..store.read()
                            });
                            match saved {
                                Ok(()) => renderer.print_info("✔ API key saved."),
                                Err(err) => renderer.print_warning(&format!(
                                    "API key set for this session but not saved: {err}"
                                )),
                            }
                        }
                        ChatCommand::Invalid(message) => renderer.print_warning(&message),
                    }
                    continue;
                }

                match session.send_streaming(line, &mut renderer).await {
                    Ok(text) => {
                        let mut resolver = PromptResolver { editor: &mut rl };
                        if let Err(err) = session
                            .write_code_blocks(&text, &mut renderer, &mut resolver)
                            .await
                        {
                            renderer.print_error(&format!("Code generation error: {err}"));
                        }
                    }
                    Err(err) => renderer.print_error(&err.to_string()),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!();
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {err}"));
                break;
            }
        }
    }

    Ok(())
}

fn print_banner(session: &ChatSession) {
    println!("percent (model: {})", session.model());
    println!("Type /help for commands, /exit to quit, /model <name> to switch.\n");
}

fn print_models() {
    println!("Model aliases:");
    println!("{}", alias_table());
}

fn print_help() {
    println!(
        r#"percent {VERSION} - chat with multiple AI models from your terminal

Usage:
  {USAGE}

Examples:
  percent --model chatgpt
  percent --model chatgpt "Explain quantum computing"
  percent clear
  percent --models

Options:
  --model <alias|provider/model>  Select model (aliases: chatgpt, gemini, grok, claude, ...)
  --set-key <key>                 Save your OpenRouter API key to config
  --set-model <model>             Save default model to config
  --models                        List built-in model aliases
  --out-dir <dir>                 Write code blocks under <dir>
  --permissive-paths              Allow code blocks to target absolute and .. paths
  --no-color                      Disable ANSI colors
  --help, -h                      Show help
  --version, -v                   Show version

Environment:
  OPENROUTER_API_KEY              Overrides the stored API key
  PERCENT_LOG                     Log filter (e.g. debug); falls back to RUST_LOG

REPL:
{}"#,
        help_text()
    );
}
