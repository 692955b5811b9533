//! Output rendering for the chat application.
//!
//! A trait-based rendering abstraction. The default implementation writes to
//! stdout with ANSI styling; errors go to stderr.

use std::io::{self, Stdout, Write};
use std::path::Path;

use crate::codegen::WriteMode;

/// ANSI escape code for dim text (used for the thinking indicator).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for the assistant prefix).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for yellow text (used for warnings).
const ANSI_YELLOW: &str = "\x1b[33m";

/// ANSI escape code for green text (used for generated files).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Carriage return plus erase-line, used to remove the thinking indicator.
const CLEAR_LINE: &str = "\r\x1b[2K";

/// Trait for rendering chat output.
pub trait Renderer {
    /// Show that a request is in flight and no token has arrived yet.
    fn start_thinking(&mut self);

    /// Remove the thinking indicator, if shown.
    fn stop_thinking(&mut self);

    /// Print a chunk of response text as it streams in.
    ///
    /// The first chunk of a response is preceded by the assistant prefix.
    fn print_text(&mut self, text: &str);

    /// Called when a response is complete.
    fn finish_response(&mut self);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Print a warning.
    fn print_warning(&mut self, warning: &str);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Report a file written from a code block.
    fn print_generated(&mut self, path: &Path, mode: WriteMode);

    /// Report an existing file that was left alone.
    fn print_skipped(&mut self, path: &Path);
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
    thinking: bool,
    in_response: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
            thinking: false,
            in_response: false,
        }
    }

    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.use_color {
            format!("{color}{text}{ANSI_RESET}")
        } else {
            text.to_string()
        }
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn start_thinking(&mut self) {
        if self.thinking {
            return;
        }
        self.thinking = true;
        self.in_response = false;
        print!("{}", self.paint(ANSI_DIM, "Thinking…"));
        self.flush();
    }

    fn stop_thinking(&mut self) {
        if !self.thinking {
            return;
        }
        self.thinking = false;
        if self.use_color {
            print!("{CLEAR_LINE}");
        } else {
            println!();
        }
        self.flush();
    }

    fn print_text(&mut self, text: &str) {
        self.stop_thinking();
        if !self.in_response {
            self.in_response = true;
            print!("{}", self.paint(ANSI_CYAN, "assistant: "));
        }
        print!("{text}");
        self.flush();
    }

    fn finish_response(&mut self) {
        self.stop_thinking();
        if self.in_response {
            println!();
            self.in_response = false;
        }
        self.flush();
    }

    fn print_info(&mut self, info: &str) {
        self.stop_thinking();
        println!("{info}");
    }

    fn print_warning(&mut self, warning: &str) {
        self.stop_thinking();
        println!("{}", self.paint(ANSI_YELLOW, warning));
    }

    fn print_error(&mut self, error: &str) {
        self.stop_thinking();
        eprintln!("{}", self.paint(ANSI_RED, &format!("Error: {error}")));
    }

    fn print_generated(&mut self, path: &Path, mode: WriteMode) {
        let verb = match mode {
            WriteMode::Write => "wrote",
            WriteMode::Append => "appended",
        };
        println!(
            "{}",
            self.paint(ANSI_GREEN, &format!("  {verb} {}", path.display()))
        );
    }

    fn print_skipped(&mut self, path: &Path) {
        println!(
            "{}",
            self.paint(ANSI_YELLOW, &format!("  skipped {}", path.display()))
        );
    }
}
