//! Output rendering for the terminal chat surface.
//!
//! The renderer trait keeps the controller and binary independent of how
//! output is produced: ANSI-styled text for interactive use, unstyled text
//! for piping, or a capturing implementation in tests.

use std::io::{self, Stdout, Write};

use crate::types::SourceRef;

/// ANSI escape code for dim text (used for citations and hints).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code for cyan text (used for labels).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// Trait for rendering chat output.
pub trait Renderer: Send {
    /// Prints an informational notice.
    fn print_info(&mut self, message: &str);

    /// Prints an error notification.
    fn print_error(&mut self, message: &str);

    /// Called before the assistant's answer starts revealing.
    fn begin_answer(&mut self) {}

    /// Prints newly revealed characters without a trailing newline.
    fn print_reveal_chunk(&mut self, delta: &str);

    /// Called once the answer has fully settled.
    fn end_answer(&mut self) {}

    /// Prints the citations grounding an answer.
    fn print_sources(&mut self, sources: &[SourceRef]);

    /// Prints suggested follow-up questions.
    fn print_suggestions(&mut self, suggestions: &[String]);
}

/// Renderer that writes plain text to stdout, optionally ANSI-styled.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
}

impl PlainTextRenderer {
    /// Creates a renderer with colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a renderer with colors explicitly on or off.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
        }
    }

    fn styled(&self, code: &str, text: &str) -> String {
        if self.use_color {
            format!("{code}{text}{ANSI_RESET}")
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
    fn print_info(&mut self, message: &str) {
        println!("{}", self.styled(ANSI_DIM, message));
    }

    fn print_error(&mut self, message: &str) {
        eprintln!("{}", self.styled(ANSI_RED, &format!("error: {message}")));
    }

    fn begin_answer(&mut self) {
        println!("{}", self.styled(ANSI_CYAN, "Assistant:"));
    }

    fn print_reveal_chunk(&mut self, delta: &str) {
        print!("{delta}");
        let _ = self.stdout.flush();
    }

    fn end_answer(&mut self) {
        println!();
    }

    fn print_sources(&mut self, sources: &[SourceRef]) {
        if sources.is_empty() {
            return;
        }
        println!("{}", self.styled(ANSI_DIM, "  Sources:"));
        for (i, source) in sources.iter().enumerate() {
            let line = format!("    [{}] {}", i + 1, source.label());
            println!("{}", self.styled(ANSI_DIM, &line));
        }
    }

    fn print_suggestions(&mut self, suggestions: &[String]) {
        if suggestions.is_empty() {
            return;
        }
        println!("{}", self.styled(ANSI_DIM, "  You could ask:"));
        for suggestion in suggestions {
            println!("{}", self.styled(ANSI_DIM, &format!("    - {suggestion}")));
        }
    }
}
