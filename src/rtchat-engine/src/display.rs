//! Terminal output for a chat session.
//!
//! Response text is written as it arrives and flushed after every
//! fragment. Notices and errors go to the same writer so they interleave
//! with the transcript in the order they happened.

use std::io::{self, Write};

use tracing::warn;

/// Output writer for the chat transcript.
pub struct Display<W: Write> {
    out: W,
    /// Whether an assistant line is open and needs a newline before anything else.
    line_open: bool,
}

impl<W: Write> Display<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            line_open: false,
        }
    }

    /// Session banner.
    pub fn banner(&mut self, model: Option<&str>) {
        match model {
            Some(model) => self.line(&format!("Realtime chat ({model})")),
            None => self.line("Realtime chat"),
        }
        self.line("Type 'exit' or 'quit' to end");
        self.line("────────────────────────────");
    }

    /// Start of an assistant answer.
    pub fn begin_response(&mut self) {
        self.close_line();
        self.write_raw("Assistant: ");
        self.line_open = true;
    }

    /// One piece of assistant text, shown immediately.
    pub fn fragment(&mut self, text: &str) {
        self.write_raw(text);
    }

    /// End of an assistant answer.
    pub fn end_response(&mut self) {
        self.close_line();
    }

    pub fn notice(&mut self, message: &str) {
        self.close_line();
        self.line(&format!("[{message}]"));
    }

    pub fn error(&mut self, message: &str) {
        self.close_line();
        self.line(&format!("[error] {message}"));
    }

    pub fn goodbye(&mut self) {
        self.close_line();
        self.line("Goodbye!");
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn close_line(&mut self) {
        if self.line_open {
            self.line_open = false;
            self.write_raw("\n");
        }
    }

    fn line(&mut self, text: &str) {
        self.write_raw(text);
        self.write_raw("\n");
    }

    fn write_raw(&mut self, text: &str) {
        if let Err(e) = write_flushed(&mut self.out, text) {
            warn!(error = %e, "Failed to write chat output");
        }
    }
}

fn write_flushed<W: Write>(out: &mut W, text: &str) -> io::Result<()> {
    out.write_all(text.as_bytes())?;
    out.flush()
}
