//! Values passed between the pipeline participants.

/// Words that end a chat session when typed on their own.
pub const EXIT_KEYWORDS: [&str; 2] = ["exit", "quit"];

/// A line typed by the user, already trimmed and non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserMessage(String);

impl UserMessage {
    /// Build a message from a raw input line. Blank lines yield `None`.
    pub fn from_line(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn text(&self) -> &str {
        &self.0
    }

    pub fn into_text(self) -> String {
        self.0
    }

    /// `exit` or `quit`, case-sensitive.
    pub fn is_exit(&self) -> bool {
        EXIT_KEYWORDS.contains(&self.0.as_str())
    }
}

/// What the response streamer hands to the display coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseFragment {
    /// A piece of response text belonging to response `generation`.
    Text { text: String, generation: u64 },
    /// The current response is finished.
    Done,
    /// The response (or the connection) failed.
    Error { message: String },
}

impl ResponseFragment {
    pub fn text(text: impl Into<String>, generation: u64) -> Self {
        Self::Text {
            text: text.into(),
            generation,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// True for [`ResponseFragment::Done`] and [`ResponseFragment::Error`].
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Text { .. })
    }
}
