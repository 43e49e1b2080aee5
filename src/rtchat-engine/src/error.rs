//! Error types for the chat engine.
//!
//! Transport-fatal errors end the streaming side of a session. Everything
//! else is turned into user-visible text and the session keeps going.

use rtchat_protocol::ProtocolError;
use thiserror::Error;

use crate::state::ResponseState;

/// Errors that can occur while running a chat session.
#[derive(Error, Debug)]
pub enum ChatError {
    /// Configuration error (missing or invalid setting).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Could not establish the connection.
    #[error("Connection failed: {0}")]
    Connect(String),

    /// WebSocket protocol or I/O failure on an established connection.
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// The connection was closed by the peer.
    #[error("Connection closed")]
    Closed,

    /// A message could not be written to the connection.
    #[error("Send failed: {0}")]
    Send(String),

    /// Encoding or decoding a wire event failed.
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The server reported an error.
    #[error("Server error: {0}")]
    Server(String),

    /// A state transition was refused because of the current state.
    #[error("Cannot {action} while {state}")]
    StateConflict {
        /// What was attempted.
        action: &'static str,
        /// The state that refused it.
        state: ResponseState,
    },

    /// Local I/O failure (stdin, stdout, files).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error (task failure and the like).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChatError {
    /// True for errors after which the connection cannot be read from again.
    pub fn is_transport_fatal(&self) -> bool {
        matches!(
            self,
            ChatError::Connect(_) | ChatError::WebSocket(_) | ChatError::Closed
        )
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ChatError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;

        match err {
            WsError::ConnectionClosed | WsError::AlreadyClosed => ChatError::Closed,
            other => ChatError::WebSocket(other.to_string()),
        }
    }
}

impl From<url::ParseError> for ChatError {
    fn from(err: url::ParseError) -> Self {
        ChatError::Config(format!("Invalid WebSocket URL: {}", err))
    }
}

/// Result type for chat operations.
pub type ChatResult<T> = std::result::Result<T, ChatError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ChatError::Config("OPENAI_API_KEY is not set".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: OPENAI_API_KEY is not set"
        );

        let err = ChatError::StateConflict {
            action: "start a response",
            state: ResponseState::Responding,
        };
        assert_eq!(err.to_string(), "Cannot start a response while Responding");
    }

    #[test]
    fn test_error_classes() {
        assert!(ChatError::Closed.is_transport_fatal());
        assert!(ChatError::Connect("refused".into()).is_transport_fatal());
        assert!(!ChatError::Send("broken pipe".into()).is_transport_fatal());
        assert!(!ChatError::Server("bad request".into()).is_transport_fatal());
    }

    #[test]
    fn test_tungstenite_close_maps_to_closed() {
        let err: ChatError = tokio_tungstenite::tungstenite::Error::ConnectionClosed.into();
        assert!(matches!(err, ChatError::Closed));
    }
}
