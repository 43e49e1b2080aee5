//! Events received from the server.
//!
//! Only the kinds the chat client acts on are modelled. Anything else,
//! including kinds added to the protocol later, decodes as
//! [`ServerEvent::Unknown`] instead of failing.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, ProtocolResult};

/// Error code the server uses when a `response.cancel` finds nothing to cancel.
pub const CANCEL_NOT_ACTIVE_CODE: &str = "response_cancel_not_active";

/// Server-to-client events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// The server started generating a response.
    #[serde(rename = "response.created")]
    ResponseCreated {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        response: Option<ResponseInfo>,
    },
    /// An incremental piece of response text.
    #[serde(rename = "response.text.delta")]
    ResponseTextDelta {
        delta: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        response_id: Option<String>,
    },
    /// A response finished; `response.status` says how.
    #[serde(rename = "response.done")]
    ResponseDone {
        #[serde(default)]
        response: ResponseInfo,
    },
    /// A response was cancelled.
    #[serde(rename = "response.cancelled")]
    ResponseCancelled {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        response: Option<ResponseInfo>,
    },
    /// The server rejected something the client did.
    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        error: ServerError,
    },
    /// Any event kind the client does not act on.
    #[serde(other)]
    Unknown,
}

impl ServerEvent {
    /// Decode one wire message.
    pub fn from_json(text: &str) -> ProtocolResult<Self> {
        serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))
    }

    /// Serialize to wire JSON.
    pub fn to_json(&self) -> ProtocolResult<String> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }

    /// Shorthand for a text delta.
    pub fn text_delta(delta: impl Into<String>) -> Self {
        Self::ResponseTextDelta {
            delta: delta.into(),
            response_id: None,
        }
    }

    /// Shorthand for a `response.done` with the given status.
    pub fn done(status: impl Into<String>) -> Self {
        Self::ResponseDone {
            response: ResponseInfo {
                id: None,
                status: Some(status.into()),
            },
        }
    }

    /// Shorthand for a server error with a message.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: ServerError {
                message: message.into(),
                ..ServerError::default()
            },
        }
    }

    /// The wire name of this event, `None` for [`ServerEvent::Unknown`].
    pub fn kind(&self) -> Option<&'static str> {
        match self {
            Self::ResponseCreated { .. } => Some("response.created"),
            Self::ResponseTextDelta { .. } => Some("response.text.delta"),
            Self::ResponseDone { .. } => Some("response.done"),
            Self::ResponseCancelled { .. } => Some("response.cancelled"),
            Self::Error { .. } => Some("error"),
            Self::Unknown => None,
        }
    }
}

/// The `response` object nested in response lifecycle events.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl ResponseInfo {
    /// Parsed status; a missing field reads as `unknown`.
    pub fn status(&self) -> ResponseStatus {
        ResponseStatus::parse(self.status.as_deref().unwrap_or("unknown"))
    }
}

/// Completion status reported by `response.done`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseStatus {
    Completed,
    Cancelled,
    /// Any other value, kept verbatim for logging.
    Other(String),
}

impl ResponseStatus {
    pub fn parse(status: &str) -> Self {
        match status {
            "completed" => Self::Completed,
            "cancelled" => Self::Cancelled,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => f.write_str("completed"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::Other(status) => f.write_str(status),
        }
    }
}

/// The `error` object of a server error event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerError {
    #[serde(default)]
    pub message: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ServerError {
    /// True when the server is answering a cancel that arrived after the
    /// response had already finished.
    pub fn is_cancel_not_active(&self) -> bool {
        self.code.as_deref() == Some(CANCEL_NOT_ACTIVE_CODE)
    }
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = if self.message.is_empty() {
            "unspecified server error"
        } else {
            &self.message
        };
        match &self.code {
            Some(code) => write!(f, "{message} ({code})"),
            None => f.write_str(message),
        }
    }
}
