//! Events sent from the client to the server.

use serde::{Deserialize, Serialize};

use crate::error::{ProtocolError, ProtocolResult};

/// Client-to-server events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Append an item to the server-side conversation.
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate {
        /// The item to add.
        item: ConversationItem,
    },
    /// Ask the server to generate a response from the conversation so far.
    #[serde(rename = "response.create")]
    ResponseCreate {
        /// Optional per-response overrides.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        response: Option<ResponseConfig>,
    },
    /// Cancel the response currently being generated.
    #[serde(rename = "response.cancel")]
    ResponseCancel,
}

impl ClientEvent {
    /// A user message carrying one `input_text` content part.
    pub fn user_message(text: impl Into<String>) -> Self {
        Self::ConversationItemCreate {
            item: ConversationItem::user_text(text),
        }
    }

    /// A response request restricted to text output.
    pub fn text_response() -> Self {
        Self::ResponseCreate {
            response: Some(ResponseConfig {
                modalities: vec![Modality::Text],
            }),
        }
    }

    /// A cancellation of the in-flight response.
    pub fn cancel_response() -> Self {
        Self::ResponseCancel
    }

    /// The wire name of this event.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConversationItemCreate { .. } => "conversation.item.create",
            Self::ResponseCreate { .. } => "response.create",
            Self::ResponseCancel => "response.cancel",
        }
    }

    /// Serialize to the JSON text sent on the wire.
    pub fn to_json(&self) -> ProtocolResult<String> {
        serde_json::to_string(self).map_err(|e| ProtocolError::Encode(e.to_string()))
    }
}

/// A conversation item. Only user messages are produced by this client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationItem {
    /// Item kind; always `message` here.
    #[serde(rename = "type")]
    pub item_type: String,
    /// Author of the item.
    pub role: Role,
    /// Content parts.
    pub content: Vec<ContentPart>,
}

impl ConversationItem {
    /// A user message with a single text part.
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            item_type: "message".to_string(),
            role: Role::User,
            content: vec![ContentPart::InputText { text: text.into() }],
        }
    }

    /// Concatenated text of all text parts.
    pub fn text(&self) -> String {
        self.content
            .iter()
            .map(|part| match part {
                ContentPart::InputText { text } => text.as_str(),
            })
            .collect()
    }
}

/// Message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// A piece of item content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    /// Text typed by the user.
    InputText { text: String },
}

/// Per-response overrides for `response.create`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseConfig {
    /// Output modalities the response may use.
    pub modalities: Vec<Modality>,
}

/// Output modality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Text,
    Audio,
}
