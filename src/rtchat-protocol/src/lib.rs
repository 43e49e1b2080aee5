//! rtchat Protocol - JSON events exchanged with a realtime model endpoint.
//!
//! Every message on the wire is a JSON object discriminated by its `type`
//! field. [`ClientEvent`] covers what the client sends; [`ServerEvent`]
//! covers what the client understands from the server, with anything else
//! collapsing into [`ServerEvent::Unknown`].

pub mod client_events;
pub mod error;
pub mod server_events;

#[cfg(test)]
mod tests;

// Re-exports
pub use client_events::{ClientEvent, ContentPart, ConversationItem, Modality, ResponseConfig, Role};
pub use error::{ProtocolError, ProtocolResult};
pub use server_events::{
    CANCEL_NOT_ACTIVE_CODE, ResponseInfo, ResponseStatus, ServerError, ServerEvent,
};
