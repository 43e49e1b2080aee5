//! Transport seam between the chat pipeline and the wire.
//!
//! # Concurrency contract
//!
//! A transport is shared by two participants at once: the response
//! streamer is its only reader and the display coordinator its only
//! writer. Implementations must allow one `receive` and one `send` to be
//! in progress at the same time without the caller adding any locking.
//! Concurrent calls of the *same* method are not required to be supported.

pub mod websocket;

use async_trait::async_trait;
use rtchat_protocol::{ClientEvent, ServerEvent};

use crate::error::ChatResult;

pub use websocket::WebSocketTransport;

/// A bidirectional event connection.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Send one event.
    async fn send(&self, event: &ClientEvent) -> ChatResult<()>;

    /// Wait for the next event the client can decode.
    ///
    /// Must be cancel-safe: dropping the future before it resolves loses
    /// no event.
    async fn receive(&self) -> ChatResult<ServerEvent>;

    /// Close the connection. Closing twice is not an error.
    async fn close(&self) -> ChatResult<()>;
}
