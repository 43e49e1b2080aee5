//! Streaming chat engine for rtchat.
//!
//! This crate runs a text conversation against a realtime completion
//! server over a persistent, full-duplex connection:
//! - A response state machine shared by all pipeline participants
//! - A [`Transport`] seam with a WebSocket implementation
//! - The three-task pipeline (input reader, response streamer, display
//!   coordinator) behind [`ChatSession`]
//! - A one-shot [`ask()`] mode for scripts
//!
//! # Example
//!
//! ```rust,ignore
//! use rtchat_engine::{ChatConfig, ChatSession, SessionOptions, WebSocketTransport};
//!
//! ChatConfig::load_env_file(None)?;
//! let config = ChatConfig::from_env()?;
//! let transport = WebSocketTransport::connect(&config).await?;
//! let session = ChatSession::new(transport, SessionOptions::from_config(&config));
//! let input = tokio::io::BufReader::new(tokio::io::stdin());
//! session.run(input, std::io::stdout()).await?;
//! ```
//!
//! # Configuration
//!
//! Required environment variables:
//! - `OPENAI_API_KEY` - API key sent as a bearer token
//!
//! Optional:
//! - `OPENAI_WEBSOCKET_URL` - Realtime endpoint
//! - `MODEL` - Model name passed as the `model` query parameter
//! - `RTCHAT_INPUT_BUFFER` / `RTCHAT_FRAGMENT_BUFFER` - Channel capacities

pub mod ask;
pub mod config;
pub mod coordinator;
pub mod display;
pub mod error;
pub mod input;
pub mod messages;
pub mod session;
pub mod state;
pub mod streamer;
pub mod transport;

// Re-export main types
pub use ask::{AskOutcome, ask};
pub use config::ChatConfig;
pub use coordinator::{DisplayCoordinator, SessionSummary};
pub use display::Display;
pub use error::{ChatError, ChatResult};
pub use input::{InputReader, ReaderExit};
pub use messages::{ResponseFragment, UserMessage};
pub use session::{ChatSession, SessionOptions};
pub use state::{ConversationState, ResponseState};
pub use streamer::{ResponseStreamer, StreamerExit, translate_event};
pub use transport::{Transport, WebSocketTransport};
