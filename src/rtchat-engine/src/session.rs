//! Chat session orchestration.
//!
//! A session wires three tasks (input reader, response streamer, display
//! coordinator) to two channels and one cancellation token:
//!
//! ```text
//! stdin ──> InputReader ──UserMessage──────┐
//!                                          ├──> DisplayCoordinator ──> stdout
//! transport ──> ResponseStreamer ──Fragment┘            │
//!     ^                                                 │
//!     └──────────── send / cancel ──────────────────────┘
//! ```
//!
//! Shutdown order: the token is raised, all three tasks are joined, and
//! only then is the transport closed.
//!
//! The input reader owns the only message sender, so end of input closes
//! the message channel and ends the session. The session itself keeps a
//! fragment sender until every task has joined: a streamer that stops
//! after a read failure leaves the session usable.

use std::io::Write;
use std::sync::Arc;

use tokio::io::AsyncBufRead;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{ChatConfig, DEFAULT_FRAGMENT_BUFFER, DEFAULT_INPUT_BUFFER};
use crate::coordinator::{DisplayCoordinator, SessionSummary};
use crate::display::Display;
use crate::error::{ChatError, ChatResult};
use crate::input::InputReader;
use crate::state::ConversationState;
use crate::streamer::ResponseStreamer;
use crate::transport::Transport;

/// Tunables for a session.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Capacity of the user-message channel.
    pub input_buffer: usize,
    /// Capacity of the response-fragment channel.
    pub fragment_buffer: usize,
    /// Model name shown in the banner.
    pub model: Option<String>,
    /// Print the banner at start.
    pub show_banner: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            input_buffer: DEFAULT_INPUT_BUFFER,
            fragment_buffer: DEFAULT_FRAGMENT_BUFFER,
            model: None,
            show_banner: true,
        }
    }
}

impl SessionOptions {
    pub fn from_config(config: &ChatConfig) -> Self {
        Self {
            input_buffer: config.input_buffer(),
            fragment_buffer: config.fragment_buffer(),
            model: Some(config.model().to_string()),
            show_banner: true,
        }
    }
}

/// One interactive chat over one transport.
pub struct ChatSession<T: Transport> {
    transport: Arc<T>,
    state: ConversationState,
    options: SessionOptions,
    shutdown: CancellationToken,
}

impl<T: Transport> ChatSession<T> {
    pub fn new(transport: T, options: SessionOptions) -> Self {
        Self {
            transport: Arc::new(transport),
            state: ConversationState::new(),
            options,
            shutdown: CancellationToken::new(),
        }
    }

    /// End the session when `shutdown` is cancelled.
    ///
    /// The session derives its own cancellation from this token, so
    /// cancelling it stops the session but nothing the session does
    /// cancels it.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Shared handle to this session's state machine.
    pub fn state(&self) -> ConversationState {
        self.state.clone()
    }

    /// Token that ends the session from outside (Ctrl+C and the like).
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run until the user exits or the session is cancelled.
    pub async fn run<R, W>(self, input: R, output: W) -> ChatResult<SessionSummary>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
        W: Write + Send + 'static,
    {
        let cancel = self.shutdown.child_token();
        let (message_tx, message_rx) = mpsc::channel(self.options.input_buffer);
        let (fragment_tx, fragment_rx) = mpsc::channel(self.options.fragment_buffer);

        let mut display = Display::new(output);
        if self.options.show_banner {
            display.banner(self.options.model.as_deref());
        }

        let reader = InputReader::new(input, message_tx, cancel.clone());
        let streamer = ResponseStreamer::new(
            self.transport.clone(),
            self.state.clone(),
            fragment_tx.clone(),
            cancel.clone(),
        );
        let coordinator = DisplayCoordinator::new(
            self.transport.clone(),
            self.state.clone(),
            message_rx,
            fragment_rx,
            cancel.clone(),
            display,
        );

        info!("Starting chat session");
        let reader_task = tokio::spawn(reader.run());
        let streamer_task = tokio::spawn(streamer.run());
        let coordinator_task = tokio::spawn(coordinator.run());

        cancel.cancelled().await;
        debug!("Cancellation raised, waiting for participants");

        let (reader_exit, streamer_exit, coordinator_result) =
            tokio::join!(reader_task, streamer_task, coordinator_task);

        // Every participant has stopped: nothing can send on it anymore.
        drop(fragment_tx);

        if let Err(e) = self.transport.close().await {
            warn!(error = %e, "Failed to close transport");
        }

        match &reader_exit {
            Ok(exit) => debug!(?exit, "Input reader joined"),
            Err(e) => error!(error = %e, "Input reader task failed"),
        }
        match &streamer_exit {
            Ok(exit) => debug!(?exit, "Response streamer joined"),
            Err(e) => error!(error = %e, "Response streamer task failed"),
        }

        let summary = coordinator_result
            .map_err(|e| ChatError::Internal(format!("display coordinator failed: {}", e)))?;
        info!(
            messages_sent = summary.messages_sent,
            send_failures = summary.send_failures,
            fragments_displayed = summary.fragments_displayed,
            fragments_discarded = summary.fragments_discarded,
            "Chat session ended"
        );
        Ok(summary)
    }
}
