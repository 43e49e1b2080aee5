//! Response streamer: the server-facing side of the pipeline.
//!
//! Reads events from the transport, drives the state transitions the
//! server reports, and forwards response text to the display coordinator.

use std::sync::Arc;

use rtchat_protocol::{ResponseStatus, ServerEvent};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::error::ChatError;
use crate::messages::ResponseFragment;
use crate::state::{ConversationState, ResponseEnd, Settlement};
use crate::transport::Transport;

/// Why the streamer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamerExit {
    /// The session was cancelled.
    Cancelled,
    /// Reading from the transport failed.
    ReadFailed,
    /// The coordinator is gone.
    ChannelClosed,
}

/// Apply one server event to the state machine.
///
/// Returns the fragment the event produces for display, if any.
pub fn translate_event(state: &ConversationState, event: ServerEvent) -> Option<ResponseFragment> {
    match event {
        ServerEvent::ResponseCreated { response } => {
            info!(
                response_id = response.as_ref().and_then(|r| r.id.as_deref()),
                state = %state.get(),
                "Response started"
            );
            None
        }
        ServerEvent::ResponseTextDelta { delta, response_id } => match state.delta_generation() {
            Some(generation) => Some(ResponseFragment::text(delta, generation)),
            None => {
                debug!(
                    response_id = response_id.as_deref(),
                    state = %state.get(),
                    "Dropping delta outside an active response"
                );
                None
            }
        },
        ServerEvent::ResponseDone { response } => {
            let end = match response.status() {
                ResponseStatus::Completed => ResponseEnd::Completed,
                ResponseStatus::Cancelled => ResponseEnd::Cancelled,
                ResponseStatus::Other(status) => {
                    warn!(
                        status = %status,
                        response_id = response.id.as_deref(),
                        state = %state.get(),
                        "Unrecognized response.done status, treating as responded"
                    );
                    ResponseEnd::Unrecognized
                }
            };
            settle(state, end)
        }
        ServerEvent::ResponseCancelled { .. } => settle(state, ResponseEnd::CancelConfirmed),
        ServerEvent::Error { error } => {
            if error.is_cancel_not_active() {
                debug!(error = %error, "Cancel arrived after the response finished");
                return None;
            }
            error!(error = %error, "Server reported an error");
            state.reset();
            Some(ResponseFragment::error(error.to_string()))
        }
        ServerEvent::Unknown => {
            trace!("Ignoring unhandled server event");
            None
        }
    }
}

fn settle(state: &ConversationState, end: ResponseEnd) -> Option<ResponseFragment> {
    match state.settle(end) {
        Settlement::Applied(now) => {
            info!(?end, state = %now, "Response finished");
            Some(ResponseFragment::Done)
        }
        Settlement::Superseded => {
            debug!(?end, "Cancelled response drained, replacement still running");
            None
        }
        Settlement::Duplicate => {
            debug!(?end, "Ignoring second end event of a cancelled response");
            None
        }
    }
}

/// Reads the transport until cancelled or the connection fails.
///
/// Only transport-fatal read errors stop the streamer. Other read errors
/// are shown to the user and reading continues.
pub struct ResponseStreamer<T: Transport> {
    transport: Arc<T>,
    state: ConversationState,
    fragments: mpsc::Sender<ResponseFragment>,
    cancel: CancellationToken,
}

impl<T: Transport> ResponseStreamer<T> {
    pub fn new(
        transport: Arc<T>,
        state: ConversationState,
        fragments: mpsc::Sender<ResponseFragment>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            transport,
            state,
            fragments,
            cancel,
        }
    }

    pub async fn run(self) -> StreamerExit {
        let exit = self.stream().await;
        debug!(?exit, state = %self.state.get(), "Response streamer stopped");
        exit
    }

    async fn stream(&self) -> StreamerExit {
        loop {
            let received = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return StreamerExit::Cancelled,
                received = self.transport.receive() => received,
            };

            match received {
                Ok(event) => {
                    if let Some(fragment) = translate_event(&self.state, event) {
                        if let Some(exit) = self.forward(fragment).await {
                            return exit;
                        }
                    }
                }
                Err(e) if e.is_transport_fatal() => {
                    self.report_read_failure(&e);
                    return StreamerExit::ReadFailed;
                }
                Err(e) => {
                    warn!(error = %e, "Transport read error, still reading");
                    let fragment = ResponseFragment::error(e.to_string());
                    if let Some(exit) = self.forward(fragment).await {
                        return exit;
                    }
                }
            }
        }
    }

    /// Forward a fragment, racing the cancellation signal.
    async fn forward(&self, fragment: ResponseFragment) -> Option<StreamerExit> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Some(StreamerExit::Cancelled),
            sent = self.fragments.send(fragment) => sent.err().map(|_| StreamerExit::ChannelClosed),
        }
    }

    /// Best effort: never waits for room in the channel.
    fn report_read_failure(&self, err: &ChatError) {
        self.state.reset();

        if self.cancel.is_cancelled() {
            debug!(error = %err, "Transport read ended during shutdown");
            return;
        }
        error!(error = %err, "Transport read failed");

        let fragment = ResponseFragment::error(format!("Connection error: {}", err));
        if let Err(e) = self.fragments.try_send(fragment) {
            warn!(error = %e, "Could not report connection error to display");
        }
    }
}
