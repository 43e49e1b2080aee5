//! Display coordinator: the single consumer of user messages and response
//! fragments.
//!
//! It is the only participant that writes to the transport and the only
//! one that raises the session's cancellation signal. Any way out of
//! [`DisplayCoordinator::run`], including a panic, raises the signal.

use std::io::Write;
use std::sync::Arc;

use rtchat_protocol::ClientEvent;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::display::Display;
use crate::error::{ChatError, ChatResult};
use crate::messages::{ResponseFragment, UserMessage};
use crate::state::{ConversationState, ResponseState};
use crate::transport::Transport;

/// Counters reported when a session ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// User messages accepted and sent to the server.
    pub messages_sent: usize,
    /// User messages that could not be sent.
    pub send_failures: usize,
    /// Response fragments shown to the user.
    pub fragments_displayed: usize,
    /// Stale response fragments discarded.
    pub fragments_discarded: usize,
}

/// What ended the coordinator loop.
enum Flow {
    Continue,
    Stop,
}

pub struct DisplayCoordinator<T: Transport, W: Write> {
    transport: Arc<T>,
    state: ConversationState,
    messages: mpsc::Receiver<UserMessage>,
    fragments: mpsc::Receiver<ResponseFragment>,
    cancel: CancellationToken,
    display: Display<W>,
    /// Generation whose text is currently on screen.
    showing: Option<u64>,
    /// Text shown so far for the open response.
    partial: String,
    summary: SessionSummary,
}

impl<T: Transport, W: Write> DisplayCoordinator<T, W> {
    pub fn new(
        transport: Arc<T>,
        state: ConversationState,
        messages: mpsc::Receiver<UserMessage>,
        fragments: mpsc::Receiver<ResponseFragment>,
        cancel: CancellationToken,
        display: Display<W>,
    ) -> Self {
        Self {
            transport,
            state,
            messages,
            fragments,
            cancel,
            display,
            showing: None,
            partial: String::new(),
            summary: SessionSummary::default(),
        }
    }

    pub async fn run(mut self) -> SessionSummary {
        let _raise_on_exit = self.cancel.clone().drop_guard();

        loop {
            let flow = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!("Session cancelled");
                    Flow::Stop
                }
                fragment = self.fragments.recv() => match fragment {
                    Some(fragment) => {
                        self.on_fragment(fragment);
                        Flow::Continue
                    }
                    None => {
                        self.display.notice("response stream closed");
                        Flow::Stop
                    }
                },
                message = self.messages.recv() => match message {
                    Some(message) => self.on_user_message(message).await,
                    None => {
                        self.display.notice("input closed");
                        Flow::Stop
                    }
                },
            };

            if let Flow::Stop = flow {
                break;
            }
        }

        self.finish_response();
        self.cancel.cancel();
        self.summary
    }

    async fn on_user_message(&mut self, message: UserMessage) -> Flow {
        if message.is_exit() {
            self.display.goodbye();
            return Flow::Stop;
        }

        match self.state.get() {
            ResponseState::Responding => {
                self.finish_response();
                self.display.notice("interrupting current response");
                if let Err(e) = self.cancel_response().await {
                    warn!(error = %e, "Failed to cancel response");
                    self.display.error(&e.to_string());
                }
            }
            ResponseState::Cancelling => {
                self.display.notice("previous response still cancelling, sending anyway");
            }
            ResponseState::Idle | ResponseState::Responded => {}
        }

        match self.send_message(message.text()).await {
            Ok(()) => self.summary.messages_sent += 1,
            Err(e) => {
                self.summary.send_failures += 1;
                warn!(error = %e, "Failed to send message");
                self.display.error(&e.to_string());
            }
        }
        Flow::Continue
    }

    fn on_fragment(&mut self, fragment: ResponseFragment) {
        match fragment {
            ResponseFragment::Text { text, generation } => {
                let snapshot = self.state.snapshot();
                if !snapshot.state.is_displayable() || snapshot.generation != generation {
                    self.summary.fragments_discarded += 1;
                    debug!(
                        state = %snapshot.state,
                        generation,
                        current = snapshot.generation,
                        "Discarding stale fragment"
                    );
                    return;
                }

                if self.showing != Some(generation) {
                    self.finish_response();
                    self.display.begin_response();
                    self.showing = Some(generation);
                }
                self.display.fragment(&text);
                self.partial.push_str(&text);
                self.summary.fragments_displayed += 1;
            }
            ResponseFragment::Done => self.finish_response(),
            ResponseFragment::Error { message } => {
                self.finish_response();
                self.display.error(&message);
            }
        }
    }

    /// Close the response on screen, if any, and drop its buffered text.
    fn finish_response(&mut self) {
        if self.showing.take().is_some() {
            self.display.end_response();
            debug!(chars = self.partial.chars().count(), "Response display finished");
        }
        self.partial.clear();
    }

    async fn cancel_response(&mut self) -> ChatResult<()> {
        if !self.state.try_cancel() {
            return Err(ChatError::StateConflict {
                action: "cancel the response",
                state: self.state.get(),
            });
        }
        info!("Cancelling current response");
        self.transport.send(&ClientEvent::cancel_response()).await
    }

    /// Send a user message and request a response, without waiting for it.
    async fn send_message(&mut self, text: &str) -> ChatResult<()> {
        if !self.state.try_set_responding() {
            return Err(ChatError::StateConflict {
                action: "start a response",
                state: self.state.get(),
            });
        }
        let generation = self.state.generation();
        info!(generation, "Sending message");

        let sent = match self.transport.send(&ClientEvent::user_message(text)).await {
            Ok(()) => self.transport.send(&ClientEvent::text_response()).await,
            Err(e) => Err(e),
        };

        if sent.is_err() && self.state.abandon(generation) {
            debug!(generation, "Response abandoned after failed send");
        }
        sent
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use rtchat_protocol::ServerEvent;

    use super::*;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<ClientEvent>>,
    }

    #[async_trait]
    impl Transport for RecordingTransport {
        async fn send(&self, event: &ClientEvent) -> ChatResult<()> {
            self.sent.lock().push(event.clone());
            Ok(())
        }

        async fn receive(&self) -> ChatResult<ServerEvent> {
            std::future::pending().await
        }

        async fn close(&self) -> ChatResult<()> {
            Ok(())
        }
    }

    struct Fixture {
        transport: Arc<RecordingTransport>,
        state: ConversationState,
        messages: mpsc::Sender<UserMessage>,
        fragments: mpsc::Sender<ResponseFragment>,
        cancel: CancellationToken,
        coordinator: DisplayCoordinator<RecordingTransport, Vec<u8>>,
    }

    fn fixture() -> Fixture {
        let transport = Arc::new(RecordingTransport::default());
        let state = ConversationState::new();
        let (messages, messages_rx) = mpsc::channel(8);
        let (fragments, fragments_rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let coordinator = DisplayCoordinator::new(
            transport.clone(),
            state.clone(),
            messages_rx,
            fragments_rx,
            cancel.clone(),
            Display::new(Vec::new()),
        );
        Fixture {
            transport,
            state,
            messages,
            fragments,
            cancel,
            coordinator,
        }
    }

    fn output(coordinator: DisplayCoordinator<RecordingTransport, Vec<u8>>) -> String {
        String::from_utf8(coordinator.display.into_inner()).unwrap()
    }

    #[test]
    fn test_fragment_from_older_generation_is_discarded() {
        let mut f = fixture();
        assert!(f.state.try_set_responding());
        assert!(f.state.try_cancel());
        assert!(f.state.try_set_responding());
        assert_eq!(f.state.generation(), 2);

        f.coordinator.on_fragment(ResponseFragment::text("old", 1));
        f.coordinator.on_fragment(ResponseFragment::text("new", 2));

        assert_eq!(f.coordinator.summary.fragments_discarded, 1);
        assert_eq!(f.coordinator.summary.fragments_displayed, 1);
        assert_eq!(output(f.coordinator), "Assistant: new");
    }

    #[test]
    fn test_fragment_discarded_unless_displayable() {
        let mut f = fixture();
        assert!(f.state.try_set_responding());
        assert!(f.state.try_cancel());
        f.coordinator.on_fragment(ResponseFragment::text("late", 1));

        f.state.set_idle();
        f.coordinator.on_fragment(ResponseFragment::text("later", 1));

        assert_eq!(f.coordinator.summary.fragments_discarded, 2);
        assert_eq!(output(f.coordinator), "");
    }

    #[test]
    fn test_fragments_shown_after_response_finished() {
        let mut f = fixture();
        assert!(f.state.try_set_responding());
        f.state.set_responded();

        f.coordinator.on_fragment(ResponseFragment::text("tail", 1));
        f.coordinator.on_fragment(ResponseFragment::Done);

        assert_eq!(output(f.coordinator), "Assistant: tail\n");
    }

    #[tokio::test]
    async fn test_message_while_responding_cancels_then_sends() {
        let mut f = fixture();
        assert!(f.state.try_set_responding());

        let flow = f
            .coordinator
            .on_user_message(UserMessage::from_line("stop").unwrap())
            .await;
        assert!(matches!(flow, Flow::Continue));

        assert_eq!(
            *f.transport.sent.lock(),
            vec![
                ClientEvent::cancel_response(),
                ClientEvent::user_message("stop"),
                ClientEvent::text_response(),
            ]
        );
        assert_eq!(f.state.get(), ResponseState::Responding);
        assert_eq!(f.state.generation(), 2);
        assert_eq!(f.state.superseded(), 1);
    }

    #[tokio::test]
    async fn test_message_while_cancelling_is_sent_anyway() {
        let mut f = fixture();
        assert!(f.state.try_set_responding());
        assert!(f.state.try_cancel());

        f.coordinator
            .on_user_message(UserMessage::from_line("next").unwrap())
            .await;

        assert_eq!(f.transport.sent.lock().len(), 2);
        assert_eq!(f.state.get(), ResponseState::Responding);
        assert!(output(f.coordinator).contains("still cancelling"));
    }

    #[tokio::test]
    async fn test_exit_stops_and_raises_cancellation() {
        let Fixture {
            transport,
            messages,
            fragments: _fragments,
            cancel,
            coordinator,
            ..
        } = fixture();
        messages
            .send(UserMessage::from_line("exit").unwrap())
            .await
            .unwrap();

        let summary = coordinator.run().await;
        assert_eq!(summary, SessionSummary::default());
        assert!(cancel.is_cancelled());
        assert!(transport.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_closed_channels_stop_the_loop() {
        let f = fixture();
        drop(f.messages);
        drop(f.fragments);

        f.coordinator.run().await;
        assert!(f.cancel.is_cancelled());
    }
}
