//! One-shot mode: send a single message and stream the answer.
//!
//! No coordinator and no input reader are involved. The caller's task
//! reads the transport directly until the response ends.

use std::io::Write;

use rtchat_protocol::ClientEvent;
use tracing::{debug, info};

use crate::error::{ChatError, ChatResult};
use crate::messages::ResponseFragment;
use crate::state::{ConversationState, ResponseState};
use crate::streamer::translate_event;
use crate::transport::Transport;

/// Result of a one-shot exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AskOutcome {
    /// Full text of the answer as streamed.
    pub text: String,
    /// State the conversation settled in.
    pub state: ResponseState,
}

/// Send `question`, write the answer to `out` as it streams, and return it.
///
/// A server error event ends the exchange with [`ChatError::Server`].
pub async fn ask<T, W>(
    transport: &T,
    state: &ConversationState,
    question: &str,
    out: &mut W,
) -> ChatResult<AskOutcome>
where
    T: Transport + ?Sized,
    W: Write,
{
    if !state.try_set_responding() {
        return Err(ChatError::StateConflict {
            action: "start a response",
            state: state.get(),
        });
    }
    let generation = state.generation();
    info!(generation, "Sending one-shot message");

    let sent = match transport.send(&ClientEvent::user_message(question)).await {
        Ok(()) => transport.send(&ClientEvent::text_response()).await,
        Err(e) => Err(e),
    };
    if let Err(e) = sent {
        state.abandon(generation);
        return Err(e);
    }

    let mut text = String::new();
    loop {
        let event = match transport.receive().await {
            Ok(event) => event,
            Err(e) => {
                state.reset();
                return Err(e);
            }
        };

        match translate_event(state, event) {
            Some(ResponseFragment::Text { text: delta, .. }) => {
                out.write_all(delta.as_bytes())?;
                out.flush()?;
                text.push_str(&delta);
            }
            Some(ResponseFragment::Done) => break,
            Some(ResponseFragment::Error { message }) => return Err(ChatError::Server(message)),
            None => {}
        }
    }

    writeln!(out)?;
    out.flush()?;
    debug!(chars = text.chars().count(), state = %state.get(), "One-shot response finished");
    Ok(AskOutcome {
        text,
        state: state.get(),
    })
}
