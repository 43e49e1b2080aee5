//! Input reader: turns lines of user text into [`UserMessage`]s.
//!
//! Reading from a terminal is a best-effort cancellation boundary. The
//! reader stops waiting as soon as the session is cancelled, but the
//! underlying OS read of stdin cannot be interrupted and may stay parked
//! until the runtime shuts down.

use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::messages::UserMessage;

/// Why the input reader stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderExit {
    /// The input source ended.
    EndOfInput,
    /// The session was cancelled.
    Cancelled,
    /// The coordinator is gone.
    ChannelClosed,
    /// Reading the input source failed.
    ReadFailed,
}

/// Reads lines and forwards the non-blank ones.
pub struct InputReader<R> {
    lines: Lines<R>,
    messages: mpsc::Sender<UserMessage>,
    cancel: CancellationToken,
}

impl<R> InputReader<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(input: R, messages: mpsc::Sender<UserMessage>, cancel: CancellationToken) -> Self {
        Self {
            lines: input.lines(),
            messages,
            cancel,
        }
    }

    pub async fn run(mut self) -> ReaderExit {
        let exit = self.read_loop().await;
        debug!(?exit, "Input reader stopped");
        exit
    }

    async fn read_loop(&mut self) -> ReaderExit {
        loop {
            let line = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return ReaderExit::Cancelled,
                line = self.lines.next_line() => line,
            };

            let message = match line {
                Ok(Some(line)) => match UserMessage::from_line(&line) {
                    Some(message) => message,
                    None => continue,
                },
                Ok(None) => return ReaderExit::EndOfInput,
                Err(e) => {
                    warn!(error = %e, "Failed to read input");
                    return ReaderExit::ReadFailed;
                }
            };

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return ReaderExit::Cancelled,
                sent = self.messages.send(message) => {
                    if sent.is_err() {
                        return ReaderExit::ChannelClosed;
                    }
                }
            }
        }
    }
}
