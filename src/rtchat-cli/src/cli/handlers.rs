//! Command dispatch and execution handlers.

use anyhow::{Context, Result, bail};
use rtchat_engine::{
    ChatConfig, ChatSession, ConversationState, SessionOptions, Transport, UserMessage,
    WebSocketTransport, ask,
};
use rtchat_protocol::ClientEvent;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::args::*;

/// Dispatch a CLI command to its handler.
///
/// `shutdown` is cancelled on Ctrl+C; every handler stops when it is.
pub async fn dispatch_command(
    command: Commands,
    config: ChatConfig,
    shutdown: CancellationToken,
) -> Result<()> {
    match command {
        Commands::Chat(args) => run_chat(args, config, shutdown).await,
        Commands::Ask(args) => run_ask(args, config, shutdown).await,
    }
}

async fn connect(config: &ChatConfig) -> Result<WebSocketTransport> {
    WebSocketTransport::connect(config)
        .await
        .with_context(|| format!("Could not connect to {}", config.websocket_url()))
}

/// Interactive chat on stdin/stdout.
async fn run_chat(args: ChatArgs, config: ChatConfig, shutdown: CancellationToken) -> Result<()> {
    let transport = tokio::select! {
        transport = connect(&config) => transport?,
        _ = shutdown.cancelled() => return Ok(()),
    };

    let mut options = SessionOptions::from_config(&config);
    options.show_banner = !args.no_banner;

    let session = ChatSession::new(transport, options).with_shutdown(shutdown);
    let input = BufReader::new(tokio::io::stdin());
    let summary = session.run(input, std::io::stdout()).await?;
    debug!(?summary, "Chat finished");
    Ok(())
}

/// One message, one answer, then exit.
async fn run_ask(args: AskArgs, config: ChatConfig, shutdown: CancellationToken) -> Result<()> {
    let message = match args.message() {
        Some(message) => message,
        None => read_message_from_stdin().await?,
    };

    let transport = tokio::select! {
        transport = connect(&config) => transport?,
        _ = shutdown.cancelled() => return Ok(()),
    };
    let state = ConversationState::new();
    let mut stdout = std::io::stdout();

    let result = tokio::select! {
        outcome = ask(&transport, &state, &message, &mut stdout) => Some(outcome),
        _ = shutdown.cancelled() => None,
    };

    if result.is_none() {
        info!("Interrupted, cancelling response");
        if let Err(e) = transport.send(&ClientEvent::cancel_response()).await {
            debug!(error = %e, "Could not send cancel");
        }
    }
    if let Err(e) = transport.close().await {
        warn!(error = %e, "Failed to close transport");
    }

    match result {
        Some(outcome) => {
            let outcome = outcome.context("Request failed")?;
            debug!(chars = outcome.text.chars().count(), state = %outcome.state, "Answer received");
            Ok(())
        }
        None => Ok(()),
    }
}

/// First non-blank line of stdin.
async fn read_message_from_stdin() -> Result<String> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if let Some(message) = UserMessage::from_line(&line) {
            return Ok(message.into_text());
        }
    }
    bail!("No message given: pass one as an argument or on stdin")
}
