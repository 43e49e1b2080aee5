//! WebSocket transport for realtime endpoints.
//!
//! The stream is split once at connect time. The read half and the write
//! half sit behind separate async mutexes, so the streamer's pending read
//! never blocks the coordinator's writes.

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use rtchat_protocol::{ClientEvent, ServerEvent};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Error as WsError;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{AUTHORIZATION, HeaderName, HeaderValue};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, trace, warn};

use super::Transport;
use crate::config::ChatConfig;
use crate::error::{ChatError, ChatResult};

/// Type alias for the WebSocket connection.
pub type WsConnection = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Beta header required by the realtime API.
const OPENAI_BETA: (&str, &str) = ("openai-beta", "realtime=v1");

/// A realtime connection over WebSocket.
pub struct WebSocketTransport {
    writer: Mutex<SplitSink<WsConnection, WsMessage>>,
    reader: Mutex<SplitStream<WsConnection>>,
    endpoint: String,
}

impl std::fmt::Debug for WebSocketTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketTransport")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl WebSocketTransport {
    /// Dial the configured endpoint with bearer authentication.
    pub async fn connect(config: &ChatConfig) -> ChatResult<Self> {
        let url = config.connect_url()?;
        let endpoint = url.to_string();

        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| ChatError::Config(format!("Invalid WebSocket request: {}", e)))?;

        let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key()))
            .map_err(|_| ChatError::Config("API key contains invalid characters".to_string()))?;
        let headers = request.headers_mut();
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(
            HeaderName::from_static(OPENAI_BETA.0),
            HeaderValue::from_static(OPENAI_BETA.1),
        );

        info!(endpoint = %endpoint, "Connecting to realtime endpoint");

        let (stream, response) = connect_async(request).await.map_err(|e| match e {
            WsError::Http(response) => ChatError::Connect(format!(
                "WebSocket handshake rejected (status: {})",
                response.status()
            )),
            other => ChatError::Connect(other.to_string()),
        })?;
        debug!(status = %response.status(), "WebSocket handshake complete");

        Ok(Self::from_stream(stream, endpoint))
    }

    /// Wrap an already-established connection.
    pub fn from_stream(stream: WsConnection, endpoint: impl Into<String>) -> Self {
        let (writer, reader) = stream.split();
        Self {
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&self, event: &ClientEvent) -> ChatResult<()> {
        let text = event.to_json()?;
        trace!(kind = event.kind(), "Sending event");

        let mut writer = self.writer.lock().await;
        writer
            .send(WsMessage::Text(text))
            .await
            .map_err(|e| ChatError::Send(format!("{}: {}", event.kind(), e)))
    }

    async fn receive(&self) -> ChatResult<ServerEvent> {
        loop {
            let frame = {
                let mut reader = self.reader.lock().await;
                reader.next().await
            };

            match frame {
                Some(Ok(WsMessage::Text(text))) => match ServerEvent::from_json(&text) {
                    Ok(event) => return Ok(event),
                    Err(e) => {
                        warn!(error = %e, "Skipping undecodable server message");
                    }
                },
                Some(Ok(WsMessage::Close(frame))) => {
                    info!(?frame, "WebSocket closed by server");
                    return Err(ChatError::Closed);
                }
                Some(Ok(WsMessage::Binary(data))) => {
                    debug!(len = data.len(), "Ignoring binary frame");
                }
                // tungstenite answers pings itself.
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
                None => return Err(ChatError::Closed),
            }
        }
    }

    async fn close(&self) -> ChatResult<()> {
        let mut writer = self.writer.lock().await;
        match writer.close().await {
            Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
