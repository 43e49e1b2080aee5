//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::io::{self, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use rtchat_engine::{ChatError, ChatResult, Transport};
use rtchat_protocol::{ClientEvent, ServerEvent};
use tokio::io::{AsyncWriteExt, BufReader, DuplexStream};
use tokio::sync::mpsc;

pub const TIMEOUT: Duration = Duration::from_secs(5);

/// Transport fed by the test instead of a server.
pub struct ScriptedTransport {
    inbound: tokio::sync::Mutex<mpsc::UnboundedReceiver<ServerEvent>>,
    sent: mpsc::UnboundedSender<ClientEvent>,
    fail_sends: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

/// The test's side of a [`ScriptedTransport`].
pub struct ServerScript {
    events: Option<mpsc::UnboundedSender<ServerEvent>>,
    sent: mpsc::UnboundedReceiver<ClientEvent>,
    fail_sends: Arc<AtomicBool>,
    closed: Arc<AtomicBool>,
}

pub fn scripted() -> (ScriptedTransport, ServerScript) {
    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (sent_tx, sent_rx) = mpsc::unbounded_channel();
    let fail_sends = Arc::new(AtomicBool::new(false));
    let closed = Arc::new(AtomicBool::new(false));

    let transport = ScriptedTransport {
        inbound: tokio::sync::Mutex::new(events_rx),
        sent: sent_tx,
        fail_sends: fail_sends.clone(),
        closed: closed.clone(),
    };
    let script = ServerScript {
        events: Some(events_tx),
        sent: sent_rx,
        fail_sends,
        closed,
    };
    (transport, script)
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, event: &ClientEvent) -> ChatResult<()> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(ChatError::Send(format!("{}: broken pipe", event.kind())));
        }
        self.sent
            .send(event.clone())
            .map_err(|_| ChatError::Send("script dropped".to_string()))
    }

    async fn receive(&self) -> ChatResult<ServerEvent> {
        self.inbound.lock().await.recv().await.ok_or(ChatError::Closed)
    }

    async fn close(&self) -> ChatResult<()> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

impl ServerScript {
    /// Deliver an event to the client.
    pub fn push(&self, event: ServerEvent) {
        if let Some(events) = &self.events {
            events.send(event).expect("transport dropped");
        }
    }

    /// Make every further `receive` fail as a dropped connection.
    pub fn disconnect(&mut self) {
        self.events = None;
    }

    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Next event the client sent.
    pub async fn next_sent(&mut self) -> ClientEvent {
        tokio::time::timeout(TIMEOUT, self.sent.recv())
            .await
            .expect("timed out waiting for the client to send")
            .expect("transport dropped")
    }

    /// Expect a user message followed by a response request; returns the text.
    pub async fn expect_message(&mut self) -> String {
        let text = match self.next_sent().await {
            ClientEvent::ConversationItemCreate { item } => item.text(),
            other => panic!("expected conversation.item.create, got {:?}", other),
        };
        match self.next_sent().await {
            ClientEvent::ResponseCreate { .. } => {}
            other => panic!("expected response.create, got {:?}", other),
        }
        text
    }

    /// Events sent so far and not yet consumed.
    pub fn drain_sent(&mut self) -> Vec<ClientEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.sent.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Cloneable in-memory writer for chat output.
#[derive(Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Keyboard for a session: lines written here arrive on its input.
pub struct Keyboard(DuplexStream);

pub fn keyboard() -> (Keyboard, BufReader<DuplexStream>) {
    let (writer, reader) = tokio::io::duplex(4096);
    (Keyboard(writer), BufReader::new(reader))
}

impl Keyboard {
    pub async fn type_line(&mut self, line: &str) {
        self.0.write_all(line.as_bytes()).await.unwrap();
        self.0.write_all(b"\n").await.unwrap();
    }
}

/// Poll `condition` until it holds, failing the test after [`TIMEOUT`].
pub async fn wait_until(what: &str, condition: impl Fn() -> bool) {
    let poll = async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    };
    if tokio::time::timeout(TIMEOUT, poll).await.is_err() {
        panic!("timed out waiting for {what}");
    }
}

/// Await `future`, failing the test after [`TIMEOUT`].
pub async fn within<F: Future>(what: &str, future: F) -> F::Output {
    match tokio::time::timeout(TIMEOUT, future).await {
        Ok(output) => output,
        Err(_) => panic!("timed out waiting for {what}"),
    }
}
