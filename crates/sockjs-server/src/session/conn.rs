//! Connection handle
//!
//! What an application handler reads and writes through. Session-backed
//! connections go through the session queues; a raw WebSocket connection
//! maps reads and writes straight onto socket messages with no SockJS
//! framing at all.

use super::session::Session;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;

/// A bidirectional SockJS connection handed to the application handler
pub struct Conn {
    inner: ConnInner,
}

enum ConnInner {
    Session(Arc<Session>),
    Raw(RawWebsocket),
}

struct RawWebsocket {
    id: String,
    sink: SplitSink<WebSocket, Message>,
    stream: SplitStream<WebSocket>,
    unread: Vec<u8>,
}

impl Conn {
    pub(crate) fn from_session(session: Arc<Session>) -> Self {
        Self {
            inner: ConnInner::Session(session),
        }
    }

    pub(crate) fn from_raw_socket(socket: WebSocket) -> Self {
        let (sink, stream) = socket.split();
        Self {
            inner: ConnInner::Raw(RawWebsocket {
                id: uuid::Uuid::new_v4().to_string(),
                sink,
                stream,
                unread: Vec::new(),
            }),
        }
    }

    /// The connection's identifier: the session id, or a generated id for
    /// raw WebSocket connections.
    pub fn id(&self) -> &str {
        match &self.inner {
            ConnInner::Session(session) => session.id(),
            ConnInner::Raw(raw) => &raw.id,
        }
    }

    /// Read the next message (or the rest of a partially read one) into
    /// `buf`. Returns `Ok(0)` at end of stream.
    pub async fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            ConnInner::Session(session) => session.read(buf).await,
            ConnInner::Raw(raw) => raw.read(buf).await,
        }
    }

    /// Write one message. Returns `Ok(0)` once the connection is closed.
    pub async fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        match &mut self.inner {
            ConnInner::Session(session) => session.write(data).await,
            ConnInner::Raw(raw) => raw.write(data).await,
        }
    }

    /// Close the connection. Idempotent.
    pub async fn close(&mut self) {
        match &mut self.inner {
            ConnInner::Session(session) => session.close().await,
            ConnInner::Raw(raw) => raw.close().await,
        }
    }
}

impl RawWebsocket {
    async fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if !self.unread.is_empty() {
            return Ok(self.copy_out(buf));
        }
        loop {
            match self.stream.next().await {
                Some(Ok(Message::Text(text))) => {
                    if text.is_empty() {
                        continue;
                    }
                    self.unread.extend_from_slice(text.as_bytes());
                    return Ok(self.copy_out(buf));
                }
                Some(Ok(Message::Binary(data))) => {
                    if data.is_empty() {
                        continue;
                    }
                    self.unread.extend_from_slice(&data);
                    return Ok(self.copy_out(buf));
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_))) => {}
                Some(Ok(Message::Close(_))) | None => return Ok(0),
                Some(Err(e)) => {
                    tracing::debug!(conn_id = %self.id, error = %e, "Raw WebSocket read failed");
                    return Ok(0);
                }
            }
        }
    }

    fn copy_out(&mut self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.unread.len());
        buf[..n].copy_from_slice(&self.unread[..n]);
        self.unread.drain(..n);
        n
    }

    async fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        let text = String::from_utf8_lossy(data).into_owned();
        match self.sink.send(Message::Text(text.into())).await {
            Ok(()) => Ok(data.len()),
            Err(_) => Ok(0),
        }
    }

    async fn close(&mut self) {
        let _ = self.sink.send(Message::Close(None)).await;
        let _ = self.sink.close().await;
    }
}

impl std::fmt::Debug for Conn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.inner {
            ConnInner::Session(_) => "session",
            ConnInner::Raw(_) => "raw-websocket",
        };
        f.debug_struct("Conn")
            .field("id", &self.id())
            .field("kind", &kind)
            .finish()
    }
}
