//! Receivers
//!
//! A receiver is the live HTTP response (or WebSocket sink) currently
//! holding a session's server-to-client direction. Frames written through
//! it are wrapped for the carrier and counted against the carrier's byte
//! cap; crossing the cap marks the receiver as a volunteer close so the
//! client reconnects without tearing the session down.

use super::framing::FrameWrap;
use bytes::Bytes;
use std::convert::Infallible;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

/// Channel feeding a streaming response body (or a WebSocket forwarder).
pub type BodySender = mpsc::Sender<Result<Bytes, Infallible>>;

/// Receiver write errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ReceiverError {
    #[error("receiver closed")]
    Closed,
}

/// One live downstream response
pub struct Receiver {
    tx: BodySender,
    wrap: FrameWrap,
    max_bytes: usize,
    written: AtomicUsize,
    volunteer: AtomicBool,
    done: watch::Sender<bool>,
}

impl Receiver {
    pub fn new(tx: BodySender, wrap: FrameWrap, max_bytes: usize) -> Arc<Self> {
        let (done, _) = watch::channel(false);
        Arc::new(Self {
            tx,
            wrap,
            max_bytes,
            written: AtomicUsize::new(0),
            volunteer: AtomicBool::new(false),
            done,
        })
    }

    /// Wrap one encoded frame and write it through the response.
    ///
    /// Counts the wrapped bytes; crossing `max_bytes` closes the receiver
    /// as a volunteer.
    pub async fn send_frame(&self, frame: &[u8]) -> Result<(), ReceiverError> {
        if self.is_closed() {
            return Err(ReceiverError::Closed);
        }
        let chunk = self.wrap.encode(frame);
        let len = chunk.len();

        let mut done = self.done.subscribe();
        tokio::select! {
            sent = self.tx.send(Ok(Bytes::from(chunk))) => {
                if sent.is_err() {
                    self.close();
                    return Err(ReceiverError::Closed);
                }
            }
            _ = done.wait_for(|closed| *closed) => return Err(ReceiverError::Closed),
        }

        let total = self.written.fetch_add(len, Ordering::AcqRel) + len;
        if total >= self.max_bytes {
            self.volunteer.store(true, Ordering::Release);
            self.close();
        }
        Ok(())
    }

    /// Total wrapped bytes written so far
    pub fn bytes_written(&self) -> usize {
        self.written.load(Ordering::Acquire)
    }

    /// Mark the receiver closed; the body stream ends once the last sender
    /// handle drops.
    pub fn close(&self) {
        self.done.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.done.borrow()
    }

    /// Whether the receiver closed itself after exceeding the byte cap
    pub fn volunteered(&self) -> bool {
        self.volunteer.load(Ordering::Acquire)
    }

    /// Wait until the receiver is closed
    pub async fn wait_closed(&self) {
        let mut done = self.done.subscribe();
        let _ = done.wait_for(|closed| *closed).await;
    }
}

impl std::fmt::Debug for Receiver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Receiver")
            .field("max_bytes", &self.max_bytes)
            .field("written", &self.written.load(Ordering::Relaxed))
            .field("closed", &self.is_closed())
            .finish()
    }
}
