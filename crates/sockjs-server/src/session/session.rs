//! Session state machine
//!
//! The session owns the inbound queue (client to application), the outbound
//! queue (application to whichever receiver shows up), the reference to the
//! attached transport, the closed flag, and the single armed timer that is
//! either a heartbeat (receiver attached) or a disconnect grace (receiver
//! gone). Three separate locks keep reads, writes, and lifecycle changes
//! from blocking each other.

use super::registry::SessionRegistry;
use crate::transport::{CarrierKind, Receiver, Transport};
use sockjs_proto::{CloseReason, Frame};
use std::sync::{Arc, Mutex as StdMutex, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;

/// Inbound queue capacity; overflow is an error to the sender.
const INBOUND_CAPACITY: usize = 1024;

/// Session-level errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Message queue full")]
    QueueFull,
}

/// What a carrier request gets back when it tries to become the receiver
#[derive(Debug)]
pub enum AttachOutcome {
    /// Session already closed; tell the client `c[3000,...]`
    Closed,
    /// Session is bound to a different carrier kind; `c[1001,...]`
    WrongKind,
    /// Another receiver is attached; `c[2010,...]`
    Occupied,
    /// Attached to a brand-new transport; the open frame has been written
    /// and the caller must start the application handler
    AttachedFresh(Arc<Transport>),
    /// Attached to the existing transport; queued output has been flushed
    Attached(Arc<Transport>),
}

struct ReadHalf {
    rx: mpsc::Receiver<String>,
    unread: Vec<u8>,
}

struct SessionState {
    transport: Option<Arc<Transport>>,
}

/// One in-memory session
pub struct Session {
    id: String,
    heartbeat_delay: Duration,
    disconnect_delay: Duration,
    registry: Weak<SessionRegistry>,

    // Reading, client -> application
    inbound_tx: StdMutex<Option<mpsc::Sender<String>>>,
    read_half: Mutex<ReadHalf>,

    // Writing, application -> receiver
    outbox: Mutex<Vec<String>>,

    // Lifecycle
    state: Mutex<SessionState>,
    closed: watch::Sender<bool>,
    timer: StdMutex<Option<JoinHandle<()>>>,
}

impl Session {
    /// Create a session and arm its disconnect timer.
    ///
    /// `registry` may be empty (framed WebSocket sessions are not
    /// registered); eviction then has nothing to do.
    pub fn new(
        id: impl Into<String>,
        registry: Weak<SessionRegistry>,
        heartbeat_delay: Duration,
        disconnect_delay: Duration,
    ) -> Arc<Self> {
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_CAPACITY);
        let (closed, _) = watch::channel(false);
        let session = Arc::new(Self {
            id: id.into(),
            heartbeat_delay,
            disconnect_delay,
            registry,
            inbound_tx: StdMutex::new(Some(inbound_tx)),
            read_half: Mutex::new(ReadHalf {
                rx: inbound_rx,
                unread: Vec::new(),
            }),
            outbox: Mutex::new(Vec::new()),
            state: Mutex::new(SessionState { transport: None }),
            closed,
            timer: StdMutex::new(None),
        });
        session.arm_disconnect();
        session
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Wait until the session is closed
    pub async fn wait_closed(&self) {
        let mut closed = self.closed.subscribe();
        let _ = closed.wait_for(|closed| *closed).await;
    }

    // === Reading (client -> application) ===

    /// Enqueue decoded client messages in arrival order.
    ///
    /// Fails once the bounded queue is full; messages enqueued before the
    /// overflow stay enqueued. Payloads racing a close are dropped.
    pub fn push_inbound(
        &self,
        msgs: impl IntoIterator<Item = String>,
    ) -> Result<(), SessionError> {
        let tx = match &*self.inbound_tx.lock().unwrap_or_else(|e| e.into_inner()) {
            Some(tx) => tx.clone(),
            None => return Ok(()),
        };
        for msg in msgs {
            match tx.try_send(msg) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => return Err(SessionError::QueueFull),
                Err(mpsc::error::TrySendError::Closed(_)) => return Ok(()),
            }
        }
        Ok(())
    }

    /// Copy the next inbound message (or the tail of a partially read one)
    /// into `buf`.
    ///
    /// Returns `Ok(0)` once the session is closed and the queue is drained.
    pub async fn read(&self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut half = self.read_half.lock().await;

        // Finish a partially read message before touching the queue.
        if !half.unread.is_empty() {
            let n = buf.len().min(half.unread.len());
            buf[..n].copy_from_slice(&half.unread[..n]);
            half.unread.drain(..n);
            return Ok(n);
        }

        let Some(msg) = half.rx.recv().await else {
            return Ok(0);
        };
        let bytes = msg.as_bytes();
        let n = buf.len().min(bytes.len());
        buf[..n].copy_from_slice(&bytes[..n]);
        if bytes.len() > n {
            half.unread.extend_from_slice(&bytes[n..]);
        }
        Ok(n)
    }

    // === Writing (application -> receiver) ===

    /// Enqueue one message and try to flush it through the attached
    /// receiver.
    ///
    /// Returns `Ok(0)` if the session is closed; the payload is dropped.
    pub async fn write(&self, data: &[u8]) -> std::io::Result<usize> {
        if self.is_closed() {
            return Ok(0);
        }
        let msg = String::from_utf8_lossy(data).into_owned();
        self.outbox.lock().await.push(msg);
        self.try_flush().await;
        Ok(data.len())
    }

    /// Flush the outbox as one message frame, if a receiver is attached.
    pub async fn try_flush(&self) {
        let transport = self.current_transport().await;
        if let Some(transport) = transport {
            self.flush_through(&transport).await;
        }
    }

    async fn flush_through(&self, transport: &Transport) {
        let mut outbox = self.outbox.lock().await;
        if outbox.is_empty() {
            return;
        }
        let frame = Frame::message(outbox.iter().cloned()).encode();
        if transport.send_frame(&frame).await.is_ok() {
            outbox.clear();
        }
    }

    async fn current_transport(&self) -> Option<Arc<Transport>> {
        self.state.lock().await.transport.clone()
    }

    // === Lifecycle ===

    /// Close the session: tell the receiver to go away, end its response,
    /// cancel timers, wake blocked readers, and drop out of the registry.
    ///
    /// Idempotent.
    pub async fn close(self: &Arc<Self>) {
        let st = self.state.lock().await;
        if self.is_closed() {
            return;
        }
        self.closed.send_replace(true);

        if let Some(transport) = st.transport.clone() {
            let frame = Frame::close(CloseReason::GoAway).encode();
            if transport.send_frame(&frame).await.is_err() {
                tracing::trace!(session_id = %self.id, "Close frame had no receiver");
            }
            transport.close_transport().await;
        }
        drop(st);

        self.cancel_timer();
        // Readers drain what is queued, then see end-of-stream.
        self.inbound_tx.lock().unwrap_or_else(|e| e.into_inner()).take();

        if let Some(registry) = self.registry.upgrade() {
            registry.remove(&self.id, self);
        }

        tracing::debug!(session_id = %self.id, "Session closed");
    }

    /// Run the attach decision for an arriving carrier request.
    ///
    /// Holds the session lock across the whole decision so closes and
    /// competing attaches serialize.
    pub async fn attach_receiver(
        self: &Arc<Self>,
        kind: CarrierKind,
        receiver: Arc<Receiver>,
    ) -> AttachOutcome {
        let mut st = self.state.lock().await;
        if self.is_closed() {
            return AttachOutcome::Closed;
        }
        match st.transport.clone() {
            Some(transport) if transport.kind() != kind => AttachOutcome::WrongKind,
            Some(transport) => {
                if transport.try_attach(receiver).await.is_err() {
                    return AttachOutcome::Occupied;
                }
                self.receiver_attached(&transport).await;
                drop(st);
                AttachOutcome::Attached(transport)
            }
            None => {
                let transport = Transport::new(kind);
                st.transport = Some(transport.clone());
                // Fresh transport: the slot cannot be occupied.
                let _ = transport.try_attach(receiver).await;
                if transport.send_frame(&Frame::Open.encode()).await.is_err() {
                    tracing::debug!(session_id = %self.id, "Receiver gone before open frame");
                }
                self.receiver_attached(&transport).await;
                drop(st);
                AttachOutcome::AttachedFresh(transport)
            }
        }
    }

    /// A receiver took the downstream: flush anything queued while detached
    /// and switch the timer over to heartbeats.
    async fn receiver_attached(self: &Arc<Self>, transport: &Arc<Transport>) {
        self.flush_through(transport).await;
        self.arm_heartbeat(transport.clone());
        tracing::trace!(session_id = %self.id, carrier = %transport.kind(), "Receiver attached");
    }

    /// The receiver is gone: give the client the disconnect grace to come
    /// back with another request.
    pub fn receiver_detached(self: &Arc<Self>) {
        if self.is_closed() {
            return;
        }
        self.arm_disconnect();
        tracing::trace!(session_id = %self.id, "Receiver detached");
    }

    // === Timers ===
    //
    // At most one timer is armed: replacing aborts the previous task.

    fn set_timer(&self, handle: Option<JoinHandle<()>>) {
        let mut timer = self.timer.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(old) = timer.take() {
            old.abort();
        }
        *timer = handle;
    }

    fn cancel_timer(&self) {
        self.set_timer(None);
    }

    fn arm_heartbeat(self: &Arc<Self>, transport: Arc<Transport>) {
        let session = self.clone();
        let delay = self.heartbeat_delay;
        self.set_timer(Some(tokio::spawn(async move {
            loop {
                tokio::time::sleep(delay).await;
                if session.is_closed() {
                    break;
                }
                if let Err(e) = transport.send_frame(&Frame::Heartbeat.encode()).await {
                    tracing::trace!(session_id = %session.id, error = %e, "Heartbeat not delivered");
                }
            }
        })));
    }

    fn arm_disconnect(self: &Arc<Self>) {
        let session = self.clone();
        let delay = self.disconnect_delay;
        self.set_timer(Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if session.is_closed() {
                return;
            }
            tracing::debug!(session_id = %session.id, "Disconnect grace expired");
            if let Some(registry) = session.registry.upgrade() {
                registry.remove(&session.id, &session);
            }
            session.close().await;
        })));
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if let Ok(mut timer) = self.timer.lock() {
            if let Some(handle) = timer.take() {
                handle.abort();
            }
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}
