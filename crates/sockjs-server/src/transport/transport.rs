//! Transport
//!
//! The glue between a session and whichever carrier is currently attached:
//! a carrier-kind tag and the single receiver slot. Attach is atomic under
//! the slot's write guard; a second arrival is refused while the guard
//! proves the slot occupied, which is what keeps the one-receiver invariant
//! honest under concurrent polls.

use super::framing::CarrierKind;
use super::receiver::{Receiver, ReceiverError};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Transport-level errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("no receiver")]
    NoReceiver,

    #[error("another connection still open")]
    Occupied,

    #[error("receiver closed")]
    Receiver(#[from] ReceiverError),
}

/// A session's attachment point for one carrier kind
pub struct Transport {
    kind: CarrierKind,
    receiver: RwLock<Option<Arc<Receiver>>>,
}

impl Transport {
    pub fn new(kind: CarrierKind) -> Arc<Self> {
        Arc::new(Self {
            kind,
            receiver: RwLock::new(None),
        })
    }

    pub fn kind(&self) -> CarrierKind {
        self.kind
    }

    /// Write one encoded frame through the attached receiver.
    ///
    /// The slot is read shared so sends never block session reads.
    pub async fn send_frame(&self, frame: &[u8]) -> Result<(), TransportError> {
        let receiver = self.receiver.read().await.clone();
        match receiver {
            Some(receiver) => {
                receiver.send_frame(frame).await?;
                Ok(())
            }
            None => Err(TransportError::NoReceiver),
        }
    }

    /// Attach `receiver` as the single active receiver.
    ///
    /// Fails with [`TransportError::Occupied`] if one is already attached;
    /// the caller is expected to tell the intruder off through its own
    /// framing.
    pub async fn try_attach(&self, receiver: Arc<Receiver>) -> Result<(), TransportError> {
        let mut slot = self.receiver.write().await;
        if slot.is_some() {
            return Err(TransportError::Occupied);
        }
        *slot = Some(receiver);
        Ok(())
    }

    /// Clear the slot if `receiver` is still the one attached.
    pub async fn detach(&self, receiver: &Arc<Receiver>) {
        let mut slot = self.receiver.write().await;
        if slot.as_ref().is_some_and(|held| Arc::ptr_eq(held, receiver)) {
            *slot = None;
        }
    }

    /// Close and drop the attached receiver, ending its response.
    pub async fn close_transport(&self) {
        let receiver = self.receiver.write().await.take();
        if let Some(receiver) = receiver {
            receiver.close();
        }
    }

    pub async fn has_receiver(&self) -> bool {
        self.receiver.read().await.is_some()
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport").field("kind", &self.kind).finish()
    }
}
