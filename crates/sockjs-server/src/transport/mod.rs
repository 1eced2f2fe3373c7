//! Transports
//!
//! A transport plugs one carrier protocol into a session: it knows how to
//! wrap frames for the carrier's wire, owns the single receiver slot, and
//! enforces the per-response byte cap.

mod framing;
mod receiver;
#[allow(clippy::module_inception)]
mod transport;

pub use framing::{CarrierKind, CarrierPolicy, FrameWrap};
pub use receiver::{BodySender, Receiver, ReceiverError};
pub use transport::{Transport, TransportError};
