//! # sockjs-proto
//!
//! Wire-level pieces of the SockJS 0.3 protocol: the five server frames,
//! the extended escape pass applied to message payloads, and the parser
//! for client-origin payloads.

mod close_codes;
mod escape;
mod frame;
mod payload;

pub use close_codes::CloseReason;
pub use escape::escape_message;
pub use frame::Frame;
pub use payload::{parse_payload, ProtoError};
