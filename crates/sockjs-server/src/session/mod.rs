//! Sessions
//!
//! A session is a named, reconnectable, bidirectional message channel. The
//! pieces: the session object itself (queues, timers, lifecycle), the
//! process-wide registry, and the connection handle application code reads
//! and writes through.

mod conn;
mod registry;
#[allow(clippy::module_inception)]
mod session;

pub use conn::Conn;
pub use registry::SessionRegistry;
pub use session::{AttachOutcome, Session, SessionError};
