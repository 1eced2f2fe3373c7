//! # sockjs-server
//!
//! A SockJS 0.3 server: WebSocket-like bidirectional sessions emulated over
//! plain HTTP carriers (XHR polling/streaming, EventSource, HTMLFile,
//! JSONP) with a WebSocket fast path.
//!
//! Application code supplies a [`Handler`]; each new session spawns it with
//! a [`Conn`] to read and write through:
//!
//! ```no_run
//! use sockjs_common::AppConfig;
//!
//! #[tokio::main]
//! async fn main() {
//!     let echo = sockjs_server::handler(|mut conn| async move {
//!         let mut buf = vec![0u8; 4096];
//!         loop {
//!             match conn.read(&mut buf).await {
//!                 Ok(0) | Err(_) => break,
//!                 Ok(n) => {
//!                     if !matches!(conn.write(&buf[..n]).await, Ok(n2) if n2 > 0) {
//!                         break;
//!                     }
//!                 }
//!             }
//!         }
//!     });
//!     let config = AppConfig::from_env().expect("config");
//!     sockjs_server::run(config, echo).await.expect("server");
//! }
//! ```

mod handlers;
pub mod server;
pub mod session;
pub mod transport;

pub use server::{create_app, create_router, run, run_server, ServerState};
pub use session::{Conn, Session, SessionRegistry};

use futures_util::future::BoxFuture;
use std::future::Future;
use std::sync::Arc;

/// The application handler, spawned as its own task per connection
pub type Handler = Arc<dyn Fn(Conn) -> BoxFuture<'static, ()> + Send + Sync>;

/// Wrap an async function as a [`Handler`]
pub fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(Conn) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |conn| Box::pin(f(conn)))
}
