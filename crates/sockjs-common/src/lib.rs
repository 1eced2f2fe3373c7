//! # sockjs-common
//!
//! Configuration, error types, and telemetry shared by the server and the
//! integration tests.

pub mod config;
pub mod error;
pub mod telemetry;

pub use config::{AppConfig, ConfigError};
pub use error::{AppError, AppResult};
pub use telemetry::{init_tracing, try_init_tracing, TracingConfig};
