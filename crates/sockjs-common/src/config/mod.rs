//! Configuration loading

mod app_config;

pub use app_config::{AppConfig, ConfigError, ServerConfig, SockJsConfig};
