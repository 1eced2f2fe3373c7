//! Application configuration structs
//!
//! Loads configuration from environment variables.

use serde::Deserialize;
use std::env;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub sockjs: SockJsConfig,
}

/// Listening address configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl ServerConfig {
    #[must_use]
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Protocol-level knobs, one set per installed router
#[derive(Debug, Clone, Deserialize)]
pub struct SockJsConfig {
    /// Absolute path the router is mounted under
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Advertise and accept WebSocket carriers
    #[serde(default = "default_true")]
    pub websocket_enabled: bool,
    /// Tell clients the load balancer needs a JSESSIONID cookie
    #[serde(default)]
    pub cookie_needed: bool,
    /// Grace period before an unattended session is destroyed, in milliseconds
    #[serde(default = "default_disconnect_delay_ms")]
    pub disconnect_delay_ms: u64,
    /// Idle interval before a heartbeat frame is sent, in milliseconds
    #[serde(default = "default_heartbeat_delay_ms")]
    pub heartbeat_delay_ms: u64,
    /// SockJS client script embedded in the iframe page
    #[serde(default = "default_sockjs_url")]
    pub sockjs_url: String,
}

impl SockJsConfig {
    #[must_use]
    pub fn disconnect_delay(&self) -> Duration {
        Duration::from_millis(self.disconnect_delay_ms)
    }

    #[must_use]
    pub fn heartbeat_delay(&self) -> Duration {
        Duration::from_millis(self.heartbeat_delay_ms)
    }
}

impl Default for SockJsConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            websocket_enabled: true,
            cookie_needed: false,
            disconnect_delay_ms: default_disconnect_delay_ms(),
            heartbeat_delay_ms: default_heartbeat_delay_ms(),
            sockjs_url: default_sockjs_url(),
        }
    }
}

// Default value functions
fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8081
}

fn default_base_url() -> String {
    "/echo".to_string()
}

fn default_true() -> bool {
    true
}

fn default_disconnect_delay_ms() -> u64 {
    5_000
}

fn default_heartbeat_delay_ms() -> u64 {
    25_000
}

fn default_sockjs_url() -> String {
    "http://cdn.sockjs.org/sockjs-0.3.min.js".to_string()
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// # Errors
    /// Returns an error if a variable is present but unparsable.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            server: ServerConfig {
                host: env::var("SOCKJS_HOST").unwrap_or_else(|_| default_host()),
                port: parse_var("SOCKJS_PORT")?.unwrap_or_else(default_port),
            },
            sockjs: SockJsConfig {
                base_url: env::var("SOCKJS_BASE_URL").unwrap_or_else(|_| default_base_url()),
                websocket_enabled: parse_var("SOCKJS_WEBSOCKET_ENABLED")?.unwrap_or(true),
                cookie_needed: parse_var("SOCKJS_COOKIE_NEEDED")?.unwrap_or(false),
                disconnect_delay_ms: parse_var("SOCKJS_DISCONNECT_DELAY_MS")?
                    .unwrap_or_else(default_disconnect_delay_ms),
                heartbeat_delay_ms: parse_var("SOCKJS_HEARTBEAT_DELAY_MS")?
                    .unwrap_or_else(default_heartbeat_delay_ms),
                sockjs_url: env::var("SOCKJS_CLIENT_URL").unwrap_or_else(|_| default_sockjs_url()),
            },
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue(name, raw)),
        Err(_) => Ok(None),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
}
