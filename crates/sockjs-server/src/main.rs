//! SockJS echo server entry point
//!
//! Run with:
//! ```bash
//! cargo run -p sockjs-server
//! ```
//!
//! Serves the standard echo application the SockJS protocol test suite
//! drives. Configuration is loaded from environment variables.

use sockjs_common::{try_init_tracing, AppConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(e) = try_init_tracing() {
        eprintln!("Warning: Failed to initialize tracing: {e}");
    }

    if let Err(e) = run().await {
        error!(error = %e, "Server failed to start");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env().map_err(|e| {
        error!(error = %e, "Failed to load configuration");
        e
    })?;

    info!(
        base_url = %config.sockjs.base_url,
        addr = %config.server.address(),
        "Starting SockJS echo server"
    );

    let echo = sockjs_server::handler(|mut conn| async move {
        let mut buf = vec![0u8; 4096];
        loop {
            match conn.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => match conn.write(&buf[..n]).await {
                    Ok(written) if written > 0 => {}
                    _ => break,
                },
            }
        }
    });

    sockjs_server::run(config, echo).await?;
    Ok(())
}
