//! Multi-room Line Chat Server - Entry Point
//!
//! Loads configuration, binds the listener and serves until Ctrl-C.

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use room_chat::{ChatServer, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=room_chat=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("room_chat=info")),
        )
        .init();

    // Bind address from command line, then IP_ADDRESS/PORT, then default
    let config = Config::load()?;
    let server = ChatServer::bind(config).await?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;

    info!("Bye");
    Ok(())
}
