//! ChatServer listener
//!
//! Owns the TCP listener and the shared registry. Accepts connections in a
//! loop and runs one session task per connection.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::AppError;
use crate::registry::Registry;
use crate::session::handle_connection;

/// The chat server
///
/// Constructed once at startup; the registry is created with it and shared
/// by every session it spawns.
pub struct ChatServer {
    listener: TcpListener,
    registry: Arc<Registry>,
    config: Config,
}

impl ChatServer {
    /// Bind the listener with an empty in-memory registry
    pub async fn bind(config: Config) -> Result<Self, AppError> {
        Self::bind_with_registry(config, Arc::new(Registry::new())).await
    }

    /// Bind the listener around an existing registry
    pub async fn bind_with_registry(
        config: Config,
        registry: Arc<Registry>,
    ) -> Result<Self, AppError> {
        let listener = TcpListener::bind(&config.addr).await?;
        info!("Chat server listening on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            registry,
            config,
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr, AppError> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle to the shared registry
    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    /// Accept connections until the listener fails
    pub async fn run(self) -> Result<(), AppError> {
        self.run_until(std::future::pending()).await
    }

    /// Accept connections until `shutdown` resolves or the listener fails
    ///
    /// Either way every live session is told to stop and awaited before
    /// returning.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), AppError>
    where
        F: Future<Output = ()>,
    {
        let (stop_tx, stop_rx) = watch::channel(false);
        let mut sessions = JoinSet::new();
        tokio::pin!(shutdown);

        let result = loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    break Ok(());
                }
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        info!("New connection from {}", addr);
                        let registry = Arc::clone(&self.registry);
                        let sink_capacity = self.config.sink_capacity;
                        let shutdown = stop_rx.clone();

                        // Spawn session task for each connection
                        sessions.spawn(async move {
                            if let Err(e) =
                                handle_connection(stream, registry, sink_capacity, shutdown).await
                            {
                                warn!("Session for {} ended with error: {}", addr, e);
                            }
                        });
                    }
                    Err(e) => {
                        error!("Failed to accept connection: {}", e);
                        break Err(AppError::Accept(e));
                    }
                },
                Some(finished) = sessions.join_next(), if !sessions.is_empty() => {
                    if let Err(e) = finished {
                        error!("Session task failed: {}", e);
                    }
                }
            }
        };

        let _ = stop_tx.send(true);
        debug!("Waiting for {} sessions to close", sessions.len());
        while sessions.join_next().await.is_some() {}
        info!("Chat server stopped");

        result
    }
}
