//! Service controller and accept loop
//!
//! Owns the listening socket, the shared cancellation token, and the
//! handles of both background loops. Startup launches the accept loop and
//! the broadcast loop as independent tasks; shutdown cancels them, waits
//! for them to quiesce, and closes every registered connection.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::registry::ClientRegistry;
use crate::server::broadcast;
use crate::server::config::ServerConfig;
use crate::server::ws::{self, WsClient};
use crate::snapshot::SessionProvider;

/// The broadcast service
///
/// Generic over the snapshot provider; the transport is always WebSocket
/// over TCP.
pub struct MediaServer<P: SessionProvider> {
    config: ServerConfig,
    provider: Arc<P>,
    registry: Arc<ClientRegistry<WsClient>>,
    cancel: CancellationToken,
    local_addr: Option<SocketAddr>,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl<P: SessionProvider> MediaServer<P> {
    /// Create a server that broadcasts snapshots from `provider`
    pub fn new(config: ServerConfig, provider: P) -> Self {
        Self {
            config,
            provider: Arc::new(provider),
            registry: Arc::new(ClientRegistry::new()),
            cancel: CancellationToken::new(),
            local_addr: None,
            tasks: Vec::new(),
        }
    }

    /// Address the server is listening on, once started
    ///
    /// Useful when binding to port 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Number of currently registered subscribers (observability only)
    pub async fn client_count(&self) -> usize {
        self.registry.count().await
    }

    /// Bind the listening socket and launch both loops
    ///
    /// A bind failure is fatal: the service does not start a broadcast loop
    /// nobody can subscribe to.
    pub async fn start(&mut self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_addr)
            .await
            .map_err(|source| Error::Bind {
                addr: self.config.bind_addr,
                source,
            })?;
        let local_addr = listener.local_addr()?;
        self.local_addr = Some(local_addr);

        tracing::info!(addr = %local_addr, path = %self.config.ws_path, "WebSocket server listening");

        let accept = tokio::spawn(accept_loop(
            listener,
            Arc::clone(&self.registry),
            self.config.clone(),
            self.cancel.clone(),
        ));
        let broadcast = tokio::spawn(broadcast::run(
            Arc::clone(&self.provider),
            Arc::clone(&self.registry),
            self.config.broadcast_interval,
            self.cancel.clone(),
        ));

        self.tasks.push(("accept", accept));
        self.tasks.push(("broadcast", broadcast));
        Ok(())
    }

    /// Stop the service: cancel both loops, wait for them, close all connections
    ///
    /// Idempotent; a second call finds nothing left to do.
    pub async fn stop(&mut self) {
        self.cancel.cancel();

        for (name, mut handle) in self.tasks.drain(..) {
            match tokio::time::timeout(self.config.shutdown_timeout, &mut handle).await {
                Ok(Ok(())) => tracing::debug!(task = name, "Task stopped"),
                Ok(Err(e)) => tracing::error!(task = name, error = %e, "Task failed"),
                Err(_) => {
                    tracing::warn!(task = name, "Task did not stop in time, aborting");
                    handle.abort();
                }
            }
        }

        self.registry.clear().await;
        tracing::info!("Server stopped");
    }
}

/// Accept inbound connections until cancelled
///
/// Each accepted socket runs the upgrade handshake; a successful upgrade is
/// admitted into the registry, anything else is rejected with HTTP 400.
/// Transport errors are logged and the loop continues.
async fn accept_loop(
    listener: TcpListener,
    registry: Arc<ClientRegistry<WsClient>>,
    config: ServerConfig,
    cancel: CancellationToken,
) {
    tracing::info!("Accept loop started");

    loop {
        let accepted = tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((stream, peer_addr)) => {
                if config.tcp_nodelay {
                    // Best-effort; some platforms refuse this on accepted sockets
                    let _ = stream.set_nodelay(true);
                }

                match ws::upgrade(stream, &config.ws_path).await {
                    Ok(client) => {
                        registry.add(client).await;
                        let total = registry.count().await;
                        tracing::info!(peer = %peer_addr, total, "Subscriber connected");
                    }
                    Err(e) => {
                        tracing::warn!(peer = %peer_addr, error = %e, "Rejected connection");
                    }
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to accept connection");
            }
        }
    }

    tracing::info!("Accept loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::IdleProvider;

    fn require_send<T: Send>(_: &T) {}

    // Both loops are handed to tokio::spawn; their futures must stay Send.
    #[tokio::test]
    async fn test_accept_loop_future_is_send() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let registry = Arc::new(ClientRegistry::new());
        let fut = accept_loop(
            listener,
            registry,
            ServerConfig::default(),
            CancellationToken::new(),
        );
        require_send(&fut);
    }

    #[tokio::test]
    async fn test_start_and_stop_round_trip() {
        let config = ServerConfig::with_addr("127.0.0.1:0".parse().unwrap());
        let mut server = MediaServer::new(config, IdleProvider);

        server.start().await.unwrap();
        assert!(server.local_addr().is_some());
        assert_eq!(server.client_count().await, 0);

        server.stop().await;
        assert_eq!(server.client_count().await, 0);
    }
}
