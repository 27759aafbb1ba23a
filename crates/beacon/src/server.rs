//! `RelayServer` builder and accept loop.
//!
//! This is the entry point for running a Beacon relay. It ties together
//! all the layers: transport → protocol → presence → rooms → backend.

use std::sync::Arc;
use std::time::Duration;

use beacon_backend::{Backend, HttpBackend};
use beacon_presence::PresenceCoordinator;
use beacon_protocol::JsonCodec;
use beacon_room::RoomRegistry;
use beacon_transport::{Transport, WebSocketTransport};
use tokio::sync::Mutex;

use crate::config::RelayConfig;
use crate::handler::handle_connection;
use crate::RelayError;

/// Shared server state passed to each connection handler task.
///
/// Wrapped in `Arc` so it can be cheaply cloned across tasks. The
/// presence coordinator carries its own locking; the room registry is
/// guarded here.
pub(crate) struct ServerState<B> {
    pub(crate) presence: PresenceCoordinator<B>,
    pub(crate) rooms: Mutex<RoomRegistry>,
    pub(crate) codec: JsonCodec,
    pub(crate) heartbeat_timeout: Duration,
}

/// Builder for configuring and starting a relay server.
///
/// # Example
///
/// ```rust,ignore
/// use beacon::{RelayConfig, RelayServer};
///
/// let server = RelayServer::builder()
///     .config(RelayConfig::from_toml_str(&text)?)
///     .build_http()
///     .await?;
/// server.run().await
/// ```
pub struct RelayServerBuilder {
    config: RelayConfig,
}

impl RelayServerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            config: RelayConfig::default(),
        }
    }

    /// Sets the address to bind the server to.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind_addr = addr.to_string();
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: RelayConfig) -> Self {
        self.config = config;
        self
    }

    /// Builds and starts the server against the given backend.
    ///
    /// Uses `JsonCodec` and `WebSocketTransport`; the backend is
    /// anything implementing [`Backend`] — the HTTP system of record in
    /// production, a mock in tests.
    pub async fn build<B: Backend>(
        self,
        backend: B,
    ) -> Result<RelayServer<B>, RelayError> {
        let transport = WebSocketTransport::bind_with_origin(
            &self.config.bind_addr,
            self.config.allowed_origin.clone(),
        )
        .await?;

        let state = Arc::new(ServerState {
            presence: PresenceCoordinator::new(backend, self.config.presence()),
            rooms: Mutex::new(RoomRegistry::new()),
            codec: JsonCodec,
            heartbeat_timeout: self.config.heartbeat_timeout(),
        });

        Ok(RelayServer { transport, state })
    }

    /// Builds and starts the server against the HTTP backend named in
    /// the configuration.
    pub async fn build_http(self) -> Result<RelayServer<HttpBackend>, RelayError> {
        let backend = HttpBackend::new(
            self.config.backend_url.clone(),
            self.config.backend_timeout(),
        )?;
        self.build(backend).await
    }
}

impl Default for RelayServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A running Beacon relay.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct RelayServer<B> {
    transport: WebSocketTransport,
    state: Arc<ServerState<B>>,
}

impl<B: Backend> RelayServer<B> {
    /// Creates a new builder.
    pub fn builder() -> RelayServerBuilder {
        RelayServerBuilder::new()
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.transport.local_addr()
    }

    /// Runs the server accept loop.
    ///
    /// Accepts incoming connections and spawns a handler task for each.
    /// Runs until the process is terminated.
    pub async fn run(mut self) -> Result<(), RelayError> {
        tracing::info!("Beacon relay running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(
                                error = %e,
                                "connection ended with error"
                            );
                        }
                    });
                }
                Err(e) => {
                    tracing::error!(error = %e, "accept failed");
                }
            }
        }
    }
}
