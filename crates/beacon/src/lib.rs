//! # Beacon
//!
//! Real-time presence and notification relay over WebSocket.
//!
//! Beacon keeps track of which identities are online, absorbs transient
//! disconnects behind a grace window, fans presence changes and
//! messages out to rooms and friend sets, and keeps per-identity
//! credentials fresh — while an external backend remains the system of
//! record for persisted status and the friend graph.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use beacon::RelayServerBuilder;
//!
//! # async fn run() -> Result<(), beacon::RelayError> {
//! let server = RelayServerBuilder::new()
//!     .bind("0.0.0.0:9200")
//!     .build_http()
//!     .await?;
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::RelayConfig;
pub use error::RelayError;
pub use server::{RelayServer, RelayServerBuilder};

// Re-export the surface most deployments touch so `beacon` alone is
// enough to embed a relay.
pub use beacon_backend::{Backend, BackendError, Credential, HttpBackend};
pub use beacon_presence::{PresenceConfig, PresenceState, StatsSnapshot};
pub use beacon_protocol::{ClientEvent, Identity, RoomName, ServerEvent};

/// Installs a `tracing` subscriber reading the `RUST_LOG` environment
/// variable. Call once at startup; embedding applications with their
/// own subscriber skip this.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
}
