//! Presence coordination for Beacon.
//!
//! This crate is the relay's core: it owns the mapping between
//! identities and their live connections, the session state machine
//! that separates a transient network blip from a real logout, the
//! credential refresh scheduler, and the fan-out of presence and friend
//! events.
//!
//! 1. **Connection registry** — identity ↔ live connections
//!    ([`ConnectionRegistry`])
//! 2. **Session state machine** — online / grace-pending, with
//!    cancellable timers ([`Session`], [`PresenceState`])
//! 3. **Credential vault** — per-identity credential storage and
//!    proactive refresh before expiry ([`CredentialVault`])
//! 4. **Coordinator** — drives transitions, talks to the backend,
//!    fans events out to friends ([`PresenceCoordinator`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Event router (above)   ← dispatches login / disconnect / friend sends
//!     ↕
//! Presence (this crate)  ← session lifecycle, timers, friend fan-out
//!     ↕
//! Backend collaborator   ← persisted status, friend graph, reissue
//! ```

mod config;
mod coordinator;
mod credentials;
mod registry;
mod session;
mod stats;

pub use config::PresenceConfig;
pub use coordinator::PresenceCoordinator;
pub use credentials::CredentialVault;
pub use registry::{ConnectionRegistry, EventSender};
pub use session::{PresenceState, Session};
pub use stats::{BackendStats, StatsSnapshot};
