//! The connection registry: identity ↔ live connections.
//!
//! Pure bookkeeping — no timers, no backend calls, no notification
//! decisions. The [`PresenceCoordinator`](crate::PresenceCoordinator)
//! makes every policy decision and calls down into this map.
//!
//! # Concurrency note
//!
//! Plain `HashMap`s, not thread-safe by itself: the registry lives
//! inside the coordinator's mutex and is never touched from elsewhere.

use std::collections::{HashMap, HashSet};

use beacon_protocol::{Identity, ServerEvent};
use beacon_transport::ConnectionId;
use tokio::sync::mpsc;

/// Channel sender for pushing outbound events to one connection.
///
/// The connection's handler task owns the receiving end and writes
/// events to the wire. Unbounded so fan-out never blocks on a slow
/// consumer; a dead receiver just makes `send` fail, which fan-out
/// treats as "not reachable".
pub type EventSender = mpsc::UnboundedSender<ServerEvent>;

/// One registered connection: who it belongs to and how to reach it.
struct Link {
    identity: Identity,
    sender: EventSender,
}

/// Bidirectional mapping between identities and live connections.
#[derive(Default)]
pub struct ConnectionRegistry {
    /// Reverse index: connection → owning identity + outbound channel.
    links: HashMap<ConnectionId, Link>,

    /// Forward index: identity → its current devices. Kept in sync with
    /// `links`; an identity with an empty set is removed entirely.
    by_identity: HashMap<Identity, HashSet<ConnectionId>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Associates `conn` with `identity`.
    ///
    /// A connection that re-logs-in under a different identity is moved:
    /// the old association is dropped first so the two indexes stay
    /// consistent. The identity the connection was detached from is
    /// returned — the caller must run the same last-connection
    /// bookkeeping a disconnect would.
    pub fn add(
        &mut self,
        identity: Identity,
        conn: ConnectionId,
        sender: EventSender,
    ) -> Option<Identity> {
        let displaced = match self.links.get(&conn) {
            Some(previous) if previous.identity != identity => {
                let previous = previous.identity.clone();
                self.detach(conn);
                Some(previous)
            }
            _ => None,
        };
        self.by_identity
            .entry(identity.clone())
            .or_default()
            .insert(conn);
        self.links.insert(conn, Link { identity, sender });
        displaced
    }

    /// Removes `conn` and returns the identity it belonged to.
    ///
    /// Returns `None` for a connection that was never registered or was
    /// already removed — duplicate disconnect events must be tolerated
    /// without error.
    pub fn remove(&mut self, conn: ConnectionId) -> Option<Identity> {
        let identity = self.links.get(&conn).map(|l| l.identity.clone())?;
        self.detach(conn);
        Some(identity)
    }

    fn detach(&mut self, conn: ConnectionId) {
        let Some(link) = self.links.remove(&conn) else {
            return;
        };
        if let Some(set) = self.by_identity.get_mut(&link.identity) {
            set.remove(&conn);
            if set.is_empty() {
                self.by_identity.remove(&link.identity);
            }
        }
    }

    /// Number of live connections for an identity.
    pub fn connection_count(&self, identity: &Identity) -> usize {
        self.by_identity.get(identity).map_or(0, HashSet::len)
    }

    /// Snapshot of the outbound senders for every live connection of an
    /// identity. Empty if the identity has none.
    pub fn senders_of(&self, identity: &Identity) -> Vec<EventSender> {
        let Some(conns) = self.by_identity.get(identity) else {
            return Vec::new();
        };
        conns
            .iter()
            .filter_map(|conn| self.links.get(conn))
            .map(|link| link.sender.clone())
            .collect()
    }
}

// =========================================================================
// Tests
// =========================================================================
