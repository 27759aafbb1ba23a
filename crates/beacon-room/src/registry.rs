//! The room registry: room → members, connection → joined rooms.
//!
//! # Concurrency note
//!
//! `RoomRegistry` uses plain `HashMap`s and is not thread-safe by
//! itself. It is owned behind one mutex at the server layer; keeping it
//! simple here avoids hidden locking overhead.

use std::collections::{HashMap, HashSet};

use beacon_protocol::{RoomName, ServerEvent};
use beacon_transport::ConnectionId;
use tokio::sync::mpsc;

/// Channel sender for pushing outbound events to one connection.
///
/// The connection's handler task owns the receiving end and forwards
/// events onto the wire. Unbounded because fan-out must never block the
/// sender; a connection that stopped draining is torn down by its own
/// handler.
pub type OutboundSender = mpsc::UnboundedSender<ServerEvent>;

/// Tracks which connections are in which rooms and delivers broadcasts.
///
/// Every mutation is idempotent by design: re-joining a room, leaving a
/// room never joined, and clearing an unknown connection are all
/// no-ops. Duplicate or out-of-order membership events from a flaky
/// client must never error a connection.
#[derive(Default)]
pub struct RoomRegistry {
    /// Members of each room, with the sender needed to reach them.
    rooms: HashMap<RoomName, HashMap<ConnectionId, OutboundSender>>,

    /// Rooms each connection has joined. Kept in sync with `rooms` so
    /// a disconnect can leave everything without scanning all rooms.
    joined: HashMap<ConnectionId, HashSet<RoomName>>,
}

impl RoomRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection to a room. Re-joining is a no-op.
    pub fn join(&mut self, conn: ConnectionId, sender: OutboundSender, room: RoomName) {
        self.rooms
            .entry(room.clone())
            .or_default()
            .insert(conn, sender);
        let newly = self.joined.entry(conn).or_default().insert(room.clone());
        if newly {
            tracing::debug!(%conn, %room, "joined room");
        }
    }

    /// Removes a connection from a room. Leaving a room not joined is a
    /// no-op.
    pub fn leave(&mut self, conn: ConnectionId, room: &RoomName) {
        if let Some(members) = self.rooms.get_mut(room) {
            members.remove(&conn);
            if members.is_empty() {
                self.rooms.remove(room);
            }
        }
        if let Some(rooms) = self.joined.get_mut(&conn) {
            if rooms.remove(room) {
                tracing::debug!(%conn, %room, "left room");
            }
            if rooms.is_empty() {
                self.joined.remove(&conn);
            }
        }
    }

    /// Removes a connection from every room it joined. Called on
    /// disconnect; a connection in no rooms is a no-op.
    pub fn leave_all(&mut self, conn: ConnectionId) {
        let Some(rooms) = self.joined.remove(&conn) else {
            return;
        };
        for room in rooms {
            if let Some(members) = self.rooms.get_mut(&room) {
                members.remove(&conn);
                if members.is_empty() {
                    self.rooms.remove(&room);
                }
            }
        }
        tracing::debug!(%conn, "left all rooms");
    }

    /// Delivers an event to every member of a room.
    ///
    /// Best-effort: members whose handler already went away are
    /// skipped. Returns the number of connections reached.
    pub fn broadcast(&self, room: &RoomName, event: ServerEvent) -> usize {
        let Some(members) = self.rooms.get(room) else {
            return 0;
        };
        let mut delivered = 0;
        for sender in members.values() {
            if sender.send(event.clone()).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }

    /// Number of members currently in a room.
    pub fn member_count(&self, room: &RoomName) -> usize {
        self.rooms.get(room).map_or(0, HashMap::len)
    }

    /// Rooms a connection currently belongs to.
    pub fn rooms_of(&self, conn: ConnectionId) -> Vec<RoomName> {
        self.joined
            .get(&conn)
            .map(|rooms| rooms.iter().cloned().collect())
            .unwrap_or_default()
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_protocol::Identity;
    use tokio::sync::mpsc::UnboundedReceiver;

    fn conn(id: u64) -> ConnectionId {
        ConnectionId::new(id)
    }

    fn room(name: &str) -> RoomName {
        RoomName::new(name)
    }

    fn channel() -> (OutboundSender, UnboundedReceiver<ServerEvent>) {
        mpsc::unbounded_channel()
    }

    fn announce(text: &str) -> ServerEvent {
        ServerEvent::AnnounceMessage {
            message: text.into(),
        }
    }

    #[test]
    fn test_join_adds_member() {
        let mut registry = RoomRegistry::new();
        let (tx, _rx) = channel();

        registry.join(conn(1), tx, room("lobby"));

        assert_eq!(registry.member_count(&room("lobby")), 1);
        assert_eq!(registry.rooms_of(conn(1)), vec![room("lobby")]);
    }

    #[test]
    fn test_join_twice_is_noop() {
        let mut registry = RoomRegistry::new();
        let (tx, _rx) = channel();

        registry.join(conn(1), tx.clone(), room("lobby"));
        registry.join(conn(1), tx, room("lobby"));

        assert_eq!(registry.member_count(&room("lobby")), 1);
    }

    #[test]
    fn test_broadcast_reaches_every_member() {
        let mut registry = RoomRegistry::new();
        let (tx1, mut rx1) = channel();
        let (tx2, mut rx2) = channel();
        registry.join(conn(1), tx1, room("lobby"));
        registry.join(conn(2), tx2, room("lobby"));

        let delivered = registry.broadcast(&room("lobby"), announce("hi"));

        assert_eq!(delivered, 2);
        assert_eq!(rx1.try_recv().unwrap(), announce("hi"));
        assert_eq!(rx2.try_recv().unwrap(), announce("hi"));
    }

    #[test]
    fn test_broadcast_skips_other_rooms() {
        let mut registry = RoomRegistry::new();
        let (tx1, _rx1) = channel();
        let (tx2, mut rx2) = channel();
        registry.join(conn(1), tx1, room("lobby"));
        registry.join(conn(2), tx2, room("den"));

        registry.broadcast(&room("lobby"), announce("hi"));

        assert!(rx2.try_recv().is_err(), "other room must not receive");
    }

    #[test]
    fn test_broadcast_to_unknown_room_delivers_nothing() {
        let registry = RoomRegistry::new();
        assert_eq!(registry.broadcast(&room("ghost"), announce("hi")), 0);
    }

    #[test]
    fn test_broadcast_skips_dropped_receiver() {
        let mut registry = RoomRegistry::new();
        let (tx1, rx1) = channel();
        let (tx2, mut rx2) = channel();
        registry.join(conn(1), tx1, room("lobby"));
        registry.join(conn(2), tx2, room("lobby"));
        drop(rx1); // handler went away without leaving

        let delivered = registry.broadcast(&room("lobby"), announce("hi"));

        assert_eq!(delivered, 1);
        assert_eq!(rx2.try_recv().unwrap(), announce("hi"));
    }

    #[test]
    fn test_leave_removes_member() {
        let mut registry = RoomRegistry::new();
        let (tx, _rx) = channel();
        registry.join(conn(1), tx, room("lobby"));

        registry.leave(conn(1), &room("lobby"));

        assert_eq!(registry.member_count(&room("lobby")), 0);
        assert!(registry.rooms_of(conn(1)).is_empty());
    }

    #[test]
    fn test_leave_room_not_joined_is_noop() {
        let mut registry = RoomRegistry::new();
        let (tx, _rx) = channel();
        registry.join(conn(1), tx, room("lobby"));

        registry.leave(conn(1), &room("den"));
        registry.leave(conn(99), &room("lobby"));

        assert_eq!(registry.member_count(&room("lobby")), 1);
    }

    #[test]
    fn test_leave_all_clears_every_membership() {
        let mut registry = RoomRegistry::new();
        let (tx, _rx) = channel();
        registry.join(conn(1), tx.clone(), room("lobby"));
        registry.join(conn(1), tx, room("den"));

        registry.leave_all(conn(1));

        assert_eq!(registry.member_count(&room("lobby")), 0);
        assert_eq!(registry.member_count(&room("den")), 0);
        assert!(registry.rooms_of(conn(1)).is_empty());
    }

    #[test]
    fn test_leave_all_unknown_connection_is_noop() {
        let mut registry = RoomRegistry::new();
        registry.leave_all(conn(42));
        assert!(registry.rooms_of(conn(42)).is_empty());
    }

    #[test]
    fn test_receive_message_payload_passes_through() {
        let mut registry = RoomRegistry::new();
        let (tx, mut rx) = channel();
        registry.join(conn(1), tx, room("lobby"));

        let event = ServerEvent::ReceiveMessage {
            identity: Identity::new("alice"),
            message: "hi".into(),
        };
        registry.broadcast(&room("lobby"), event.clone());

        assert_eq!(rx.try_recv().unwrap(), event);
    }
}
