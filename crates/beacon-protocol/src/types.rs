//! Event types for Beacon's wire format.
//!
//! Every inbound frame is one [`ClientEvent`]; every outbound frame is
//! one [`ServerEvent`]. Both are internally tagged with an `"event"`
//! field so a frame reads like `{"event": "login", "identity": "alice",
//! "credential": "..."}` — the shape browser clients already speak.

use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The stable user handle driving presence and routing decisions.
///
/// An identity is asserted by a `login` event and assumed valid — the
/// backend owns verification. Wrapping the `String` keeps identities
/// from being confused with room names or message bodies in signatures.
///
/// `#[serde(transparent)]` serializes `Identity("alice")` as plain
/// `"alice"`, which is what the client SDK and the backend expect.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(pub String);

impl Identity {
    /// Creates an identity from anything string-like.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the raw handle.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named room (group) that connections can join for broadcasts.
///
/// Rooms are created implicitly by the first join and carry no state of
/// their own beyond membership.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomName(pub String);

impl RoomName {
    /// Creates a room name from anything string-like.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl fmt::Display for RoomName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// ClientEvent — inbound
// ---------------------------------------------------------------------------

/// Events a client sends to the relay.
///
/// `#[serde(tag = "event", rename_all = "snake_case")]` produces the
/// internally tagged snake_case form the deployed clients use:
/// `{"event": "join_room", "room": "lobby"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Bind this connection to an identity and supply fresh credential
    /// material for outbound backend calls.
    Login {
        identity: Identity,
        credential: String,
    },

    /// Join a room. Joining a room twice is a no-op.
    JoinRoom { room: RoomName },

    /// Leave a room. Leaving a room never joined is a no-op.
    LeaveRoom { room: RoomName },

    /// Send a chat message to everyone in a room.
    /// Emitted back to the room as [`ServerEvent::ReceiveMessage`].
    SendMessage {
        identity: Identity,
        room: RoomName,
        message: String,
    },

    /// Post an anonymous announcement to a room.
    /// Emitted as [`ServerEvent::AnnounceMessage`].
    Announce { room: RoomName, message: String },

    /// Send a direct message to every online friend of `identity`.
    /// Emitted to each friend's live connections as
    /// [`ServerEvent::FriendMessage`].
    SendMessageToFriends {
        identity: Identity,
        message: String,
    },
}

// ---------------------------------------------------------------------------
// ServerEvent — outbound
// ---------------------------------------------------------------------------

/// Events the relay pushes to clients.
///
/// Delivery is best-effort at-most-once: no acknowledgement, no retry,
/// no ordering guarantee across different connections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A friend transitioned offline → online.
    /// Sent at most once per actual transition, never per extra device.
    FriendLogin { identity: Identity },

    /// A friend's grace period elapsed without a reconnect.
    FriendLogout { identity: Identity },

    /// A chat message relayed to a room.
    ReceiveMessage {
        identity: Identity,
        message: String,
    },

    /// An announcement relayed to a room.
    AnnounceMessage { message: String },

    /// A direct message fanned out to an online friend.
    FriendMessage {
        identity: Identity,
        message: String,
    },
}

// =========================================================================
// Tests
// =========================================================================
