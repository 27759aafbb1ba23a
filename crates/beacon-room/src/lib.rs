//! Room membership for Beacon.
//!
//! A room is a named broadcast group: connections join and leave it
//! freely, and a message sent to the room reaches every member. Rooms
//! carry no state beyond membership — they are created implicitly by
//! the first join and vanish when the last member leaves.
//!
//! Membership is connection-level, not identity-level: two devices of
//! the same identity can sit in different rooms.

mod registry;

pub use registry::{OutboundSender, RoomRegistry};
