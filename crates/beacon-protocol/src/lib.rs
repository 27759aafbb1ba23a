//! Wire protocol for the Beacon presence relay.
//!
//! This crate defines the events that travel between clients and the
//! relay, and how they are converted to and from bytes:
//!
//! - **Types** ([`ClientEvent`], [`ServerEvent`], [`Identity`],
//!   [`RoomName`]) — the event structures on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — serialization strategy.
//! - **Errors** ([`ProtocolError`]) — what can go wrong while
//!   encoding/decoding.
//!
//! The protocol layer knows nothing about connections, sessions, or the
//! backend — it only describes event shapes.
//!
//! ```text
//! Transport (bytes) → Protocol (ClientEvent) → Presence (session state)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{ClientEvent, Identity, RoomName, ServerEvent};
