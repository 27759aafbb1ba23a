//! Codec trait and implementations for serializing wire events.
//!
//! The rest of the relay never calls `serde_json` directly — it goes
//! through the [`Codec`] trait so the wire format can be swapped (a
//! compact binary codec, say) without touching the router or transport.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// Converts events to bytes and back.
///
/// `Send + Sync + 'static` because a codec is shared across every
/// connection handler task for the lifetime of the server.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Encode`] if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns [`ProtocolError::Decode`] if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] using JSON via `serde_json`.
///
/// JSON is what the deployed browser clients speak, and frames stay
/// inspectable in DevTools. Behind the `json` feature flag (default).
///
/// ## Example
///
/// ```rust
/// use beacon_protocol::{Codec, JsonCodec, RoomName, ClientEvent};
///
/// let codec = JsonCodec;
/// let ev = ClientEvent::JoinRoom { room: RoomName::new("lobby") };
///
/// let bytes = codec.encode(&ev).unwrap();
/// let decoded: ClientEvent = codec.decode(&bytes).unwrap();
/// assert_eq!(ev, decoded);
/// ```
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(all(test, feature = "json"))]
mod tests {
    use super::*;
    use crate::{Identity, ServerEvent};

    #[test]
    fn test_json_codec_round_trips_server_event() {
        let codec = JsonCodec;
        let ev = ServerEvent::FriendLogin {
            identity: Identity::new("alice"),
        };

        let bytes = codec.encode(&ev).unwrap();
        let decoded: ServerEvent = codec.decode(&bytes).unwrap();

        assert_eq!(ev, decoded);
    }

    #[test]
    fn test_json_codec_decode_error_on_garbage() {
        let codec = JsonCodec;
        let result: Result<ServerEvent, _> = codec.decode(b"\xff\xfe");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }
}
