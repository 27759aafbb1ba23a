//! Unified error type for the Beacon relay.

use beacon_backend::BackendError;
use beacon_protocol::ProtocolError;
use beacon_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `beacon` meta-crate, you deal with this single error
/// type instead of importing errors from each sub-crate. The `#[from]`
/// attribute on each variant auto-generates `From` impls, so the `?`
/// operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// A transport-level error (accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, invalid event).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A backend-level error (HTTP, status, credential).
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// A configuration file could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}
