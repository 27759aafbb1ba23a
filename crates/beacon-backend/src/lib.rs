//! Backend collaborator for Beacon.
//!
//! The relay does not own durable state. Persisted online/offline
//! flags, the friend graph, and credential issuance all live in an
//! external system of record, consumed through the [`Backend`] trait:
//!
//! 1. **Status writes** — `set_online_status` persists presence flips
//! 2. **Friend queries** — `get_online_friends` drives fan-out targets
//! 3. **Credential reissue** — `refresh_credential` keeps outbound
//!    calls authorized
//!
//! [`HttpBackend`] is the production implementation; tests substitute
//! recording mocks. Every operation is fallible and the presence layer
//! treats failures as non-fatal — availability of the relay wins over
//! strict consistency with the backend.

#![allow(async_fn_in_trait)]

mod credential;
mod error;
mod http;

pub use credential::Credential;
pub use error::BackendError;
pub use http::HttpBackend;

use beacon_protocol::Identity;

/// The external system of record.
///
/// `Send + Sync + 'static` because one backend handle is shared across
/// every connection handler and timer task for the life of the server.
pub trait Backend: Send + Sync + 'static {
    /// Persists an identity's online flag.
    ///
    /// Authorized with the bearer credential when one is supplied; the
    /// relay calls this with `None` only when no credential was ever
    /// stored for the identity (the backend decides whether to accept).
    fn set_online_status(
        &self,
        identity: &Identity,
        online: bool,
        credential: Option<&Credential>,
    ) -> impl Future<Output = Result<(), BackendError>> + Send;

    /// Returns the identities the backend currently considers online
    /// friends of `identity`.
    ///
    /// The backend's view may lag the relay's: returned friends without
    /// live connections here are skipped during fan-out.
    fn get_online_friends(
        &self,
        identity: &Identity,
        credential: Option<&Credential>,
    ) -> impl Future<Output = Result<Vec<Identity>, BackendError>> + Send;

    /// Requests freshly issued credential material for `identity`.
    fn refresh_credential(
        &self,
        identity: &Identity,
    ) -> impl Future<Output = Result<Credential, BackendError>> + Send;
}
