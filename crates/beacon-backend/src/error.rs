//! Error types for backend calls.

/// Errors that can occur while talking to the system of record.
///
/// The presence layer logs these and moves on; none of them are ever
/// surfaced to an end-user connection.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Network-level failure, timeout, or response body decode failure.
    #[error("backend request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The backend answered with a non-2xx status.
    #[error("backend returned status {0}")]
    Status(u16),

    /// The reissue response parsed but carried no usable credential.
    #[error("backend reissued an invalid credential")]
    InvalidCredential,
}
