//! Bearer credential material and expiry extraction.
//!
//! Credentials are opaque to the relay except for one field: the expiry
//! timestamp, which drives proactive refresh scheduling. Signing and
//! claim semantics belong to the backend; nothing here verifies
//! anything.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::Deserialize;

/// Bearer credential supplied at login or reissued by the backend.
///
/// Expected to be JWT-shaped (`header.claims.signature`) so the `exp`
/// claim can be read, but any string is accepted — a credential whose
/// expiry cannot be decoded is simply never scheduled for refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential(String);

/// Only the expiry claim is consumed; everything else is ignored.
#[derive(Deserialize)]
struct Claims {
    exp: u64,
}

impl Credential {
    /// Wraps raw credential material.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns the raw material for the `Authorization` header.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decodes the expiry timestamp from the claims segment.
    ///
    /// Returns `None` for anything that isn't a three-segment token
    /// with base64url claims carrying a numeric `exp` — the caller
    /// treats that as already-expired/unschedulable.
    pub fn expires_at(&self) -> Option<SystemTime> {
        let claims_segment = self.0.split('.').nth(1)?;
        let raw = URL_SAFE_NO_PAD.decode(claims_segment).ok()?;
        let claims: Claims = serde_json::from_slice(&raw).ok()?;
        Some(UNIX_EPOCH + Duration::from_secs(claims.exp))
    }

    /// Time remaining until expiry, or `None` if unknown or already past.
    pub fn time_to_expiry(&self) -> Option<Duration> {
        self.expires_at()?
            .duration_since(SystemTime::now())
            .ok()
    }
}

impl From<String> for Credential {
    fn from(token: String) -> Self {
        Self(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds a JWT-shaped token whose claims carry the given `exp`.
    fn token_with_exp(exp: u64) -> String {
        let claims = URL_SAFE_NO_PAD.encode(format!("{{\"exp\":{exp}}}"));
        format!("e30.{claims}.sig")
    }

    #[test]
    fn test_expires_at_reads_exp_claim() {
        let cred = Credential::new(token_with_exp(1_700_000_000));
        let expected = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        assert_eq!(cred.expires_at(), Some(expected));
    }

    #[test]
    fn test_expires_at_none_for_opaque_token() {
        let cred = Credential::new("not-a-jwt");
        assert_eq!(cred.expires_at(), None);
    }

    #[test]
    fn test_expires_at_none_for_invalid_base64_claims() {
        let cred = Credential::new("e30.!!!not-base64!!!.sig");
        assert_eq!(cred.expires_at(), None);
    }

    #[test]
    fn test_expires_at_none_when_exp_missing() {
        let claims = URL_SAFE_NO_PAD.encode(r#"{"sub":"alice"}"#);
        let cred = Credential::new(format!("e30.{claims}.sig"));
        assert_eq!(cred.expires_at(), None);
    }

    #[test]
    fn test_time_to_expiry_for_future_credential() {
        let exp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs()
            + 3600;
        let cred = Credential::new(token_with_exp(exp));

        let remaining = cred.time_to_expiry().expect("should be in the future");
        assert!(remaining > Duration::from_secs(3500));
        assert!(remaining <= Duration::from_secs(3600));
    }

    #[test]
    fn test_time_to_expiry_none_for_expired_credential() {
        let cred = Credential::new(token_with_exp(1)); // 1970
        assert_eq!(cred.time_to_expiry(), None);
    }
}
