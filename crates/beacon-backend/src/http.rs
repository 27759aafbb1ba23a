//! HTTP implementation of the [`Backend`] trait.
//!
//! Consumes the system of record's REST surface:
//!
//! - `PUT  /user/status/update`          — persist an online flag
//! - `GET  /friend/list/online?identity=` — online friends of an identity
//! - `POST /reissue?identity=`            — reissue a credential
//!
//! Every request carries a bounded timeout so a hung backend can never
//! suspend a presence handler indefinitely.

use std::time::Duration;

use beacon_protocol::Identity;
use serde::{Deserialize, Serialize};

use crate::{Backend, BackendError, Credential};

/// Body for `PUT /user/status/update`.
#[derive(Serialize)]
struct StatusUpdate<'a> {
    identity: &'a Identity,
    #[serde(rename = "isOnline")]
    is_online: bool,
}

/// One entry of the `GET /friend/list/online` response.
#[derive(Deserialize)]
struct FriendEntry {
    identity: Identity,
}

/// Body of the `POST /reissue` response.
#[derive(Deserialize)]
struct Reissued {
    credential: String,
}

/// [`Backend`] implementation over the system of record's HTTP API.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBackend {
    /// Creates a backend client for `base_url` with the given per-request
    /// timeout.
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Ok(Self { base_url, client })
    }

    fn authorize(
        request: reqwest::RequestBuilder,
        credential: Option<&Credential>,
    ) -> reqwest::RequestBuilder {
        match credential {
            Some(cred) => request.bearer_auth(cred.as_str()),
            None => request,
        }
    }
}

impl Backend for HttpBackend {
    async fn set_online_status(
        &self,
        identity: &Identity,
        online: bool,
        credential: Option<&Credential>,
    ) -> Result<(), BackendError> {
        let url = format!("{}/user/status/update", self.base_url);
        let request = self.client.put(&url).json(&StatusUpdate {
            identity,
            is_online: online,
        });

        let response = Self::authorize(request, credential).send().await?;
        if !response.status().is_success() {
            return Err(BackendError::Status(response.status().as_u16()));
        }
        tracing::debug!(%identity, online, "persisted online status");
        Ok(())
    }

    async fn get_online_friends(
        &self,
        identity: &Identity,
        credential: Option<&Credential>,
    ) -> Result<Vec<Identity>, BackendError> {
        let url = format!("{}/friend/list/online", self.base_url);
        let request = self
            .client
            .get(&url)
            .query(&[("identity", identity.as_str())]);

        let response = Self::authorize(request, credential).send().await?;
        if !response.status().is_success() {
            return Err(BackendError::Status(response.status().as_u16()));
        }

        let entries: Vec<FriendEntry> = response.json().await?;
        Ok(entries.into_iter().map(|e| e.identity).collect())
    }

    async fn refresh_credential(
        &self,
        identity: &Identity,
    ) -> Result<Credential, BackendError> {
        let url = format!("{}/reissue", self.base_url);
        let response = self
            .client
            .post(&url)
            .query(&[("identity", identity.as_str())])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(BackendError::Status(response.status().as_u16()));
        }

        let reissued: Reissued = response.json().await?;
        if reissued.credential.is_empty() {
            return Err(BackendError::InvalidCredential);
        }
        tracing::debug!(%identity, "credential reissued");
        Ok(Credential::new(reissued.credential))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_strips_trailing_slash() {
        let backend =
            HttpBackend::new("http://localhost:4000/", Duration::from_secs(5))
                .expect("client should build");
        assert_eq!(backend.base_url, "http://localhost:4000");
    }

    #[test]
    fn test_status_update_body_uses_camel_case_flag() {
        // The backend expects `isOnline`, not `is_online`.
        let body = StatusUpdate {
            identity: &Identity::new("alice"),
            is_online: true,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["identity"], "alice");
        assert_eq!(json["isOnline"], true);
    }

    #[test]
    fn test_friend_entry_parses_backend_shape() {
        let entries: Vec<FriendEntry> =
            serde_json::from_str(r#"[{"identity":"bob"},{"identity":"carol"}]"#)
                .unwrap();
        let names: Vec<Identity> =
            entries.into_iter().map(|e| e.identity).collect();
        assert_eq!(names, vec![Identity::new("bob"), Identity::new("carol")]);
    }
}
