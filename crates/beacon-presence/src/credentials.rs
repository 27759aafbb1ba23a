//! The credential vault: per-identity credential storage and proactive
//! refresh scheduling.
//!
//! Each stored credential gets at most one refresh task, armed at
//! `expiry - refresh_margin`. The task re-arms itself from each
//! reissued credential's expiry and stops on the first failure — a
//! failed refresh is not retried, the identity's authorized calls
//! simply fail until the next login supplies fresh material.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use beacon_backend::{Backend, Credential};
use beacon_protocol::Identity;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::stats::BackendStats;

struct Entry {
    credential: Credential,
    /// The pending refresh task, absent when the credential's expiry
    /// could not be decoded or is already inside the margin.
    refresh: Option<JoinHandle<()>>,
}

impl Drop for Entry {
    fn drop(&mut self) {
        if let Some(task) = self.refresh.take() {
            task.abort();
        }
    }
}

/// Holds the current credential for every known identity and keeps each
/// one fresh ahead of expiry.
pub struct CredentialVault<B> {
    entries: Arc<Mutex<HashMap<Identity, Entry>>>,
    backend: Arc<B>,
    margin: Duration,
    stats: Arc<BackendStats>,
}

impl<B> Clone for CredentialVault<B> {
    fn clone(&self) -> Self {
        Self {
            entries: Arc::clone(&self.entries),
            backend: Arc::clone(&self.backend),
            margin: self.margin,
            stats: Arc::clone(&self.stats),
        }
    }
}

impl<B: Backend> CredentialVault<B> {
    pub(crate) fn new(
        backend: Arc<B>,
        margin: Duration,
        stats: Arc<BackendStats>,
    ) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            backend,
            margin,
            stats,
        }
    }

    /// Stores a credential for `identity`, replacing any previous one.
    ///
    /// The previous refresh task is aborted before the new one is
    /// armed, so at most one refresh timer exists per identity at any
    /// instant. A credential without a usable future expiry is stored
    /// but never scheduled.
    pub async fn set(&self, identity: Identity, credential: Credential) {
        let delay = refresh_delay(&credential, self.margin);
        if delay.is_none() {
            tracing::debug!(
                %identity,
                "credential has no refreshable expiry; refresh not scheduled"
            );
        }

        let mut entries = self.entries.lock().await;
        // Dropping the old entry aborts its refresh task.
        entries.remove(&identity);
        let refresh = delay.map(|d| self.spawn_refresh(identity.clone(), d));
        entries.insert(
            identity,
            Entry {
                credential,
                refresh,
            },
        );
    }

    /// Removes the stored credential and cancels its refresh task,
    /// returning the credential that was stored.
    pub async fn take(&self, identity: &Identity) -> Option<Credential> {
        self.entries
            .lock()
            .await
            .remove(identity)
            .map(|entry| entry.credential.clone())
    }

    /// Snapshot of the current credential for `identity`.
    pub async fn credential_for(&self, identity: &Identity) -> Option<Credential> {
        self.entries
            .lock()
            .await
            .get(identity)
            .map(|entry| entry.credential.clone())
    }

    fn spawn_refresh(&self, identity: Identity, delay: Duration) -> JoinHandle<()> {
        let vault = self.clone();
        // The sleep captures its deadline here, not at the task's first
        // poll, so the schedule is measured from when the credential was
        // stored.
        let first = tokio::time::sleep(delay);
        tokio::spawn(async move {
            first.await;
            loop {
                vault.stats.record_refresh();
                match vault.backend.refresh_credential(&identity).await {
                    Ok(reissued) => match vault.replace(&identity, reissued).await {
                        Some(next) => {
                            tracing::debug!(%identity, "credential refreshed");
                            tokio::time::sleep(next).await;
                        }
                        None => break,
                    },
                    Err(e) => {
                        vault.stats.record_failure();
                        tracing::warn!(
                            %identity,
                            error = %e,
                            "credential refresh failed; authorized calls will \
                             fail until the next login"
                        );
                        break;
                    }
                }
            }
        })
    }

    /// Swaps in a reissued credential from inside the refresh task and
    /// returns the delay until the next refresh.
    ///
    /// Returns `None` when the entry was cleared while the refresh was
    /// in flight (session destroyed) or the reissued credential has no
    /// refreshable expiry — either way the task stops.
    async fn replace(
        &self,
        identity: &Identity,
        credential: Credential,
    ) -> Option<Duration> {
        let mut entries = self.entries.lock().await;
        let entry = entries.get_mut(identity)?;
        let next = refresh_delay(&credential, self.margin);
        entry.credential = credential;
        next
    }
}

/// Delay until `credential` should be refreshed, or `None` when its
/// expiry is unknown or closer than the margin.
fn refresh_delay(credential: &Credential, margin: Duration) -> Option<Duration> {
    credential
        .time_to_expiry()?
        .checked_sub(margin)
        .filter(|d| !d.is_zero())
}

#[cfg(test)]
mod tests {
    use super::*;
    use beacon_backend::BackendError;
    use std::time::SystemTime;

    struct NullBackend;

    impl Backend for NullBackend {
        async fn set_online_status(
            &self,
            _identity: &Identity,
            _online: bool,
            _credential: Option<&Credential>,
        ) -> Result<(), BackendError> {
            Ok(())
        }

        async fn get_online_friends(
            &self,
            _identity: &Identity,
            _credential: Option<&Credential>,
        ) -> Result<Vec<Identity>, BackendError> {
            Ok(Vec::new())
        }

        async fn refresh_credential(
            &self,
            _identity: &Identity,
        ) -> Result<Credential, BackendError> {
            Ok(Credential::new("reissued"))
        }
    }

    fn vault() -> CredentialVault<NullBackend> {
        CredentialVault::new(
            Arc::new(NullBackend),
            Duration::from_secs(60),
            Arc::new(BackendStats::default()),
        )
    }

    #[tokio::test]
    async fn test_take_returns_and_removes_credential() {
        let vault = vault();
        let alice = Identity::new("alice");
        vault.set(alice.clone(), Credential::new("tok")).await;

        assert_eq!(vault.take(&alice).await, Some(Credential::new("tok")));
        assert_eq!(vault.take(&alice).await, None);
        assert_eq!(vault.credential_for(&alice).await, None);
    }

    #[tokio::test]
    async fn test_set_after_take_stores_fresh_credential() {
        let vault = vault();
        let alice = Identity::new("alice");
        vault.set(alice.clone(), Credential::new("old")).await;
        vault.take(&alice).await;

        vault.set(alice.clone(), Credential::new("new")).await;
        assert_eq!(
            vault.credential_for(&alice).await,
            Some(Credential::new("new"))
        );
    }

    #[test]
    fn test_refresh_delay_subtracts_margin() {
        let exp = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap()
            .as_secs()
            + 3600;
        let claims = {
            use base64::Engine;
            base64::engine::general_purpose::URL_SAFE_NO_PAD
                .encode(format!("{{\"exp\":{exp}}}"))
        };
        let cred = Credential::new(format!("e30.{claims}.sig"));

        let delay = refresh_delay(&cred, Duration::from_secs(60))
            .expect("should schedule");
        assert!(delay > Duration::from_secs(3500));
        assert!(delay <= Duration::from_secs(3540));
    }

    #[test]
    fn test_refresh_delay_none_for_opaque_credential() {
        let cred = Credential::new("opaque");
        assert_eq!(refresh_delay(&cred, Duration::from_secs(60)), None);
    }

    #[test]
    fn test_refresh_delay_none_inside_margin() {
        let exp = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap()
            .as_secs()
            + 30;
        let claims = {
            use base64::Engine;
            base64::engine::general_purpose::URL_SAFE_NO_PAD
                .encode(format!("{{\"exp\":{exp}}}"))
        };
        let cred = Credential::new(format!("e30.{claims}.sig"));

        assert_eq!(refresh_delay(&cred, Duration::from_secs(60)), None);
    }
}
