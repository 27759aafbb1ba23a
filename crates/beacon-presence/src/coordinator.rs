//! The presence coordinator: the state machine driver for every
//! identity known to the relay.
//!
//! All mutation of the registry and session map happens under one
//! mutex; backend I/O happens outside it. Because a handler resumes
//! after a backend await, the session may have changed in the interim —
//! every post-await decision here re-reads current state instead of
//! assuming nothing moved (the grace timer's generation check is the
//! sharpest instance of this).

use std::collections::HashMap;
use std::sync::Arc;

use beacon_backend::{Backend, Credential};
use beacon_protocol::{Identity, ServerEvent};
use beacon_transport::ConnectionId;
use tokio::sync::Mutex;

use crate::config::PresenceConfig;
use crate::credentials::CredentialVault;
use crate::registry::{ConnectionRegistry, EventSender};
use crate::session::{PresenceState, Session};
use crate::stats::{BackendStats, StatsSnapshot};

/// Mutable presence state, guarded by the coordinator's mutex.
#[derive(Default)]
struct PresenceInner {
    registry: ConnectionRegistry,
    sessions: HashMap<Identity, Session>,
}

/// Coordinates session transitions, backend persistence, and friend
/// fan-out. Cheap to clone; all clones share state.
pub struct PresenceCoordinator<B> {
    inner: Arc<Mutex<PresenceInner>>,
    vault: CredentialVault<B>,
    backend: Arc<B>,
    config: PresenceConfig,
    stats: Arc<BackendStats>,
}

impl<B> Clone for PresenceCoordinator<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            vault: self.vault.clone(),
            backend: Arc::clone(&self.backend),
            config: self.config.clone(),
            stats: Arc::clone(&self.stats),
        }
    }
}

impl<B: Backend> PresenceCoordinator<B> {
    /// Creates a coordinator over the given backend collaborator.
    pub fn new(backend: B, config: PresenceConfig) -> Self {
        let backend = Arc::new(backend);
        let stats = Arc::new(BackendStats::default());
        Self {
            inner: Arc::new(Mutex::new(PresenceInner::default())),
            vault: CredentialVault::new(
                Arc::clone(&backend),
                config.refresh_margin,
                Arc::clone(&stats),
            ),
            backend,
            config,
            stats,
        }
    }

    /// Handles a `login` event: binds `conn` to `identity`, stores the
    /// credential, and — only on an actual offline → online edge —
    /// persists the flag and announces `friend_login` to online friends.
    ///
    /// Presence is identity-level: an extra device while already online
    /// and a reconnect inside the grace window both change nothing the
    /// backend or friends can observe.
    pub async fn login(
        &self,
        identity: Identity,
        credential: Credential,
        conn: ConnectionId,
        sender: EventSender,
    ) {
        let first_login = {
            let mut inner = self.inner.lock().await;
            // Re-binding a connection to a different identity is a
            // disconnect for the old one: if that was its last
            // connection, the old identity enters the grace window.
            if let Some(displaced) = inner.registry.add(identity.clone(), conn, sender) {
                if inner.registry.connection_count(&displaced) == 0 {
                    tracing::info!(
                        %displaced,
                        %conn,
                        "connection re-bound to a different identity"
                    );
                    self.begin_grace(&mut inner, displaced);
                }
            }
            match inner.sessions.get_mut(&identity) {
                Some(session) => {
                    if session.state == PresenceState::GracePending {
                        session.cancel_grace();
                        session.state = PresenceState::Online;
                        tracing::info!(%identity, %conn, "reconnected within grace period");
                    } else {
                        tracing::info!(%identity, %conn, "additional device connected");
                    }
                    false
                }
                None => {
                    inner.sessions.insert(identity.clone(), Session::new_online());
                    tracing::info!(%identity, %conn, "logged in");
                    true
                }
            }
        };

        // Credential is overwritten on every login, even device-level
        // ones — the newest material wins and its refresh replaces the
        // old schedule.
        self.vault.set(identity.clone(), credential).await;

        if first_login {
            let credential = self.vault.credential_for(&identity).await;
            self.stats.record_status_write();
            if let Err(e) = self
                .backend
                .set_online_status(&identity, true, credential.as_ref())
                .await
            {
                self.stats.record_failure();
                tracing::warn!(%identity, error = %e, "failed to persist online status");
            }
            let event = ServerEvent::FriendLogin {
                identity: identity.clone(),
            };
            self.fan_out(&identity, credential.as_ref(), event).await;
        }
    }

    /// Handles a connection going away.
    ///
    /// Removing the last connection starts the grace window rather than
    /// flipping the identity offline; unknown or already-removed
    /// connections are ignored.
    pub async fn disconnect(&self, conn: ConnectionId) {
        let mut inner = self.inner.lock().await;
        let Some(identity) = inner.registry.remove(conn) else {
            tracing::debug!(%conn, "disconnect for unregistered connection ignored");
            return;
        };
        if inner.registry.connection_count(&identity) > 0 {
            tracing::debug!(%identity, %conn, "device disconnected, others remain");
            return;
        }
        tracing::info!(%identity, %conn, "last device disconnected");
        self.begin_grace(&mut inner, identity);
    }

    /// Starts the grace window for an identity whose connection count
    /// just hit zero. Caller holds the state lock.
    fn begin_grace(&self, inner: &mut PresenceInner, identity: Identity) {
        let Some(session) = inner.sessions.get_mut(&identity) else {
            return;
        };

        session.state = PresenceState::GracePending;
        session.generation += 1;
        let generation = session.generation;
        let grace = self.config.grace_period;
        // The sleep captures its deadline here, not at the task's first
        // poll, so the window is measured from this transition.
        let sleep = tokio::time::sleep(grace);
        let coordinator = self.clone();
        let timer_identity = identity.clone();
        let timer = tokio::spawn(async move {
            sleep.await;
            coordinator.finalize_offline(timer_identity, generation).await;
        });
        // Replacement always aborts the predecessor: a stale timer must
        // never fire alongside the one just armed.
        session.cancel_grace();
        session.grace_timer = Some(timer);
        tracing::info!(
            %identity,
            grace_ms = grace.as_millis() as u64,
            "grace period started"
        );
    }

    /// Runs when a grace timer fires: declares the identity offline if
    /// — and only if — this timer is still the live one for a session
    /// that is still empty.
    async fn finalize_offline(&self, identity: Identity, generation: u64) {
        let credential = {
            let mut inner = self.inner.lock().await;
            let still_pending = inner.sessions.get(&identity).is_some_and(|s| {
                s.state == PresenceState::GracePending && s.generation == generation
            }) && inner.registry.connection_count(&identity) == 0;
            if !still_pending {
                tracing::debug!(%identity, "grace timer superseded by a reconnect");
                return;
            }
            if let Some(mut session) = inner.sessions.remove(&identity) {
                // This very task *is* the grace timer: forget the
                // handle so dropping the session doesn't abort the
                // code currently running.
                session.grace_timer.take();
            }
            // The vault entry comes out under the same lock as the
            // session, so a login racing this finalization cannot have
            // its fresh credential wiped. Lock order is always state
            // lock before vault lock.
            self.vault.take(&identity).await
        };

        // The in-memory transition is already done; a failed write below
        // leaves the backend stale until the next login/logout cycle.
        self.stats.record_status_write();
        if let Err(e) = self
            .backend
            .set_online_status(&identity, false, credential.as_ref())
            .await
        {
            self.stats.record_failure();
            tracing::warn!(%identity, error = %e, "failed to persist offline status");
        }
        let event = ServerEvent::FriendLogout {
            identity: identity.clone(),
        };
        self.fan_out(&identity, credential.as_ref(), event).await;
        tracing::info!(%identity, "logged out after grace period");
    }

    /// Delivers a friend message from `identity` to every live
    /// connection of each online friend. Returns the number of
    /// connections reached.
    pub async fn send_to_friends(&self, identity: &Identity, message: String) -> usize {
        let credential = self.vault.credential_for(identity).await;
        let event = ServerEvent::FriendMessage {
            identity: identity.clone(),
            message,
        };
        self.fan_out(identity, credential.as_ref(), event).await
    }

    /// Fetches `identity`'s online friends and pushes `event` to each
    /// friend's live connections.
    ///
    /// A backend failure degrades to an empty friend list — counted,
    /// logged, never surfaced to any connection. Friends the backend
    /// still lists but which have no live connections here are skipped:
    /// the registry, not the backend graph, decides reachability.
    async fn fan_out(
        &self,
        identity: &Identity,
        credential: Option<&Credential>,
        event: ServerEvent,
    ) -> usize {
        self.stats.record_friend_query();
        let friends = match self
            .backend
            .get_online_friends(identity, credential)
            .await
        {
            Ok(friends) => friends,
            Err(e) => {
                self.stats.record_failure();
                tracing::warn!(
                    %identity,
                    error = %e,
                    "online friends fetch failed, skipping fan-out"
                );
                return 0;
            }
        };

        let inner = self.inner.lock().await;
        let mut delivered = 0;
        for friend in &friends {
            for sender in inner.registry.senders_of(friend) {
                if sender.send(event.clone()).is_ok() {
                    delivered += 1;
                }
            }
        }
        delivered
    }

    /// Whether the identity currently has a session in the `Online`
    /// state.
    pub async fn is_online(&self, identity: &Identity) -> bool {
        self.state_of(identity).await == Some(PresenceState::Online)
    }

    /// The identity's current presence state, or `None` when offline
    /// (no session retained).
    pub async fn state_of(&self, identity: &Identity) -> Option<PresenceState> {
        let inner = self.inner.lock().await;
        inner.sessions.get(identity).map(|s| s.state)
    }

    /// Number of live connections for an identity.
    pub async fn connection_count(&self, identity: &Identity) -> usize {
        let inner = self.inner.lock().await;
        inner.registry.connection_count(identity)
    }

    /// Snapshot of the stored credential for an identity, if any.
    pub async fn credential_for(&self, identity: &Identity) -> Option<Credential> {
        self.vault.credential_for(identity).await
    }

    /// Point-in-time backend call counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}
