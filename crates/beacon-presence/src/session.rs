//! Session types: the in-memory record of a currently-known identity.

use tokio::task::JoinHandle;

// ---------------------------------------------------------------------------
// PresenceState
// ---------------------------------------------------------------------------

/// The presence state of an identity that has a session.
///
/// ```text
///            ┌──(login)──────────────┐
///            ▼                       │
/// (absent) ──login──→ Online ──last conn drops──→ GracePending
///    ▲                  ▲                              │
///    │                  └────(reconnect)───────────────┤
///    └──────────(grace timer fires)────────────────────┘
/// ```
///
/// There is no `Offline` variant: an offline identity has no session at
/// all. Keeping absence as the offline representation makes the
/// "sessions are not retained for offline users" invariant structural.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresenceState {
    /// At least one live connection.
    Online,

    /// Zero connections, grace timer running, backend not yet told
    /// offline. A reconnect from here is invisible to everyone else.
    GracePending,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// One identity's session.
///
/// Created on the first `login` for an unknown identity; destroyed when
/// the grace timer fires with the connection set still empty. The
/// connection set itself lives in the
/// [`ConnectionRegistry`](crate::ConnectionRegistry) — the session
/// carries the state machine and its timer.
#[derive(Debug)]
pub struct Session {
    /// Current presence state.
    pub state: PresenceState,

    /// The pending grace timer task, present only while
    /// `state == GracePending`. Aborted on reconnect.
    pub(crate) grace_timer: Option<JoinHandle<()>>,

    /// Bumped every time a grace timer is started. A timer that fires
    /// carries the generation it was started with; a mismatch means a
    /// reconnect happened in between and the timer must stand down.
    pub(crate) generation: u64,
}

impl Session {
    /// A fresh session for an identity that just logged in.
    pub(crate) fn new_online() -> Self {
        Self {
            state: PresenceState::Online,
            grace_timer: None,
            generation: 0,
        }
    }

    /// Aborts the pending grace timer, if any. Idempotent.
    pub(crate) fn cancel_grace(&mut self) {
        if let Some(timer) = self.grace_timer.take() {
            timer.abort();
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // A destroyed session must never leave a timer behind to fire
        // against a successor session for the same identity.
        self.cancel_grace();
    }
}
