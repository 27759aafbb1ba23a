//! Relay configuration.
//!
//! All knobs have defaults good enough for local development; a
//! deployment overrides them from a TOML file via
//! [`RelayConfig::from_toml_str`]. Unknown keys are rejected so a typo
//! fails loudly at startup instead of silently keeping a default.

use std::time::Duration;

use beacon_presence::PresenceConfig;
use serde::Deserialize;

use crate::RelayError;

/// Configuration for a [`RelayServer`](crate::RelayServer).
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelayConfig {
    /// Address the WebSocket listener binds to.
    pub bind_addr: String,

    /// Base URL of the backend system of record.
    pub backend_url: String,

    /// Per-request timeout for backend HTTP calls, in seconds.
    pub backend_timeout_secs: u64,

    /// Reject WebSocket upgrades whose `Origin` header differs from
    /// this value. `None` accepts any origin.
    pub allowed_origin: Option<String>,

    /// How long an identity with zero connections stays in the grace
    /// window before being declared offline, in milliseconds.
    pub grace_period_ms: u64,

    /// How far ahead of credential expiry a refresh is requested, in
    /// seconds.
    pub refresh_margin_secs: u64,

    /// A connection that sends nothing for this long is dropped, in
    /// seconds. Disconnection then follows the normal grace path.
    pub heartbeat_timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:9200".to_string(),
            backend_url: "http://127.0.0.1:7350".to_string(),
            backend_timeout_secs: 10,
            allowed_origin: None,
            grace_period_ms: 2500,
            refresh_margin_secs: 60,
            heartbeat_timeout_secs: 60,
        }
    }
}

impl RelayConfig {
    /// Parses a config from TOML text. Missing keys take their
    /// defaults.
    pub fn from_toml_str(text: &str) -> Result<Self, RelayError> {
        Ok(toml::from_str(text)?)
    }

    /// The presence-layer view of this configuration.
    pub fn presence(&self) -> PresenceConfig {
        PresenceConfig {
            grace_period: Duration::from_millis(self.grace_period_ms),
            refresh_margin: Duration::from_secs(self.refresh_margin_secs),
        }
    }

    pub(crate) fn backend_timeout(&self) -> Duration {
        Duration::from_secs(self.backend_timeout_secs)
    }

    pub(crate) fn heartbeat_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_timeout_secs)
    }
}

// =========================================================================
// Tests
// =========================================================================
