//! Configuration for presence behavior.

use std::time::Duration;

/// Timing knobs for the presence engine.
///
/// Both values are deployment-specific and must come from configuration
/// rather than being baked into transition logic.
#[derive(Debug, Clone)]
pub struct PresenceConfig {
    /// How long a fully disconnected identity stays in the grace window
    /// before being declared offline to the backend and to friends.
    ///
    /// Absorbs page reloads and brief network drops. Default: 2.5 s.
    pub grace_period: Duration,

    /// How far before credential expiry the proactive refresh fires.
    ///
    /// A credential whose remaining lifetime is shorter than this is
    /// treated as unschedulable. Default: 60 s.
    pub refresh_margin: Duration,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            grace_period: Duration::from_millis(2500),
            refresh_margin: Duration::from_secs(60),
        }
    }
}
