use std::time::Duration;
use tokio::time::Instant;

/// Tracks the window during which another registration repair is refused.
///
/// A repair recorded via [`record`](Self::record) blocks further repairs until
/// [`remaining`](Self::remaining) returns `None`.
#[derive(Debug)]
pub struct RepairCooldown {
    window: Duration,
    last_repair: Option<Instant>,
}

impl RepairCooldown {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_repair: None,
        }
    }

    pub fn record(&mut self) {
        self.last_repair = Some(Instant::now());
    }

    /// Time left before another repair is allowed, or `None` if one may run now.
    pub fn remaining(&self) -> Option<Duration> {
        let expires_at = self.last_repair? + self.window;
        let now = Instant::now();
        (now < expires_at).then(|| expires_at - now)
    }
}

/// Whole seconds, rounded up so "0s" is never shown while still cooling down.
pub(super) fn ceil_secs(duration: Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}
