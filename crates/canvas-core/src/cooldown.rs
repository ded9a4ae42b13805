//! Per-player edit cooldown.
//!
//! A cooldown is just an expiry instant: edits submitted before it are
//! rejected. All methods take `now` explicitly so callers (and tests)
//! decide what time it is.

use std::time::Duration;

use chrono::{DateTime, Utc};

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Cooldown {
    expires_at: DateTime<Utc>,
}

impl Cooldown {
    pub fn until(expires_at: DateTime<Utc>) -> Self {
        Cooldown { expires_at }
    }

    /// A cooldown that has already expired at `now`.
    pub fn expired(now: DateTime<Utc>) -> Self {
        Cooldown { expires_at: now }
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// `true` while edits must be rejected.
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn remaining(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).to_std().unwrap_or(Duration::ZERO)
    }

    /// Remaining whole seconds, rounded up and clamped to a byte.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> u8 {
        let remaining = self.remaining(now);
        let mut secs = remaining.as_secs();
        if remaining.subsec_nanos() > 0 {
            secs += 1;
        }
        secs.min(u64::from(u8::MAX)) as u8
    }

    /// The cooldown that starts after an accepted edit at `now`.
    pub fn armed(now: DateTime<Utc>, duration: Duration) -> Self {
        let expires_at = chrono::Duration::from_std(duration)
            .ok()
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Cooldown { expires_at }
    }

    pub fn later_of(self, other: Cooldown) -> Cooldown {
        self.max(other)
    }
}
