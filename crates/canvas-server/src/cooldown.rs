//! Durable per-player cooldowns.
//!
//! Expiries are stored as RFC 3339 text under `cooldown:<player id>`.

use canvas_core::Cooldown;
use chrono::{DateTime, Utc};
use tracing::warn;

use crate::store::{cooldown_key, SharedStore, StoreError};
use crate::types::PlayerId;

#[derive(Clone)]
pub struct CooldownStore {
    store: SharedStore,
}

impl CooldownStore {
    pub fn new(store: SharedStore) -> Self {
        CooldownStore { store }
    }

    /// Stored cooldown for `id`, or an already-expired one.
    ///
    /// Never fails: a missing record means the player may edit now, and an
    /// unreadable one is logged and treated the same way.
    pub async fn load(&self, id: &PlayerId, now: DateTime<Utc>) -> Cooldown {
        let key = cooldown_key(id);
        match self.store.get(&key).await {
            Ok(Some(bytes)) => match parse_expiry(&bytes) {
                Some(expires_at) => Cooldown::until(expires_at),
                None => {
                    warn!(player = %id, "unparsable cooldown record, ignoring it");
                    Cooldown::expired(now)
                }
            },
            Ok(None) => Cooldown::expired(now),
            Err(e) => {
                warn!(player = %id, error = %e, "failed to read cooldown, ignoring it");
                Cooldown::expired(now)
            }
        }
    }

    pub async fn save(&self, id: &PlayerId, cooldown: Cooldown) -> Result<(), StoreError> {
        let value = cooldown.expires_at().to_rfc3339();
        self.store.set(&cooldown_key(id), value.into_bytes()).await
    }
}

fn parse_expiry(bytes: &[u8]) -> Option<DateTime<Utc>> {
    let text = std::str::from_utf8(bytes).ok()?;
    DateTime::parse_from_rfc3339(text.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
