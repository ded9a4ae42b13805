//! Registry of connected players.
//!
//! Maps each `PlayerId` to the handle of its live connection. At most one
//! connection per id is registered; a newer connection evicts the older
//! one (see [`PlayerRegistry::try_register`]).

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use bytes::Bytes;
use canvas_core::Cooldown;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{Notify, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::warn;

use crate::types::{ConnectionId, OutboundTx, PlayerId};

/// Cooldown readable from outside the owning player task.
#[derive(Debug, Clone)]
pub struct SharedCooldown(Arc<Mutex<Cooldown>>);

impl SharedCooldown {
    pub fn new(cooldown: Cooldown) -> Self {
        SharedCooldown(Arc::new(Mutex::new(cooldown)))
    }

    pub fn get(&self) -> Cooldown {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set(&self, cooldown: Cooldown) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = cooldown;
    }
}

/// Everything other tasks need to reach one connected player.
#[derive(Debug, Clone)]
pub struct PlayerHandle {
    pub id: PlayerId,
    pub connection: ConnectionId,
    pub outbound: OutboundTx,
    pub cooldown: SharedCooldown,
    pub kick: Arc<Notify>,
}

impl PlayerHandle {
    /// Queue `frame` without waiting. A full queue kicks the player.
    fn deliver(&self, frame: Bytes) -> bool {
        match self.outbound.try_send(frame) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                warn!(
                    player = %self.id,
                    connection = %self.connection,
                    "outbound queue full, disconnecting slow player"
                );
                self.kick.notify_one();
                false
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegistryFull;

type Players = HashMap<PlayerId, PlayerHandle>;

/// Read view of the registry. Nobody can join or leave while it is held,
/// so a count taken from it matches the set of players a broadcast reaches.
pub struct RegistryView<'a> {
    players: RwLockReadGuard<'a, Players>,
}

impl RegistryView<'_> {
    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Queue `frame` for every player in the view. Returns how many accepted it.
    pub fn broadcast(&self, frame: Bytes) -> usize {
        self.players
            .values()
            .filter(|handle| handle.deliver(frame.clone()))
            .count()
    }
}

/// Exclusive hold on the registry for one registration.
///
/// Broadcasts wait until it is dropped, so anything queued on the new
/// handle before [`Registration::insert`] reaches the player first.
pub struct Registration<'a> {
    players: RwLockWriteGuard<'a, Players>,
}

impl Registration<'_> {
    /// `false` when `id` is new and `capacity` players are registered.
    /// A replacement never counts against `capacity`.
    pub fn admits(&self, id: &PlayerId, capacity: usize) -> bool {
        self.players.contains_key(id) || self.players.len() < capacity
    }

    /// Insert `handle` and release the registry, returning the handle it
    /// replaced, if any.
    pub fn insert(mut self, handle: PlayerHandle) -> Option<PlayerHandle> {
        self.players.insert(handle.id.clone(), handle)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlayerRegistry {
    players: Arc<RwLock<Players>>,
}

impl PlayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `handle`, returning the handle it replaced, if any.
    ///
    /// A replacement never counts against `capacity`; a new id is refused
    /// once `capacity` players are registered.
    pub async fn try_register(
        &self,
        handle: PlayerHandle,
        capacity: usize,
    ) -> Result<Option<PlayerHandle>, RegistryFull> {
        let registration = self.begin_registration().await;
        if !registration.admits(&handle.id, capacity) {
            return Err(RegistryFull);
        }
        Ok(registration.insert(handle))
    }

    pub async fn begin_registration(&self) -> Registration<'_> {
        Registration {
            players: self.players.write().await,
        }
    }

    pub async fn view(&self) -> RegistryView<'_> {
        RegistryView {
            players: self.players.read().await,
        }
    }

    /// Remove `id` only if it still belongs to `connection`.
    pub async fn remove(&self, id: &PlayerId, connection: ConnectionId) -> bool {
        let mut guard = self.players.write().await;
        match guard.get(id) {
            Some(handle) if handle.connection == connection => {
                guard.remove(id);
                true
            }
            _ => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.players.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.players.read().await.is_empty()
    }

    pub async fn contains(&self, id: &PlayerId) -> bool {
        self.players.read().await.contains_key(id)
    }

    pub async fn handles(&self) -> Vec<PlayerHandle> {
        self.players.read().await.values().cloned().collect()
    }

    /// Queue `frame` for every registered player. Returns how many accepted it.
    pub async fn broadcast(&self, frame: Bytes) -> usize {
        self.view().await.broadcast(frame)
    }

    pub async fn send_to(&self, id: &PlayerId, frame: Bytes) -> bool {
        let guard = self.players.read().await;
        guard.get(id).is_some_and(|handle| handle.deliver(frame))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tokio::sync::mpsc;

    use crate::types::OutboundRx;

    fn handle(id: &str, capacity: usize) -> (PlayerHandle, OutboundRx) {
        let (tx, rx) = mpsc::channel(capacity);
        let handle = PlayerHandle {
            id: PlayerId::new(id),
            connection: ConnectionId::next(),
            outbound: tx,
            cooldown: SharedCooldown::new(Cooldown::expired(Utc::now())),
            kick: Arc::new(Notify::new()),
        };
        (handle, rx)
    }

    #[tokio::test]
    async fn duplicate_id_replaces_and_returns_the_old_handle() {
        let registry = PlayerRegistry::new();
        let (first, _rx1) = handle("alice", 4);
        let (second, _rx2) = handle("alice", 4);
        let first_conn = first.connection;

        assert!(registry.try_register(first, 10).await.unwrap().is_none());
        let evicted = registry.try_register(second.clone(), 10).await.unwrap();

        assert_eq!(evicted.map(|h| h.connection), Some(first_conn));
        assert_eq!(registry.len().await, 1);
        let live: Vec<ConnectionId> = registry
            .handles()
            .await
            .iter()
            .map(|h| h.connection)
            .collect();
        assert_eq!(live, vec![second.connection]);

        // The stale connection cannot remove its replacement.
        assert!(!registry.remove(&second.id, first_conn).await);
        assert!(registry.contains(&second.id).await);
        assert!(registry.remove(&second.id, second.connection).await);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn new_ids_are_refused_at_capacity() {
        let registry = PlayerRegistry::new();
        let (a, _ra) = handle("a", 4);
        let (b, _rb) = handle("b", 4);
        let (a2, _ra2) = handle("a", 4);

        registry.try_register(a, 1).await.unwrap();
        assert_eq!(registry.try_register(b, 1).await.unwrap_err(), RegistryFull);
        assert!(registry.try_register(a2, 1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn broadcast_reaches_every_player() {
        let registry = PlayerRegistry::new();
        let (a, mut ra) = handle("a", 4);
        let (b, mut rb) = handle("b", 4);
        registry.try_register(a, 10).await.unwrap();
        registry.try_register(b, 10).await.unwrap();

        let delivered = registry.broadcast(Bytes::from_static(&[3, 2, 0, 0, 0])).await;

        assert_eq!(delivered, 2);
        assert_eq!(ra.recv().await.unwrap(), &[3, 2, 0, 0, 0][..]);
        assert_eq!(rb.recv().await.unwrap(), &[3, 2, 0, 0, 0][..]);
    }

    #[tokio::test]
    async fn registration_waits_for_an_open_view() {
        let registry = PlayerRegistry::new();
        let (a, mut ra) = handle("a", 4);
        let (b, mut rb) = handle("b", 4);
        registry.try_register(a, 10).await.unwrap();

        let view = registry.view().await;
        let joining = tokio::spawn({
            let registry = registry.clone();
            async move { registry.try_register(b, 10).await }
        });
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!joining.is_finished());

        let count = view.len();
        assert_eq!(view.broadcast(Bytes::from_static(&[4, 0, 0, 0, 1])), count);
        drop(view);

        joining.await.unwrap().unwrap();
        assert_eq!(registry.len().await, 2);
        assert_eq!(ra.recv().await.unwrap(), &[4, 0, 0, 0, 1][..]);
        assert!(rb.try_recv().is_err());
    }

    #[tokio::test]
    async fn frames_queued_during_registration_come_first() {
        let registry = PlayerRegistry::new();
        let (a, mut ra) = handle("a", 4);

        let registration = registry.begin_registration().await;
        assert!(registration.admits(&a.id, 1));
        let broadcaster = tokio::spawn({
            let registry = registry.clone();
            async move { registry.broadcast(Bytes::from_static(b"later")).await }
        });
        tokio::task::yield_now().await;
        a.outbound.try_send(Bytes::from_static(b"first")).unwrap();
        assert!(registration.insert(a).is_none());

        assert_eq!(broadcaster.await.unwrap(), 1);
        assert_eq!(ra.recv().await.unwrap(), &b"first"[..]);
        assert_eq!(ra.recv().await.unwrap(), &b"later"[..]);
    }

    #[tokio::test]
    async fn full_queue_kicks_the_player() {
        let registry = PlayerRegistry::new();
        let (slow, _rx) = handle("slow", 1);
        let kick = slow.kick.clone();
        registry.try_register(slow, 10).await.unwrap();

        assert!(registry.send_to(&PlayerId::new("slow"), Bytes::from_static(b"1")).await);
        assert!(!registry.send_to(&PlayerId::new("slow"), Bytes::from_static(b"2")).await);

        // The kick left a permit behind.
        tokio::time::timeout(std::time::Duration::from_secs(1), kick.notified())
            .await
            .unwrap();
    }
}
