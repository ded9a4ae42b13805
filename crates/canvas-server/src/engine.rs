//! Connection lifecycle.
//!
//! [`Engine`] ties together the canvas task, the player registry and the
//! cooldown store. Front ends (TCP, tests, embedders) hand it an
//! authenticated session plus a framed transport via [`Engine::serve`].

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use canvas_core::ServerMessage;
use canvas_protocol::{encode_server, ProtocolError};
use chrono::Utc;
use thiserror::Error;
use tokio::sync::{mpsc, watch, Notify};
use tracing::{debug, info, warn};

use crate::canvas_task::{CanvasHandle, CanvasTaskError};
use crate::config::Config;
use crate::cooldown::CooldownStore;
use crate::player::{run_writer, Player};
use crate::registry::{PlayerHandle, PlayerRegistry, SharedCooldown};
use crate::store::SharedStore;
use crate::transport::{FrameSink, FrameSource};
use crate::types::{ConnectionId, PlayerId};

/// How long a closing connection may spend flushing queued frames.
const WRITER_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("connection has no authenticated session")]
    Unauthenticated,

    #[error("server is full ({capacity} players)")]
    ServerFull { capacity: usize },

    #[error(transparent)]
    Canvas(#[from] CanvasTaskError),

    #[error("failed to encode frame: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Engine knobs taken from [`Config`].
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub cooldown: Duration,
    pub max_players: usize,
    pub outbound_capacity: usize,
}

impl From<&Config> for EngineSettings {
    fn from(config: &Config) -> Self {
        EngineSettings {
            cooldown: config.cooldown,
            max_players: config.max_players,
            outbound_capacity: config.outbound_capacity,
        }
    }
}

#[derive(Clone)]
pub struct Engine {
    canvas: CanvasHandle,
    registry: PlayerRegistry,
    cooldowns: CooldownStore,
    store: SharedStore,
    settings: EngineSettings,
    shutdown: watch::Receiver<bool>,
}

impl Engine {
    pub fn new(
        canvas: CanvasHandle,
        store: SharedStore,
        settings: EngineSettings,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Engine {
            canvas,
            registry: PlayerRegistry::new(),
            cooldowns: CooldownStore::new(store.clone()),
            store,
            settings,
            shutdown,
        }
    }

    pub fn canvas(&self) -> &CanvasHandle {
        &self.canvas
    }

    pub fn registry(&self) -> &PlayerRegistry {
        &self.registry
    }

    pub fn cooldowns(&self) -> &CooldownStore {
        &self.cooldowns
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Serve one connection until it closes, is evicted, or the process
    /// shuts down.
    ///
    /// `None` sessions and new players beyond `max_players` are refused
    /// before anything is registered.
    pub async fn serve<S, K>(
        &self,
        session: Option<PlayerId>,
        mut source: S,
        sink: K,
    ) -> Result<(), ServeError>
    where
        S: FrameSource,
        K: FrameSink + 'static,
    {
        let id = session.ok_or(ServeError::Unauthenticated)?;
        let connection = ConnectionId::next();

        let stored = self.cooldowns.load(&id, Utc::now()).await;
        let cooldown = SharedCooldown::new(stored);
        let (out_tx, out_rx) = mpsc::channel(self.settings.outbound_capacity);
        let kick = Arc::new(Notify::new());

        let handle = PlayerHandle {
            id: id.clone(),
            connection,
            outbound: out_tx,
            cooldown: cooldown.clone(),
            kick: kick.clone(),
        };

        let registration = self.registry.begin_registration().await;
        if !registration.admits(&id, self.settings.max_players) {
            warn!(
                player = %id,
                capacity = self.settings.max_players,
                "server full, refusing player"
            );
            return Err(ServeError::ServerFull {
                capacity: self.settings.max_players,
            });
        }

        // Queued before the handle becomes visible to broadcasts, so every
        // migration this player sees applies on top of this snapshot.
        let state = encode_frame(&ServerMessage::State(self.canvas.snapshot().await?))?;
        if let Err(e) = handle.outbound.try_send(state) {
            debug!(player = %id, %connection, error = %e, "could not queue greeting");
            return Ok(());
        }

        if let Some(evicted) = registration.insert(handle.clone()) {
            cooldown.set(stored.later_of(evicted.cooldown.get()));
            evicted.kick.notify_one();
            info!(
                player = %id,
                %connection,
                evicted = %evicted.connection,
                "player reconnected, evicting previous connection"
            );
        }
        info!(player = %id, %connection, "player registered");

        let mut writer = tokio::spawn(run_writer(
            id.clone(),
            connection,
            out_rx,
            sink,
            kick.clone(),
        ));

        let player = Player::new(
            id.clone(),
            connection,
            cooldown.clone(),
            self.settings.cooldown,
            self.cooldowns.clone(),
        );
        let outcome = self.run_player(&player, &handle, &mut source).await;

        if !self.registry.remove(&id, connection).await {
            debug!(player = %id, %connection, "connection was already replaced");
        }
        if let Err(e) = self.cooldowns.save(&id, cooldown.get()).await {
            warn!(player = %id, error = %e, "failed to persist cooldown");
        }

        drop(handle);
        if tokio::time::timeout(WRITER_DRAIN_TIMEOUT, &mut writer)
            .await
            .is_err()
        {
            writer.abort();
        }

        info!(player = %id, %connection, "player disconnected");
        outcome
    }

    async fn run_player<S: FrameSource>(
        &self,
        player: &Player,
        handle: &PlayerHandle,
        source: &mut S,
    ) -> Result<(), ServeError> {
        let counter = player_counter(self.registry.len().await);

        for frame in [
            player.state_frame(Utc::now())?,
            encode_frame(&ServerMessage::PlayerCounter(counter))?,
        ] {
            if !enqueue(handle, frame).await {
                return Ok(());
            }
        }

        let mut shutdown = self.shutdown.clone();
        loop {
            tokio::select! {
                frame = source.next_frame() => match frame {
                    Ok(Some(frame)) => {
                        if let Some(reply) = player.handle_frame(&frame, &self.canvas, Utc::now()).await? {
                            if !enqueue(handle, reply).await {
                                return Ok(());
                            }
                        }
                    }
                    Ok(None) => return Ok(()),
                    Err(e) => {
                        debug!(player = %player.id(), error = %e, "read failed");
                        return Ok(());
                    }
                },
                _ = handle.kick.notified() => {
                    debug!(player = %player.id(), connection = %player.connection(), "connection kicked");
                    return Ok(());
                }
                _ = shutdown_requested(&mut shutdown) => return Ok(()),
            }
        }
    }
}

/// Wait for room in the player's own queue. `false` if the player was
/// kicked or its writer is gone.
async fn enqueue(handle: &PlayerHandle, frame: Bytes) -> bool {
    tokio::select! {
        sent = handle.outbound.send(frame) => sent.is_ok(),
        _ = handle.kick.notified() => false,
    }
}

/// Resolves once shutdown has been signalled. Never resolves if the
/// sender is gone without signalling.
pub(crate) async fn shutdown_requested(rx: &mut watch::Receiver<bool>) {
    if rx.wait_for(|&stop| stop).await.is_err() {
        std::future::pending::<()>().await;
    }
}

pub(crate) fn encode_frame(msg: &ServerMessage) -> Result<Bytes, ProtocolError> {
    let mut out = Vec::new();
    encode_server(msg, &mut out)?;
    Ok(Bytes::from(out))
}

pub(crate) fn player_counter(count: usize) -> u32 {
    u32::try_from(count).unwrap_or(u32::MAX)
}
