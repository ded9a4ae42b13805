//! Per-connection player logic.
//!
//! - [`Player::admit`] is the edit gate: it decodes an inbound frame and
//!   checks the cooldown, without touching the canvas.
//! - [`Player::handle_frame`] applies admitted edits and builds the reply.
//! - [`run_writer`] drains a player's outbound queue into its transport.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use canvas_core::{ClientMessage, Color, Cooldown, Position, ServerMessage};
use canvas_protocol::decode_client;
use chrono::{DateTime, Utc};
use tokio::sync::Notify;
use tracing::{debug, warn};

use crate::canvas_task::{CanvasHandle, CanvasTaskError};
use crate::cooldown::CooldownStore;
use crate::engine::{encode_frame, ServeError};
use crate::registry::SharedCooldown;
use crate::transport::FrameSink;
use crate::types::{ConnectionId, OutboundRx, PlayerId};

/// What the gate decided about one inbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Not an edit request; dropped without reply.
    Ignored,
    /// A well-formed edit arrived while the cooldown was still running.
    CoolingDown { remaining_secs: u8 },
    /// The edit may be applied.
    Edit { position: Position, color: Color },
}

#[derive(Clone)]
pub struct Player {
    id: PlayerId,
    connection: ConnectionId,
    cooldown: SharedCooldown,
    cooldown_duration: Duration,
    cooldowns: CooldownStore,
}

impl Player {
    pub fn new(
        id: PlayerId,
        connection: ConnectionId,
        cooldown: SharedCooldown,
        cooldown_duration: Duration,
        cooldowns: CooldownStore,
    ) -> Self {
        Player {
            id,
            connection,
            cooldown,
            cooldown_duration,
            cooldowns,
        }
    }

    pub fn id(&self) -> &PlayerId {
        &self.id
    }

    pub fn connection(&self) -> ConnectionId {
        self.connection
    }

    pub fn cooldown(&self) -> Cooldown {
        self.cooldown.get()
    }

    pub fn admit(&self, frame: &[u8], now: DateTime<Utc>) -> Admission {
        let (position, color) = match decode_client(frame) {
            Ok(ClientMessage::Edit { position, color }) => (position, color),
            Err(e) => {
                debug!(player = %self.id, error = %e, "ignoring malformed frame");
                return Admission::Ignored;
            }
        };

        let cooldown = self.cooldown.get();
        if cooldown.is_active(now) {
            return Admission::CoolingDown {
                remaining_secs: cooldown.remaining_secs(now),
            };
        }

        Admission::Edit { position, color }
    }

    /// Run one inbound frame through the gate and the canvas.
    ///
    /// Returns the frame to send back to this player, if any. Edits outside
    /// the canvas are dropped like malformed frames and do not arm the
    /// cooldown. An accepted edit writes the new cooldown through to the
    /// store before replying.
    pub async fn handle_frame(
        &self,
        frame: &[u8],
        canvas: &CanvasHandle,
        now: DateTime<Utc>,
    ) -> Result<Option<Bytes>, ServeError> {
        match self.admit(frame, now) {
            Admission::Ignored => Ok(None),
            Admission::CoolingDown { remaining_secs } => {
                debug!(player = %self.id, remaining_secs, "edit rejected by cooldown");
                Ok(Some(player_state_frame(remaining_secs)?))
            }
            Admission::Edit { position, color } => {
                match canvas.apply_edit(position, color).await {
                    Ok(()) => {}
                    Err(CanvasTaskError::Rejected(e)) => {
                        debug!(player = %self.id, error = %e, "ignoring edit");
                        return Ok(None);
                    }
                    Err(e) => return Err(e.into()),
                }

                let armed = Cooldown::armed(now, self.cooldown_duration);
                self.cooldown.set(armed);
                if let Err(e) = self.cooldowns.save(&self.id, armed).await {
                    warn!(player = %self.id, error = %e, "failed to persist cooldown");
                }
                debug!(player = %self.id, %position, ?color, "edit applied");
                Ok(Some(player_state_frame(armed.remaining_secs(now))?))
            }
        }
    }

    /// Current cooldown feedback for this player.
    pub fn state_frame(&self, now: DateTime<Utc>) -> Result<Bytes, ServeError> {
        player_state_frame(self.cooldown.get().remaining_secs(now))
    }
}

fn player_state_frame(cooldown_secs: u8) -> Result<Bytes, ServeError> {
    Ok(encode_frame(&ServerMessage::PlayerState { cooldown_secs })?)
}

/// Drain `rx` into `sink` in FIFO order.
///
/// The first write failure kicks the player; the sink is closed once the
/// queue ends.
pub async fn run_writer<K: FrameSink>(
    id: PlayerId,
    connection: ConnectionId,
    mut rx: OutboundRx,
    mut sink: K,
    kick: Arc<Notify>,
) {
    while let Some(frame) = rx.recv().await {
        if let Err(e) = sink.send_frame(frame).await {
            debug!(player = %id, %connection, error = %e, "write failed");
            kick.notify_one();
            break;
        }
    }

    if let Err(e) = sink.close().await {
        debug!(player = %id, %connection, error = %e, "close failed");
    }
}
