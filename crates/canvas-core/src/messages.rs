//! Message types exchanged between the canvas server and its clients.
//!
//! These are **transport-agnostic** logical messages:
//! - [`ClientMessage`]: what a client may send.
//! - [`ServerMessage`]: what the server pushes to clients.
//!
//! Note: the binary encoder lives in the `canvas-protocol` crate;
//! this module is purely logical.

use crate::color::Color;
use crate::diff::PendingDiff;
use crate::position::Position;
use crate::state::Snapshot;

/// A request from a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    /// Paint one cell.
    Edit { position: Position, color: Color },
}

/// An event pushed to a client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Full canvas, sent on connect and on every resync.
    State(Snapshot),

    /// Cells changed since the previous migration.
    StateMigration(Vec<(Position, Color)>),

    /// Seconds until the recipient may edit again (0 = now).
    PlayerState { cooldown_secs: u8 },

    /// Number of connected players.
    PlayerCounter(u32),
}

impl ServerMessage {
    pub fn migration(diff: PendingDiff) -> Self {
        ServerMessage::StateMigration(diff.into_changes())
    }
}
