//! Low-level wire types and constants.
//!
//! This module defines:
//! - Message kind IDs (first byte of every frame).
//! - Exact frame sizes for the fixed-length frames.
//!
//! The actual encode/decode logic lives in `binary_codec`.

/// Message kinds, shared by both directions.
///
/// A client edit request reuses [`MessageKind::StateMigration`]: it is a
/// one-cell migration proposed by the client.
#[repr(u8)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MessageKind {
    /// Full canvas snapshot.
    State = 0,

    /// Batched cell changes.
    StateMigration = 1,

    /// Per-player cooldown feedback.
    PlayerState = 2,

    /// Connected player count.
    PlayerCounter = 3,
}

impl MessageKind {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(MessageKind::State),
            1 => Some(MessageKind::StateMigration),
            2 => Some(MessageKind::PlayerState),
            3 => Some(MessageKind::PlayerCounter),
            _ => None,
        }
    }
}

/// `[kind, width, height]` before the cells of a State frame.
pub const STATE_HEADER_LEN: usize = 3;

/// `(chunk, offset, color)` per migrated cell.
pub const MIGRATION_ENTRY_LEN: usize = 3;

/// `[kind, seconds]`.
pub const PLAYER_STATE_LEN: usize = 2;

/// `[kind, count (u32 LE)]`.
pub const PLAYER_COUNTER_LEN: usize = 5;

/// `[kind, chunk, offset, color]`.
pub const EDIT_REQUEST_LEN: usize = 4;

/// Exact length of a State frame for the given dimensions.
pub fn state_frame_len(width: u8, height: u8) -> usize {
    STATE_HEADER_LEN + width as usize * height as usize
}

/// A migration frame carries one or more whole entries after the kind byte.
pub fn is_valid_migration_len(len: usize) -> bool {
    len > 1 && (len - 1) % MIGRATION_ENTRY_LEN == 0
}
