//! Binary encoding/decoding for canvas messages.
//!
//! This module converts between:
//! - raw binary frames (`&[u8]`)
//! - high-level `canvas_core::ClientMessage` / `ServerMessage`
//!
//! Framing model (single-message buffer, first byte = kind):
//!
//! ```text
//! Server → client
//! ---------------
//! State (kind=0):
//!   [1]      width  (cells)
//!   [2]      height (cells)
//!   [3..]    width*height color bytes, position order
//!
//! StateMigration (kind=1):
//!   [1..]    one or more (chunk, offset, color) triples
//!
//! PlayerState (kind=2):
//!   [1]      cooldown seconds remaining (0 = may edit now)
//!
//! PlayerCounter (kind=3):
//!   [1..5]   connected players (u32 LE)
//!
//! Client → server
//! ---------------
//! Edit (kind=1), exactly 4 bytes:
//!   [1]      chunk
//!   [2]      offset
//!   [3]      color
//! ```
//!
//! Every frame has one exact valid length. Decoders reject anything else
//! as a whole; nothing is partially decoded.
//!
//! NOTE: This module encodes/decodes **one message per buffer**. The
//! transport is expected to provide its own framing.

use std::fmt;

use canvas_core::{ClientMessage, Color, Position, ServerMessage, Snapshot};

use crate::wire_types::{
    is_valid_migration_len, state_frame_len, MessageKind, EDIT_REQUEST_LEN, MIGRATION_ENTRY_LEN,
    PLAYER_COUNTER_LEN, PLAYER_STATE_LEN, STATE_HEADER_LEN,
};

/// Errors that can arise when encoding/decoding a binary frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Empty buffer.
    Empty,
    /// Unknown or unsupported message kind.
    UnknownMessageType(u8),
    /// Frame length does not match the kind's exact layout.
    InvalidLength { kind: MessageKind, len: usize },
    /// Color byte outside the palette.
    InvalidColor(u8),
    /// Message cannot be represented on the wire.
    InvalidField(&'static str),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Empty => write!(f, "Empty frame"),
            ProtocolError::UnknownMessageType(t) => write!(f, "Unknown message type: {}", t),
            ProtocolError::InvalidLength { kind, len } => {
                write!(f, "Invalid length {} for {:?} frame", len, kind)
            }
            ProtocolError::InvalidColor(c) => write!(f, "Invalid color: {}", c),
            ProtocolError::InvalidField(field) => write!(f, "Invalid field: {}", field),
        }
    }
}

impl std::error::Error for ProtocolError {}

// ============================================================================
// CLIENT: client → server
// ============================================================================

/// Decode a single client frame.
///
/// Only the 4-byte edit request exists; any other length or kind is
/// rejected.
pub fn decode_client(buf: &[u8]) -> Result<ClientMessage, ProtocolError> {
    let kind_byte = *buf.first().ok_or(ProtocolError::Empty)?;

    match MessageKind::from_u8(kind_byte) {
        Some(MessageKind::StateMigration) => {}
        _ => return Err(ProtocolError::UnknownMessageType(kind_byte)),
    }

    if buf.len() != EDIT_REQUEST_LEN {
        return Err(ProtocolError::InvalidLength {
            kind: MessageKind::StateMigration,
            len: buf.len(),
        });
    }

    Ok(ClientMessage::Edit {
        position: Position::from_chunk_offset(buf[1], buf[2]),
        color: read_color(buf[3])?,
    })
}

/// Encode a single client message into a binary frame.
///
/// The encoded bytes are appended to `out`.
pub fn encode_client(msg: &ClientMessage, out: &mut Vec<u8>) -> Result<(), ProtocolError> {
    match msg {
        ClientMessage::Edit { position, color } => {
            out.push(MessageKind::StateMigration as u8);
            out.push(position.chunk());
            out.push(position.offset());
            out.push(color.as_u8());
            Ok(())
        }
    }
}

// ============================================================================
// SERVER: server → client
// ============================================================================

/// Encode a single server message into a binary frame.
///
/// The encoded bytes are appended to `out`.
pub fn encode_server(msg: &ServerMessage, out: &mut Vec<u8>) -> Result<(), ProtocolError> {
    match msg {
        ServerMessage::State(snapshot) => encode_state(snapshot, out),
        ServerMessage::StateMigration(changes) => encode_migration(changes, out),
        ServerMessage::PlayerState { cooldown_secs } => {
            out.push(MessageKind::PlayerState as u8);
            out.push(*cooldown_secs);
            Ok(())
        }
        ServerMessage::PlayerCounter(count) => {
            out.push(MessageKind::PlayerCounter as u8);
            out.extend_from_slice(&count.to_le_bytes());
            Ok(())
        }
    }
}

/// Decode a single server frame.
///
/// This is useful on the **client** side when reading from the server.
pub fn decode_server(buf: &[u8]) -> Result<ServerMessage, ProtocolError> {
    let kind_byte = *buf.first().ok_or(ProtocolError::Empty)?;
    let kind =
        MessageKind::from_u8(kind_byte).ok_or(ProtocolError::UnknownMessageType(kind_byte))?;

    match kind {
        MessageKind::State => decode_state(buf),
        MessageKind::StateMigration => decode_migration(buf),
        MessageKind::PlayerState => {
            expect_len(kind, buf, PLAYER_STATE_LEN)?;
            Ok(ServerMessage::PlayerState {
                cooldown_secs: buf[1],
            })
        }
        MessageKind::PlayerCounter => {
            expect_len(kind, buf, PLAYER_COUNTER_LEN)?;
            Ok(ServerMessage::PlayerCounter(u32::from_le_bytes([
                buf[1], buf[2], buf[3], buf[4],
            ])))
        }
    }
}

fn encode_state(snapshot: &Snapshot, out: &mut Vec<u8>) -> Result<(), ProtocolError> {
    if snapshot.cells.len() != snapshot.width as usize * snapshot.height as usize {
        return Err(ProtocolError::InvalidField("cells"));
    }

    out.reserve(state_frame_len(snapshot.width, snapshot.height));
    out.push(MessageKind::State as u8);
    out.push(snapshot.width);
    out.push(snapshot.height);
    out.extend(snapshot.cells.iter().map(|c| c.as_u8()));

    Ok(())
}

fn encode_migration(changes: &[(Position, Color)], out: &mut Vec<u8>) -> Result<(), ProtocolError> {
    if changes.is_empty() {
        return Err(ProtocolError::InvalidField("changes"));
    }

    out.reserve(1 + changes.len() * MIGRATION_ENTRY_LEN);
    out.push(MessageKind::StateMigration as u8);
    for (position, color) in changes {
        out.push(position.chunk());
        out.push(position.offset());
        out.push(color.as_u8());
    }

    Ok(())
}

fn decode_state(buf: &[u8]) -> Result<ServerMessage, ProtocolError> {
    if buf.len() < STATE_HEADER_LEN {
        return Err(ProtocolError::InvalidLength {
            kind: MessageKind::State,
            len: buf.len(),
        });
    }

    let width = buf[1];
    let height = buf[2];
    expect_len(MessageKind::State, buf, state_frame_len(width, height))?;

    let cells = buf[STATE_HEADER_LEN..]
        .iter()
        .map(|&b| read_color(b))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ServerMessage::State(Snapshot {
        width,
        height,
        cells,
    }))
}

fn decode_migration(buf: &[u8]) -> Result<ServerMessage, ProtocolError> {
    if !is_valid_migration_len(buf.len()) {
        return Err(ProtocolError::InvalidLength {
            kind: MessageKind::StateMigration,
            len: buf.len(),
        });
    }

    let changes = buf[1..]
        .chunks_exact(MIGRATION_ENTRY_LEN)
        .map(|entry| {
            let color = read_color(entry[2])?;
            Ok((Position::from_chunk_offset(entry[0], entry[1]), color))
        })
        .collect::<Result<Vec<_>, ProtocolError>>()?;

    Ok(ServerMessage::StateMigration(changes))
}

// -----------------------------------------------------------------------------
// Helpers
// -----------------------------------------------------------------------------

fn expect_len(kind: MessageKind, buf: &[u8], len: usize) -> Result<(), ProtocolError> {
    if buf.len() == len {
        Ok(())
    } else {
        Err(ProtocolError::InvalidLength {
            kind,
            len: buf.len(),
        })
    }
}

fn read_color(b: u8) -> Result<Color, ProtocolError> {
    Color::from_u8(b).ok_or(ProtocolError::InvalidColor(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(msg: &ServerMessage) -> Vec<u8> {
        let mut out = Vec::new();
        encode_server(msg, &mut out).unwrap();
        out
    }

    #[test]
    fn player_state_layout() {
        let frame = encode(&ServerMessage::PlayerState { cooldown_secs: 5 });
        assert_eq!(frame, vec![2, 5]);
    }

    #[test]
    fn player_counter_is_little_endian() {
        let frame = encode(&ServerMessage::PlayerCounter(0x0102_0304));
        assert_eq!(frame, vec![3, 0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn migration_layout_uses_chunk_and_offset() {
        let frame = encode(&ServerMessage::StateMigration(vec![
            (Position::new(0), Color::Green),
            (Position::from_chunk_offset(2, 17), Color::Black),
        ]));
        assert_eq!(frame, vec![1, 0, 0, 1, 2, 17, 9]);
    }

    #[test]
    fn empty_migration_is_not_encodable() {
        let mut out = Vec::new();
        let err = encode_server(&ServerMessage::StateMigration(vec![]), &mut out).unwrap_err();
        assert_eq!(err, ProtocolError::InvalidField("changes"));
        assert!(out.is_empty());
    }

    #[test]
    fn state_with_mismatched_cells_is_not_encodable() {
        let snapshot = Snapshot {
            width: 2,
            height: 2,
            cells: vec![Color::White; 3],
        };
        let mut out = Vec::new();
        assert!(encode_server(&ServerMessage::State(snapshot), &mut out).is_err());
    }

    #[test]
    fn edit_request_must_be_exactly_four_bytes() {
        assert!(decode_client(&[1, 0, 0, 1]).is_ok());
        assert_eq!(
            decode_client(&[1, 0, 0]),
            Err(ProtocolError::InvalidLength {
                kind: MessageKind::StateMigration,
                len: 3
            })
        );
        assert!(decode_client(&[1, 0, 0, 1, 0]).is_err());
        assert_eq!(decode_client(&[]), Err(ProtocolError::Empty));
    }

    #[test]
    fn edit_request_with_other_kind_is_rejected() {
        assert_eq!(
            decode_client(&[0, 0, 0, 1]),
            Err(ProtocolError::UnknownMessageType(0))
        );
        assert_eq!(
            decode_client(&[7, 0, 0, 1]),
            Err(ProtocolError::UnknownMessageType(7))
        );
    }

    #[test]
    fn edit_request_with_bad_color_is_rejected() {
        assert_eq!(decode_client(&[1, 0, 0, 10]), Err(ProtocolError::InvalidColor(10)));
    }
}
