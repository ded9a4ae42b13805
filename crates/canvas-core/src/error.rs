//! Error types for the canvas core.
//!
//! The core API rejects bad input instead of corrupting state; every
//! rejection surfaces as a [`CanvasError`].

use std::fmt;

use crate::position::Position;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CanvasError {
    /// Position is addressable on the wire but outside this canvas.
    OutOfRange { position: Position, size: usize },

    /// Width or height of zero.
    InvalidDimensions { width: u8, height: u8 },
}

impl fmt::Display for CanvasError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CanvasError::OutOfRange { position, size } => {
                write!(f, "Position {} outside canvas of {} cells", position, size)
            }
            CanvasError::InvalidDimensions { width, height } => {
                write!(f, "Invalid canvas dimensions: {}x{}", width, height)
            }
        }
    }
}

impl std::error::Error for CanvasError {}
