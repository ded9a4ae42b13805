//! Linear cell addressing.
//!
//! Clients address a cell with a `(chunk, offset)` byte pair. The two
//! are combined into one linear index:
//!
//! ```text
//! position = chunk * CHUNK_SIZE + offset
//! ```
//!
//! so at most `256 * 256 = 65536` cells are addressable, whatever the
//! configured canvas dimensions are. Range checking against the actual
//! canvas size happens in [`CanvasState`](crate::CanvasState).

use std::fmt;

/// Cells per chunk.
pub const CHUNK_SIZE: usize = 256;

/// Linear index of a cell.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position(u16);

impl Position {
    pub fn new(index: u16) -> Self {
        Position(index)
    }

    /// Combine a wire `(chunk, offset)` pair.
    pub fn from_chunk_offset(chunk: u8, offset: u8) -> Self {
        Position((u16::from(chunk) << 8) | u16::from(offset))
    }

    /// Build from a `usize` index, if it is addressable at all.
    pub fn from_index(index: usize) -> Option<Self> {
        u16::try_from(index).ok().map(Position)
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn chunk(self) -> u8 {
        (self.0 >> 8) as u8
    }

    pub fn offset(self) -> u8 {
        (self.0 & 0xff) as u8
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.0, self.chunk(), self.offset())
    }
}
