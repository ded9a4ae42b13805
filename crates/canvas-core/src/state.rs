//! Canvas state orchestrator.
//!
//! Owns the grid and the pending diff together so that one lock (or one
//! owning task) covers both:
//! - [`CanvasState::apply_edit`] writes the cell and records the change.
//! - [`CanvasState::drain_diff`] hands over every recorded change and
//!   starts a fresh, empty batch.
//!
//! Because both halves live behind the same `&mut self`, an edit lands
//! either before a drain (and is returned by it) or after it (and waits
//! for the next one). It can never be lost or returned twice.

use crate::canvas::{Canvas, LoadOutcome};
use crate::color::Color;
use crate::diff::PendingDiff;
use crate::error::CanvasError;
use crate::position::Position;

/// Full copy of the canvas at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub width: u8,
    pub height: u8,
    pub cells: Vec<Color>,
}

impl Snapshot {
    /// One byte per cell, in position order.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.cells.iter().map(|c| c.as_u8()).collect()
    }
}

#[derive(Debug, Clone)]
pub struct CanvasState {
    canvas: Canvas,
    pending: PendingDiff,
}

impl CanvasState {
    /// Blank canvas with nothing pending.
    pub fn new(width: u8, height: u8) -> Result<Self, CanvasError> {
        Ok(CanvasState::from_canvas(Canvas::new(width, height)?))
    }

    /// See [`Canvas::load`].
    pub fn load(
        width: u8,
        height: u8,
        blob: Option<&[u8]>,
    ) -> Result<(Self, LoadOutcome), CanvasError> {
        let (canvas, outcome) = Canvas::load(width, height, blob)?;
        Ok((CanvasState::from_canvas(canvas), outcome))
    }

    pub fn from_canvas(canvas: Canvas) -> Self {
        CanvasState {
            canvas,
            pending: PendingDiff::new(),
        }
    }

    /// Set one cell and upsert it into the pending diff.
    ///
    /// Out-of-range positions are rejected and neither the grid nor the
    /// diff is touched.
    pub fn apply_edit(&mut self, position: Position, color: Color) -> Result<(), CanvasError> {
        self.canvas.set(position, color)?;
        self.pending.record(position, color);
        Ok(())
    }

    /// Take the pending diff, leaving an empty one behind.
    pub fn drain_diff(&mut self) -> PendingDiff {
        std::mem::take(&mut self.pending)
    }

    pub fn pending(&self) -> &PendingDiff {
        &self.pending
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            width: self.canvas.width(),
            height: self.canvas.height(),
            cells: self.canvas.cells().to_vec(),
        }
    }

    pub fn snapshot_bytes(&self) -> Vec<u8> {
        self.canvas.to_bytes()
    }

    pub fn color_at(&self, position: Position) -> Option<Color> {
        self.canvas.get(position)
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn size(&self) -> usize {
        self.canvas.size()
    }

    pub fn width(&self) -> u8 {
        self.canvas.width()
    }

    pub fn height(&self) -> u8 {
        self.canvas.height()
    }
}
