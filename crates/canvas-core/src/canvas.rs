//! The grid of cell colors.
//!
//! A `Canvas` is a fixed-size, row-major sequence of [`Color`]s. Its
//! size is decided once at construction and never changes; every cell
//! always holds exactly one color.

use crate::color::Color;
use crate::error::CanvasError;
use crate::position::Position;

/// Why [`Canvas::load`] ended up with the contents it has.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The persisted blob was valid and was decoded cell by cell.
    Restored,
    /// Nothing was persisted; the canvas is blank.
    Missing,
    /// A blob was present but unusable; the canvas is blank.
    Corrupt,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    width: u8,
    height: u8,
    cells: Vec<Color>,
}

impl Canvas {
    /// Create a blank canvas (every cell the default color).
    pub fn new(width: u8, height: u8) -> Result<Self, CanvasError> {
        if width == 0 || height == 0 {
            return Err(CanvasError::InvalidDimensions { width, height });
        }

        Ok(Canvas {
            width,
            height,
            cells: vec![Color::default(); width as usize * height as usize],
        })
    }

    /// Build a canvas from an optional persisted blob.
    ///
    /// The blob is used only if it holds exactly `width * height` valid
    /// color bytes. Anything else falls back to a blank canvas; a bad
    /// blob is never partially applied.
    pub fn load(
        width: u8,
        height: u8,
        blob: Option<&[u8]>,
    ) -> Result<(Self, LoadOutcome), CanvasError> {
        let mut canvas = Canvas::new(width, height)?;

        let Some(bytes) = blob else {
            return Ok((canvas, LoadOutcome::Missing));
        };

        if bytes.len() != canvas.size() {
            return Ok((canvas, LoadOutcome::Corrupt));
        }

        let decoded: Option<Vec<Color>> = bytes.iter().map(|&b| Color::from_u8(b)).collect();
        match decoded {
            Some(cells) => {
                canvas.cells = cells;
                Ok((canvas, LoadOutcome::Restored))
            }
            None => Ok((canvas, LoadOutcome::Corrupt)),
        }
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn height(&self) -> u8 {
        self.height
    }

    /// Number of cells (`width * height`).
    pub fn size(&self) -> usize {
        self.cells.len()
    }

    pub fn contains(&self, position: Position) -> bool {
        position.index() < self.cells.len()
    }

    pub fn get(&self, position: Position) -> Option<Color> {
        self.cells.get(position.index()).copied()
    }

    /// Overwrite one cell. Out-of-range positions are rejected untouched.
    pub fn set(&mut self, position: Position, color: Color) -> Result<(), CanvasError> {
        let size = self.cells.len();
        match self.cells.get_mut(position.index()) {
            Some(cell) => {
                *cell = color;
                Ok(())
            }
            None => Err(CanvasError::OutOfRange { position, size }),
        }
    }

    pub fn cells(&self) -> &[Color] {
        &self.cells
    }

    /// One byte per cell, in position order.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.cells.iter().map(|c| c.as_u8()).collect()
    }
}
