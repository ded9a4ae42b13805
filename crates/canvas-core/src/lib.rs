//! canvas-core
//!
//! Pure canvas logic:
//! - colors and cell addressing
//! - the grid and its pending diff
//! - cooldown arithmetic
//! - logical client/server messages

pub mod color;
pub mod position;
pub mod canvas;
pub mod diff;
pub mod state;
pub mod cooldown;
pub mod messages;
pub mod error;

pub use color::{Color, COLOR_COUNT};
pub use position::{Position, CHUNK_SIZE};

pub use messages::{ClientMessage, ServerMessage};

pub use canvas::{Canvas, LoadOutcome};
pub use diff::PendingDiff;
pub use state::{CanvasState, Snapshot};
pub use cooldown::Cooldown;
pub use error::CanvasError;
