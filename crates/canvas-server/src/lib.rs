//! canvas-server
//!
//! Multi-player async server for the shared canvas.

pub mod canvas_task;
pub mod config;
pub mod cooldown;
pub mod engine;
pub mod player;
pub mod registry;
pub mod scheduler;
pub mod server;
pub mod session;
pub mod store;
pub mod transport;
pub mod types;

pub use canvas_task::{spawn_canvas_task, CanvasHandle, CanvasTaskError};
pub use config::{Config, ConfigError};
pub use engine::{Engine, EngineSettings, ServeError};
pub use scheduler::{Scheduler, TickPeriods};
pub use types::{ConnectionId, PlayerId};
