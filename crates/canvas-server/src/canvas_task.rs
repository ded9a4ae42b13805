//! Central canvas loop.
//!
//! This task owns the `CanvasState` and processes every command coming
//! from player tasks and the scheduler. Edits and drains are serialized
//! through one channel, so a drain sees every edit that was applied before
//! it and none that was applied after.

use canvas_core::{CanvasError, CanvasState, Color, PendingDiff, Position, Snapshot};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// Commands queued before callers start waiting.
pub const COMMAND_CAPACITY: usize = 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CanvasTaskError {
    #[error("canvas task has stopped")]
    Closed,

    #[error("edit rejected: {0}")]
    Rejected(CanvasError),
}

enum CanvasCommand {
    ApplyEdit {
        position: Position,
        color: Color,
        reply: oneshot::Sender<Result<(), CanvasError>>,
    },
    DrainDiff {
        reply: oneshot::Sender<PendingDiff>,
    },
    Snapshot {
        reply: oneshot::Sender<Snapshot>,
    },
}

/// Cloneable handle to the canvas task.
#[derive(Clone, Debug)]
pub struct CanvasHandle {
    tx: mpsc::Sender<CanvasCommand>,
    width: u8,
    height: u8,
}

/// Start the canvas task on the current runtime.
pub fn spawn_canvas_task(state: CanvasState) -> CanvasHandle {
    let (tx, rx) = mpsc::channel(COMMAND_CAPACITY);
    let handle = CanvasHandle {
        tx,
        width: state.width(),
        height: state.height(),
    };
    tokio::spawn(run_canvas_loop(rx, state));
    handle
}

/// Run until every handle has been dropped.
async fn run_canvas_loop(mut rx: mpsc::Receiver<CanvasCommand>, mut state: CanvasState) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            CanvasCommand::ApplyEdit {
                position,
                color,
                reply,
            } => {
                let _ = reply.send(state.apply_edit(position, color));
            }
            CanvasCommand::DrainDiff { reply } => {
                let _ = reply.send(state.drain_diff());
            }
            CanvasCommand::Snapshot { reply } => {
                let _ = reply.send(state.snapshot());
            }
        }
    }

    debug!("canvas loop shutting down (all handles dropped)");
}

impl CanvasHandle {
    pub async fn apply_edit(&self, position: Position, color: Color) -> Result<(), CanvasTaskError> {
        let (reply, rx) = oneshot::channel();
        self.request(CanvasCommand::ApplyEdit {
            position,
            color,
            reply,
        })
        .await?;
        rx.await
            .map_err(|_| CanvasTaskError::Closed)?
            .map_err(CanvasTaskError::Rejected)
    }

    pub async fn drain_diff(&self) -> Result<PendingDiff, CanvasTaskError> {
        let (reply, rx) = oneshot::channel();
        self.request(CanvasCommand::DrainDiff { reply }).await?;
        rx.await.map_err(|_| CanvasTaskError::Closed)
    }

    pub async fn snapshot(&self) -> Result<Snapshot, CanvasTaskError> {
        let (reply, rx) = oneshot::channel();
        self.request(CanvasCommand::Snapshot { reply }).await?;
        rx.await.map_err(|_| CanvasTaskError::Closed)
    }

    pub async fn snapshot_bytes(&self) -> Result<Vec<u8>, CanvasTaskError> {
        Ok(self.snapshot().await?.to_bytes())
    }

    pub fn width(&self) -> u8 {
        self.width
    }

    pub fn height(&self) -> u8 {
        self.height
    }

    pub fn size(&self) -> usize {
        self.width as usize * self.height as usize
    }

    async fn request(&self, cmd: CanvasCommand) -> Result<(), CanvasTaskError> {
        self.tx.send(cmd).await.map_err(|_| CanvasTaskError::Closed)
    }
}
