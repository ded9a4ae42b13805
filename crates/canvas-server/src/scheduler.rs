//! Periodic background work.
//!
//! Three independent loops, each on its own fixed period measured from
//! start:
//!
//! - main tick: drain the pending diff, broadcast it, persist the canvas
//! - heartbeat tick: broadcast the player count
//! - resync tick: broadcast the full canvas
//!
//! Each tick is also a plain async method so it can be driven directly.

use std::time::Duration;

use canvas_core::ServerMessage;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, warn};

use crate::canvas_task::CanvasTaskError;
use crate::config::Config;
use crate::engine::{encode_frame, player_counter, shutdown_requested, Engine};
use crate::store::CANVAS_SNAPSHOT_KEY;

#[derive(Debug, Clone, Copy)]
pub struct TickPeriods {
    pub main: Duration,
    pub heartbeat: Duration,
    pub resync: Duration,
}

impl From<&Config> for TickPeriods {
    fn from(config: &Config) -> Self {
        TickPeriods {
            main: config.tick_period,
            heartbeat: config.heartbeat_period,
            resync: config.resync_period,
        }
    }
}

#[derive(Clone)]
pub struct Scheduler {
    engine: Engine,
    periods: TickPeriods,
}

impl Scheduler {
    pub fn new(engine: Engine, periods: TickPeriods) -> Self {
        Scheduler { engine, periods }
    }

    /// Drain, broadcast and persist. Returns how many cells were broadcast.
    ///
    /// The drain and the broadcast happen under one registry view, so a
    /// player registering meanwhile either has these edits in its greeting
    /// snapshot or receives this migration after it.
    pub async fn main_tick(&self) -> Result<usize, CanvasTaskError> {
        let players = self.engine.registry().view().await;
        let diff = self.engine.canvas().drain_diff().await?;
        if diff.is_empty() {
            return Ok(0);
        }

        let changes = diff.len();
        match encode_frame(&ServerMessage::migration(diff)) {
            Ok(frame) => {
                let delivered = players.broadcast(frame);
                debug!(changes, delivered, "migration broadcast");
            }
            Err(e) => error!(error = %e, "failed to encode migration"),
        }
        drop(players);

        self.persist().await?;
        Ok(changes)
    }

    /// Write the full canvas under [`CANVAS_SNAPSHOT_KEY`]. Store failures
    /// are logged; the next non-empty tick tries again.
    pub async fn persist(&self) -> Result<(), CanvasTaskError> {
        let blob = self.engine.canvas().snapshot_bytes().await?;
        if let Err(e) = self.engine.store().set(CANVAS_SNAPSHOT_KEY, blob).await {
            warn!(error = %e, "failed to persist canvas snapshot");
        }
        Ok(())
    }

    /// Broadcast the registered player count to exactly the players it
    /// counts. Returns that count.
    pub async fn heartbeat_tick(&self) -> usize {
        let players = self.engine.registry().view().await;
        let count = players.len();
        match encode_frame(&ServerMessage::PlayerCounter(player_counter(count))) {
            Ok(frame) => {
                players.broadcast(frame);
            }
            Err(e) => error!(error = %e, "failed to encode player counter"),
        }
        count
    }

    /// Broadcast the full canvas.
    pub async fn resync_tick(&self) -> Result<(), CanvasTaskError> {
        let players = self.engine.registry().view().await;
        let snapshot = self.engine.canvas().snapshot().await?;
        match encode_frame(&ServerMessage::State(snapshot)) {
            Ok(frame) => {
                players.broadcast(frame);
            }
            Err(e) => error!(error = %e, "failed to encode canvas state"),
        }
        Ok(())
    }

    /// Run all three loops until `shutdown` flips to `true`.
    pub fn spawn(&self, shutdown: watch::Receiver<bool>) -> JoinSet<()> {
        let mut tasks = JoinSet::new();

        let s = self.clone();
        let rx = shutdown.clone();
        tasks.spawn(async move {
            s.run_every(s.periods.main, rx, |s| async move {
                if let Err(e) = s.main_tick().await {
                    warn!(error = %e, "main tick failed");
                }
            })
            .await
        });

        let s = self.clone();
        let rx = shutdown.clone();
        tasks.spawn(async move {
            s.run_every(s.periods.heartbeat, rx, |s| async move {
                let count = s.heartbeat_tick().await;
                debug!(count, "heartbeat");
            })
            .await
        });

        let s = self.clone();
        tasks.spawn(async move {
            s.run_every(s.periods.resync, shutdown, |s| async move {
                if let Err(e) = s.resync_tick().await {
                    warn!(error = %e, "resync tick failed");
                }
            })
            .await
        });

        tasks
    }

    /// One loop: the next firing waits for the previous one to finish, and
    /// firings missed meanwhile are skipped.
    async fn run_every<F, Fut>(&self, period: Duration, mut shutdown: watch::Receiver<bool>, tick: F)
    where
        F: Fn(Scheduler) -> Fut,
        Fut: std::future::Future<Output = ()>,
    {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => tick(self.clone()).await,
                _ = shutdown_requested(&mut shutdown) => break,
            }
        }
    }
}
