// Shared fixtures for the canvas-server integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use canvas_core::{CanvasState, ServerMessage};
use canvas_protocol::decode_server;
use canvas_server::store::MemoryStore;
use canvas_server::transport::{memory_transport, FrameSink, FrameSource, MemoryPipe, MemorySource};
use canvas_server::{spawn_canvas_task, Engine, EngineSettings, PlayerId, Scheduler, ServeError, TickPeriods};
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub const WAIT: Duration = Duration::from_secs(3);

pub struct Harness {
    pub engine: Engine,
    pub scheduler: Scheduler,
    pub store: Arc<MemoryStore>,
    pub shutdown: watch::Sender<bool>,
}

pub fn settings() -> EngineSettings {
    EngineSettings {
        cooldown: Duration::from_secs(5),
        max_players: 16,
        outbound_capacity: 64,
    }
}

/// Engine over a blank `width` x `height` canvas. Must run inside a runtime.
pub fn harness(width: u8, height: u8, settings: EngineSettings) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let (shutdown, shutdown_rx) = watch::channel(false);
    let canvas = spawn_canvas_task(CanvasState::new(width, height).unwrap());
    let engine = Engine::new(canvas, store.clone(), settings, shutdown_rx);

    // Periods are irrelevant: tests drive the ticks directly.
    let scheduler = Scheduler::new(
        engine.clone(),
        TickPeriods {
            main: Duration::from_secs(3600),
            heartbeat: Duration::from_secs(3600),
            resync: Duration::from_secs(3600),
        },
    );

    Harness {
        engine,
        scheduler,
        store,
        shutdown,
    }
}

pub struct Client {
    pub pipe: MemoryPipe,
    pub task: JoinHandle<Result<(), ServeError>>,
}

impl Client {
    pub async fn send(&mut self, frame: &[u8]) {
        self.pipe
            .sink
            .send_frame(Bytes::copy_from_slice(frame))
            .await
            .unwrap();
    }

    pub async fn recv_raw(&mut self) -> Bytes {
        recv_raw(&mut self.pipe.source).await
    }

    pub async fn recv(&mut self) -> ServerMessage {
        decode_server(&self.recv_raw().await).unwrap()
    }

    /// Skip the State / PlayerState / PlayerCounter greeting.
    pub async fn skip_greeting(&mut self) {
        for _ in 0..3 {
            self.recv_raw().await;
        }
    }

    /// `true` if no frame shows up within a short grace period.
    pub async fn is_quiet(&mut self) -> bool {
        tokio::time::sleep(Duration::from_millis(50)).await;
        self.pipe.source.try_next_frame().is_none()
    }

    pub async fn finished(self) -> Result<(), ServeError> {
        tokio::time::timeout(WAIT, self.task)
            .await
            .expect("serve did not return")
            .unwrap()
    }
}

pub async fn recv_raw(source: &mut MemorySource) -> Bytes {
    tokio::time::timeout(WAIT, source.next_frame())
        .await
        .expect("timed out waiting for a frame")
        .unwrap()
        .expect("connection closed")
}

pub fn connect(engine: &Engine, player: Option<&str>) -> Client {
    connect_with_capacity(engine, player, 64)
}

pub fn connect_with_capacity(engine: &Engine, player: Option<&str>, capacity: usize) -> Client {
    let (client, server) = memory_transport(capacity);
    let engine = engine.clone();
    let session = player.map(PlayerId::new);
    let task =
        tokio::spawn(async move { engine.serve(session, server.source, server.sink).await });
    Client { pipe: client, task }
}
