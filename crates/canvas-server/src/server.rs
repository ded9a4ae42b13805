//! TCP listener and top-level server wiring.
//!
//! This module:
//! - Opens the configured store and session provider.
//! - Restores the canvas snapshot and starts the canvas task.
//! - Starts the scheduler.
//! - Accepts TCP connections and runs a handshake on each one:
//!   the first frame is the session token.
//! - On shutdown, waits for every connection to close and persists the
//!   final canvas.
//!
//! The per-connection lifecycle itself lives in `engine`.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use canvas_core::{CanvasState, LoadOutcome};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::canvas_task::spawn_canvas_task;
use crate::config::Config;
use crate::engine::{shutdown_requested, Engine, EngineSettings, ServeError};
use crate::scheduler::{Scheduler, TickPeriods};
use crate::session::{OpenSessions, SessionProvider, TokenTable};
use crate::store::{FileStore, KvStore, MemoryStore, SharedStore, CANVAS_SNAPSHOT_KEY};
use crate::transport::{tcp_transport, FrameSource};

/// Time a new connection has to present its session token.
pub const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

pub type SharedSessions = Arc<dyn SessionProvider>;

/// Run the server until `shutdown` flips to `true`.
pub async fn run(config: Config, shutdown: watch::Receiver<bool>) -> anyhow::Result<()> {
    let store = open_store(&config).await?;
    let sessions = load_sessions(&config)?;
    let state = load_canvas(store.as_ref(), config.width, config.height).await?;

    let addr = config.socket_addr_string();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(
        %addr,
        width = config.width,
        height = config.height,
        max_players = config.max_players,
        "listening"
    );

    let canvas = spawn_canvas_task(state);
    let engine = Engine::new(
        canvas,
        store,
        EngineSettings::from(&config),
        shutdown.clone(),
    );
    let scheduler = Scheduler::new(engine.clone(), TickPeriods::from(&config));
    let mut ticks = scheduler.spawn(shutdown.clone());

    serve_listener(listener, engine, sessions, shutdown).await;

    while ticks.join_next().await.is_some() {}
    scheduler
        .persist()
        .await
        .context("failed to read the final canvas")?;
    info!("server stopped");
    Ok(())
}

/// Accept connections on `listener` until shutdown, then wait for the
/// open ones to close.
pub async fn serve_listener(
    listener: TcpListener,
    engine: Engine,
    sessions: SharedSessions,
    shutdown: watch::Receiver<bool>,
) {
    let mut connections = JoinSet::new();
    let mut stop = shutdown.clone();

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!(%peer, "accepted connection");
                    connections.spawn(handle_connection(
                        stream,
                        peer,
                        engine.clone(),
                        sessions.clone(),
                        shutdown.clone(),
                    ));
                }
                Err(e) => warn!(error = %e, "accept failed"),
            },
            Some(joined) = connections.join_next(), if !connections.is_empty() => {
                if let Err(e) = joined {
                    warn!(error = %e, "connection task failed");
                }
            }
            _ = shutdown_requested(&mut stop) => break,
        }
    }

    drop(listener);
    info!(open = connections.len(), "no longer accepting, closing connections");
    while connections.join_next().await.is_some() {}
}

async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    engine: Engine,
    sessions: SharedSessions,
    mut shutdown: watch::Receiver<bool>,
) {
    if let Err(e) = stream.set_nodelay(true) {
        debug!(%peer, error = %e, "failed to set TCP_NODELAY");
    }
    let (mut source, sink) = tcp_transport(stream);

    let token = tokio::select! {
        handshake = tokio::time::timeout(HANDSHAKE_TIMEOUT, source.next_frame()) => match handshake {
            Ok(Ok(Some(token))) => token,
            Ok(Ok(None)) => {
                debug!(%peer, "closed before handshake");
                return;
            }
            Ok(Err(e)) => {
                debug!(%peer, error = %e, "handshake read failed");
                return;
            }
            Err(_) => {
                info!(%peer, "handshake timed out");
                return;
            }
        },
        _ = shutdown_requested(&mut shutdown) => return,
    };

    let session = sessions.authenticate(&token);
    match engine.serve(session, source, sink).await {
        Ok(()) => {}
        Err(ServeError::Unauthenticated) => info!(%peer, "rejected connection without a valid session"),
        Err(e @ ServeError::ServerFull { .. }) => info!(%peer, "rejected connection: {}", e),
        Err(e) => warn!(%peer, error = %e, "connection ended with error"),
    }
}

/// File store under `data_dir`, or an in-memory store when none is set.
pub async fn open_store(config: &Config) -> anyhow::Result<SharedStore> {
    match &config.data_dir {
        Some(dir) => {
            let store = FileStore::open(dir)
                .await
                .with_context(|| format!("failed to open data dir {}", dir.display()))?;
            info!(dir = %dir.display(), "persisting to disk");
            Ok(Arc::new(store))
        }
        None => {
            warn!("no data dir configured, state will not survive a restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

pub fn load_sessions(config: &Config) -> anyhow::Result<SharedSessions> {
    match &config.sessions_file {
        Some(path) => {
            let table = TokenTable::load(path)
                .with_context(|| format!("failed to load sessions from {}", path.display()))?;
            info!(tokens = table.len(), "using session token table");
            Ok(Arc::new(table))
        }
        None => {
            warn!("no sessions file configured, accepting any token as a player id");
            Ok(Arc::new(OpenSessions))
        }
    }
}

/// Restore the persisted canvas, falling back to a blank one.
pub async fn load_canvas(
    store: &dyn KvStore,
    width: u8,
    height: u8,
) -> anyhow::Result<CanvasState> {
    let blob = match store.get(CANVAS_SNAPSHOT_KEY).await {
        Ok(blob) => blob,
        Err(e) => {
            warn!(error = %e, "failed to read canvas snapshot, starting blank");
            None
        }
    };

    let (state, outcome) = CanvasState::load(width, height, blob.as_deref())?;
    match outcome {
        LoadOutcome::Restored => info!("restored canvas snapshot"),
        LoadOutcome::Missing => info!("no canvas snapshot, starting blank"),
        LoadOutcome::Corrupt => warn!(
            expected = state.size(),
            found = blob.as_ref().map_or(0, Vec::len),
            "canvas snapshot does not match the configured canvas, starting blank"
        ),
    }
    Ok(state)
}
