//! Shared types for the canvas server.
//!
//! This module defines:
//! - `PlayerId`: the authenticated identity behind a connection
//! - `ConnectionId`: a per-connection handle, unique per process
//! - channel aliases for each player's outbound queue

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;
use tokio::sync::mpsc;

/// Identity supplied by the session layer.
///
/// This is intentionally opaque; the server never interprets it beyond
/// using it as a map key and a storage key suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        PlayerId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier for one accepted connection.
///
/// Two connections for the same `PlayerId` get different `ConnectionId`s,
/// which is how a stale connection avoids deregistering its replacement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(pub u64);

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

impl ConnectionId {
    pub fn next() -> Self {
        ConnectionId(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Encoded frames queued for one player.
pub type OutboundTx = mpsc::Sender<Bytes>;
pub type OutboundRx = mpsc::Receiver<Bytes>;
