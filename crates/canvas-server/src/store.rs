//! Key/value persistence.
//!
//! The server persists two kinds of records:
//! - the canvas snapshot under [`CANVAS_SNAPSHOT_KEY`]
//! - one cooldown per player under [`cooldown_key`]
//!
//! Both go through the object-safe [`KvStore`] trait so the backend is
//! chosen at startup: [`MemoryStore`] for tests and throwaway runs,
//! [`FileStore`] for anything that should survive a restart.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use futures::FutureExt;
use thiserror::Error;

use crate::types::PlayerId;

pub const CANVAS_SNAPSHOT_KEY: &str = "canvas:snapshot";

pub fn cooldown_key(id: &PlayerId) -> String {
    format!("cooldown:{}", id.as_str())
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("key {0:?} cannot be stored")]
    InvalidKey(String),
}

/// Byte-oriented async key/value store.
pub trait KvStore: Send + Sync {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Vec<u8>>, StoreError>>;

    fn set<'a>(&'a self, key: &'a str, value: Vec<u8>) -> BoxFuture<'a, Result<(), StoreError>>;
}

pub type SharedStore = Arc<dyn KvStore>;

// ============================================================================
// In-memory
// ============================================================================

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KvStore for MemoryStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Vec<u8>>, StoreError>> {
        let value = self.entries.get(key).map(|entry| entry.value().clone());
        futures::future::ready(Ok(value)).boxed()
    }

    fn set<'a>(&'a self, key: &'a str, value: Vec<u8>) -> BoxFuture<'a, Result<(), StoreError>> {
        self.entries.insert(key.to_string(), value);
        futures::future::ready(Ok(())).boxed()
    }
}

// ============================================================================
// File-backed
// ============================================================================

/// One file per key inside `dir`.
///
/// Writes go to a temporary sibling first and are renamed into place, so a
/// crash mid-write leaves the previous value intact. Every write gets its
/// own temporary file; concurrent writers to one key never share one.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) the data directory.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(FileStore { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        if key.is_empty() {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(escape_key(key)))
    }
}

impl KvStore for FileStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<Vec<u8>>, StoreError>> {
        async move {
            let path = self.path_for(key)?;
            match tokio::fs::read(&path).await {
                Ok(bytes) => Ok(Some(bytes)),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e.into()),
            }
        }
        .boxed()
    }

    fn set<'a>(&'a self, key: &'a str, value: Vec<u8>) -> BoxFuture<'a, Result<(), StoreError>> {
        async move {
            let path = self.path_for(key)?;
            let mut tmp = path.clone().into_os_string();
            tmp.push(format!(".{}.tmp", WRITE_SEQ.fetch_add(1, Ordering::Relaxed)));
            let tmp = PathBuf::from(tmp);

            tokio::fs::write(&tmp, &value).await?;
            tokio::fs::rename(&tmp, &path).await?;
            Ok(())
        }
        .boxed()
    }
}

static WRITE_SEQ: AtomicU64 = AtomicU64::new(0);

/// Map an arbitrary key to a portable file name.
///
/// ASCII alphanumerics plus `-` and `_` pass through; every other byte
/// becomes `%XX`.
fn escape_key(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    for b in key.bytes() {
        if b.is_ascii_alphanumeric() || b == b'-' || b == b'_' {
            out.push(b as char);
        } else {
            out.push_str(&format!("%{:02X}", b));
        }
    }
    out
}
