//! Two-tier cache: an in-process map in front of an optional directory of
//! JSON record files.
//!
//! The store is value-agnostic and TTL-agnostic. Callers serialize whole
//! records (with their own timestamps where freshness matters) and the store
//! never mutates a record in place. Persistent-tier failures never surface to
//! callers: a failed read is a miss, and the first failed write flips the
//! store into memory-only mode for the rest of its lifetime. That fallback is
//! what lets the same code run on hosts with a read-only filesystem.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::error::PersistenceError;

/// Where the persistent tier lives. Chosen by the caller at construction;
/// the store never probes the environment.
#[derive(Debug, Clone)]
pub enum CacheBackend {
    /// Record files under the given root directory.
    Disk(PathBuf),
    /// Record files under the OS temp directory. Suits deployments where
    /// only `/tmp` is writable.
    TempDir,
    /// No persistent tier at all.
    Memory,
}

impl CacheBackend {
    pub fn from_config(cache: &crate::config::CacheConfig) -> Self {
        match cache.backend.as_str() {
            "temp" => CacheBackend::TempDir,
            "memory" => CacheBackend::Memory,
            // Config validation only admits the three known names.
            _ => CacheBackend::Disk(cache.root.clone()),
        }
    }
}

/// Result of a [`TieredCache::put`]. `MemoryOnly` covers both the
/// no-persistent-tier configuration and the degraded state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOutcome {
    Persisted,
    MemoryOnly,
}

pub struct TieredCache {
    memory: RwLock<HashMap<String, String>>,
    dir: Option<PathBuf>,
    degraded: AtomicBool,
}

impl TieredCache {
    pub fn new(backend: CacheBackend) -> Self {
        let dir = match backend {
            CacheBackend::Disk(root) => Some(root),
            CacheBackend::TempDir => Some(std::env::temp_dir().join("grounder")),
            CacheBackend::Memory => None,
        };
        Self {
            memory: RwLock::new(HashMap::new()),
            dir,
            degraded: AtomicBool::new(false),
        }
    }

    /// Look up a record. In-process tier first; on a persistent-tier hit the
    /// raw record is promoted into the in-process tier. Read errors on an
    /// existing record (unreadable file, corrupt JSON) are logged and
    /// reported as a miss; plain misses are silent.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        if let Some(raw) = self.memory.read().unwrap().get(key) {
            return decode(key, raw);
        }

        if self.is_degraded() {
            return None;
        }
        let dir = self.dir.as_deref()?;

        match read_record::<T>(dir, key) {
            Ok(Some((raw, value))) => {
                // Promote only records that decoded cleanly.
                self.memory.write().unwrap().insert(key.to_string(), raw);
                Some(value)
            }
            Ok(None) => None,
            Err(err) => {
                warn!(key, error = %err, "cache read failed");
                None
            }
        }
    }

    /// Store a record through both tiers. Never fails: a persistent-tier
    /// write failure logs a warning, flips the store to memory-only mode,
    /// and reports [`StoreOutcome::MemoryOnly`].
    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> StoreOutcome {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(err) => {
                warn!(key, error = %err, "cache encode failed");
                return StoreOutcome::MemoryOnly;
            }
        };

        self.memory
            .write()
            .unwrap()
            .insert(key.to_string(), raw.clone());

        let Some(dir) = self.dir.as_deref() else {
            return StoreOutcome::MemoryOnly;
        };
        if self.is_degraded() {
            return StoreOutcome::MemoryOnly;
        }

        match write_record(dir, key, &raw) {
            Ok(()) => StoreOutcome::Persisted,
            Err(err) => {
                self.degraded.store(true, Ordering::Relaxed);
                warn!(key, error = %err, "cache write failed, switching to memory-only mode");
                StoreOutcome::MemoryOnly
            }
        }
    }

    /// Drop everything: the in-process map and, unless degraded, every
    /// record file under the cache root, staged leftovers included.
    /// Best-effort.
    pub fn clear(&self) {
        self.memory.write().unwrap().clear();

        if self.is_degraded() {
            return;
        }
        let Some(dir) = self.dir.as_deref() else {
            return;
        };
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(_) => return,
        };
        for entry in entries.flatten() {
            let path = entry.path();
            if path
                .extension()
                .is_some_and(|ext| ext == "json" || ext == "tmp")
            {
                let _ = std::fs::remove_file(&path);
            }
        }
    }

    /// True once a persistent-tier write has failed. Monotonic.
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Relaxed)
    }
}

/// CLI entry: drop every cached record for the configured backend.
pub fn run_cache_clear(config: &crate::config::Config) -> anyhow::Result<()> {
    let cache = TieredCache::new(CacheBackend::from_config(&config.cache));
    cache.clear();
    println!("Cache cleared.");
    Ok(())
}

fn decode<T: DeserializeOwned>(key: &str, raw: &str) -> Option<T> {
    match serde_json::from_str(raw) {
        Ok(value) => Some(value),
        Err(err) => {
            warn!(key, error = %err, "cache record did not decode");
            None
        }
    }
}

fn record_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{}.json", normalize_key(key)))
}

fn read_record<T: DeserializeOwned>(
    dir: &Path,
    key: &str,
) -> Result<Option<(String, T)>, PersistenceError> {
    let path = record_path(dir, key);
    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(PersistenceError::Read { path, source: err }),
    };
    let value =
        serde_json::from_str(&raw).map_err(|err| PersistenceError::Corrupt { path, source: err })?;
    Ok(Some((raw, value)))
}

/// Staged-file sequence; with the pid qualifier it keeps racing writers,
/// in this process or another, off each other's staged files.
static STAGE_SEQ: AtomicU64 = AtomicU64::new(0);

fn write_record(dir: &Path, key: &str, raw: &str) -> Result<(), PersistenceError> {
    let path = record_path(dir, key);
    std::fs::create_dir_all(dir).map_err(|err| PersistenceError::Write {
        path: path.clone(),
        source: err,
    })?;

    // Stage under a writer-unique name, then rename into place: readers
    // only ever observe whole record files, and racing writers of one key
    // settle on whichever rename lands last.
    let staged = dir.join(format!(
        "{}.{}.{}.tmp",
        normalize_key(key),
        std::process::id(),
        STAGE_SEQ.fetch_add(1, Ordering::Relaxed)
    ));
    if let Err(err) = std::fs::write(&staged, raw).and_then(|_| std::fs::rename(&staged, &path)) {
        let _ = std::fs::remove_file(&staged);
        return Err(PersistenceError::Write { path, source: err });
    }
    Ok(())
}

/// Cache key for the file-tree snapshot of one (owner, repo, branch).
pub fn tree_key(owner: &str, repo: &str, branch: &str) -> String {
    format!("tree:{owner}/{repo}/{branch}")
}

/// Cache key for one file's content. Embeds all four coordinates so equal
/// paths in different repositories never collide.
pub fn file_key(owner: &str, repo: &str, branch: &str, path: &str) -> String {
    format!("file:{owner}/{repo}/{branch}/{path}")
}

/// Filesystem-safe form of a cache key: every non-alphanumeric byte becomes
/// `_`. Idempotent, so normalizing twice is harmless.
pub fn normalize_key(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
