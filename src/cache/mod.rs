//! Cache store
//!
//! Persists one [`CacheSnapshot`] per chain. Storage failures never reach callers:
//! an unreadable store reads as empty and an unwritable store drops the write, both
//! with a warning.

pub mod json;
pub mod sled_store;

pub use json::JsonFileStore;
pub use sled_store::SledSnapshotStore;

use crate::config::{CacheBackend, CacheConfig};
use crate::error::CacheError;
use crate::types::{AgentRecord, CacheMap, CacheSnapshot};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, warn};

/// Current wall-clock time in epoch milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// True while `snapshot` is younger than `ttl_ms`. The boundary itself is stale.
pub fn is_fresh(snapshot: &CacheSnapshot, ttl_ms: u64, now_ms: i64) -> bool {
    let age = now_ms.saturating_sub(snapshot.timestamp);
    age < i64::try_from(ttl_ms).unwrap_or(i64::MAX)
}

/// Newly fetched data for one chain.
#[derive(Debug, Clone)]
pub struct SnapshotUpdate {
    /// Agent count learned alongside `records`; `None` for lookups that carry no count.
    pub total_agents: Option<u64>,
    pub records: Vec<AgentRecord>,
    pub now_ms: i64,
}

impl SnapshotUpdate {
    /// Records and the agent count observed with them.
    pub fn counted(total_agents: u64, records: Vec<AgentRecord>, now_ms: i64) -> Self {
        Self {
            total_agents: Some(total_agents),
            records,
            now_ms,
        }
    }

    /// Individually looked-up records; the snapshot's count and age stay as they are.
    pub fn records_only(records: Vec<AgentRecord>, now_ms: i64) -> Self {
        Self {
            total_agents: None,
            records,
            now_ms,
        }
    }
}

/// Merge `update` into `existing`.
///
/// Fetched records replace their ids and untouched ids survive. A counted update moves
/// the timestamp to the update time and raises `total_agents` to cover both the observed
/// count and the highest stored id; it never decreases. A records-only update leaves an
/// existing snapshot's count and timestamp alone, and a new snapshot starts at count 0.
pub fn apply_update(existing: Option<CacheSnapshot>, update: SnapshotUpdate) -> CacheSnapshot {
    let mut snapshot = existing.unwrap_or_else(|| CacheSnapshot::new(update.now_ms));
    for record in update.records {
        snapshot.agents.insert(record.id, record);
    }
    if let Some(total) = update.total_agents {
        let highest = snapshot
            .agents
            .keys()
            .next_back()
            .map(|id| id + 1)
            .unwrap_or(0);
        snapshot.total_agents = snapshot.total_agents.max(total).max(highest);
        snapshot.timestamp = update.now_ms;
    }
    snapshot
}

/// Backing storage for snapshots.
pub trait SnapshotStore: Send + Sync {
    /// Read every chain's snapshot.
    fn try_load(&self) -> Result<CacheMap, CacheError>;

    /// Replace the stored contents with `map`.
    fn try_save(&self, map: &CacheMap) -> Result<(), CacheError>;

    /// Read all snapshots; an unreadable store reads as empty.
    fn load(&self) -> CacheMap {
        self.try_load().unwrap_or_else(|e| {
            warn!("{}; treating cache as empty", e);
            CacheMap::new()
        })
    }

    /// Persist all snapshots; a failed write is logged and dropped.
    fn save(&self, map: &CacheMap) {
        if let Err(e) = self.try_save(map) {
            warn!("{}; cache not updated", e);
        }
    }

    fn load_chain(&self, chain: &str) -> Option<CacheSnapshot> {
        self.load().remove(chain)
    }

    /// Read-modify-write of one chain, leaving the others untouched.
    fn merge(&self, chain: &str, update: SnapshotUpdate) -> CacheSnapshot {
        let mut map = self.load();
        let merged = apply_update(map.remove(chain), update);
        map.insert(chain.to_string(), merged.clone());
        self.save(&map);
        merged
    }
}

/// Snapshots held only for the life of the process.
#[derive(Default)]
pub struct MemorySnapshotStore {
    map: RwLock<CacheMap>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn try_load(&self) -> Result<CacheMap, CacheError> {
        Ok(self.map.read().clone())
    }

    fn try_save(&self, map: &CacheMap) -> Result<(), CacheError> {
        *self.map.write() = map.clone();
        Ok(())
    }

    fn merge(&self, chain: &str, update: SnapshotUpdate) -> CacheSnapshot {
        let mut map = self.map.write();
        let merged = apply_update(map.remove(chain), update);
        map.insert(chain.to_string(), merged.clone());
        merged
    }
}

/// Open the store selected by `config`.
///
/// A sled store that cannot be opened, or a path that cannot be resolved, falls back
/// to memory so the router keeps working without persistence.
pub fn open_store(config: &CacheConfig) -> Arc<dyn SnapshotStore> {
    if config.backend == CacheBackend::Memory {
        return Arc::new(MemorySnapshotStore::new());
    }
    let path = match config.resolve_path() {
        Ok(path) => path,
        Err(e) => {
            warn!("{}; cache kept in memory only", e);
            return Arc::new(MemorySnapshotStore::new());
        }
    };
    debug!(path = %path.display(), backend = ?config.backend, "opening cache");
    match config.backend {
        CacheBackend::Sled => match SledSnapshotStore::open(&path) {
            Ok(store) => Arc::new(store),
            Err(e) => {
                warn!("{}; cache kept in memory only", e);
                Arc::new(MemorySnapshotStore::new())
            }
        },
        _ => Arc::new(JsonFileStore::new(path)),
    }
}

/// TTL-aware view over a [`SnapshotStore`].
#[derive(Clone)]
pub struct CacheStore {
    store: Arc<dyn SnapshotStore>,
    ttl_ms: u64,
}

impl CacheStore {
    pub fn new(store: Arc<dyn SnapshotStore>, ttl_ms: u64) -> Self {
        Self { store, ttl_ms }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(open_store(config), config.ttl_ms)
    }

    pub fn ttl_ms(&self) -> u64 {
        self.ttl_ms
    }

    /// The chain's snapshot if it exists, is fresh and no refresh was forced.
    pub fn get_if_fresh(&self, chain: &str, force_refresh: bool) -> Option<CacheSnapshot> {
        self.get_if_fresh_at(chain, force_refresh, now_ms())
    }

    pub fn get_if_fresh_at(
        &self,
        chain: &str,
        force_refresh: bool,
        now_ms: i64,
    ) -> Option<CacheSnapshot> {
        if force_refresh {
            return None;
        }
        let snapshot = self.store.load_chain(chain)?;
        if is_fresh(&snapshot, self.ttl_ms, now_ms) {
            Some(snapshot)
        } else {
            debug!(chain, age_ms = now_ms - snapshot.timestamp, "cached snapshot is stale");
            None
        }
    }

    /// The chain's snapshot regardless of age.
    pub fn get_any(&self, chain: &str) -> Option<CacheSnapshot> {
        self.store.load_chain(chain)
    }

    pub fn merge(&self, chain: &str, update: SnapshotUpdate) -> CacheSnapshot {
        self.store.merge(chain, update)
    }
}
