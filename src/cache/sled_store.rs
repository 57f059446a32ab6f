//! Embedded sled cache, one key per chain.

use super::{apply_update, SnapshotStore, SnapshotUpdate};
use crate::error::CacheError;
use crate::types::{CacheMap, CacheSnapshot};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Snapshots stored as JSON values under their chain name.
pub struct SledSnapshotStore {
    db: sled::Db,
    path: PathBuf,
}

impl SledSnapshotStore {
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        std::fs::create_dir_all(path).map_err(|e| CacheError::Unwritable {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let db = sled::open(path).map_err(|e| CacheError::Unreadable {
            path: path.to_path_buf(),
            reason: format!("Failed to open sled database: {}", e),
        })?;
        Ok(Self {
            db,
            path: path.to_path_buf(),
        })
    }

    fn unreadable(&self, reason: impl ToString) -> CacheError {
        CacheError::Unreadable {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }

    fn unwritable(&self, reason: impl ToString) -> CacheError {
        CacheError::Unwritable {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }

    fn write_chain(&self, chain: &str, snapshot: &CacheSnapshot) -> Result<(), CacheError> {
        let value = serde_json::to_vec(snapshot).map_err(|e| self.unwritable(e))?;
        self.db
            .insert(chain.as_bytes(), value)
            .map_err(|e| self.unwritable(e))?;
        self.db.flush().map_err(|e| self.unwritable(e))?;
        Ok(())
    }

    fn read_chain(&self, chain: &str) -> Result<Option<CacheSnapshot>, CacheError> {
        match self.db.get(chain.as_bytes()).map_err(|e| self.unreadable(e))? {
            Some(value) => serde_json::from_slice(&value)
                .map(Some)
                .map_err(|e| self.unreadable(format!("{}: {}", chain, e))),
            None => Ok(None),
        }
    }
}

impl SnapshotStore for SledSnapshotStore {
    fn try_load(&self) -> Result<CacheMap, CacheError> {
        let mut map = CacheMap::new();
        for entry in self.db.iter() {
            let (key, value) = entry.map_err(|e| self.unreadable(e))?;
            let chain = String::from_utf8_lossy(&key).into_owned();
            let snapshot = serde_json::from_slice(&value)
                .map_err(|e| self.unreadable(format!("{}: {}", chain, e)))?;
            map.insert(chain, snapshot);
        }
        Ok(map)
    }

    fn try_save(&self, map: &CacheMap) -> Result<(), CacheError> {
        self.db.clear().map_err(|e| self.unwritable(e))?;
        for (chain, snapshot) in map {
            self.write_chain(chain, snapshot)?;
        }
        Ok(())
    }

    fn load_chain(&self, chain: &str) -> Option<CacheSnapshot> {
        self.read_chain(chain).unwrap_or_else(|e| {
            warn!("{}; treating cache as empty", e);
            None
        })
    }

    fn merge(&self, chain: &str, update: SnapshotUpdate) -> CacheSnapshot {
        let merged = apply_update(self.load_chain(chain), update);
        if let Err(e) = self.write_chain(chain, &merged) {
            warn!("{}; cache not updated", e);
        }
        merged
    }
}
