//! Single JSON document cache, keyed by chain name.

use super::SnapshotStore;
use crate::error::CacheError;
use crate::types::CacheMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Stores every chain in one pretty-printed JSON file.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn unwritable(&self, reason: impl ToString) -> CacheError {
        CacheError::Unwritable {
            path: self.path.clone(),
            reason: reason.to_string(),
        }
    }
}

impl SnapshotStore for JsonFileStore {
    fn try_load(&self) -> Result<CacheMap, CacheError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(CacheMap::new()),
            Err(e) => {
                return Err(CacheError::Unreadable {
                    path: self.path.clone(),
                    reason: e.to_string(),
                })
            }
        };
        serde_json::from_slice(&bytes).map_err(|e| CacheError::Unreadable {
            path: self.path.clone(),
            reason: e.to_string(),
        })
    }

    fn try_save(&self, map: &CacheMap) -> Result<(), CacheError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| self.unwritable(e))?;
        }
        let json = serde_json::to_vec_pretty(map).map_err(|e| self.unwritable(e))?;

        // Write beside the target and rename so readers never see a partial file.
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(format!(".{}.tmp", std::process::id()));
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, json).map_err(|e| self.unwritable(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            self.unwritable(e)
        })
    }
}
