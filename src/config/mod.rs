//! Configuration
//!
//! Layered configuration for the router: serde defaults, an optional global TOML file,
//! an optional explicit file, then `TRUSTROUTER__*` environment variables.

pub mod facade;
mod merge {
    pub mod service;
}
pub mod paths {
    pub mod xdg_root;
}
mod sources {
    pub mod environment;
    pub mod global_file;
}

pub use facade::ConfigLoader;
pub use paths::xdg_root as xdg;

use crate::error::RouterError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level router configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrustRouterConfig {
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    /// Per-chain overrides keyed by chain name.
    #[serde(default)]
    pub chains: BTreeMap<String, ChainOverride>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl TrustRouterConfig {
    /// Reject values that would make the router misbehave.
    pub fn validate(&self) -> Result<(), RouterError> {
        if self.cache.ttl_ms == 0 {
            return Err(RouterError::ConfigError(
                "cache.ttl_ms must be greater than zero".to_string(),
            ));
        }
        if self.fetch.batch_size == 0 {
            return Err(RouterError::ConfigError(
                "fetch.batch_size must be greater than zero".to_string(),
            ));
        }
        if self.fetch.rpc_timeout_secs == 0 || self.fetch.metadata_timeout_secs == 0 {
            return Err(RouterError::ConfigError(
                "fetch timeouts must be greater than zero".to_string(),
            ));
        }
        let gateway = &self.fetch.ipfs_gateway;
        if !(gateway.starts_with("http://") || gateway.starts_with("https://")) {
            return Err(RouterError::ConfigError(format!(
                "fetch.ipfs_gateway must be an http(s) URL, got {}",
                gateway
            )));
        }
        if self.discovery.ceiling < self.discovery.hint {
            return Err(RouterError::ConfigError(format!(
                "discovery.ceiling ({}) must not be below discovery.hint ({})",
                self.discovery.ceiling, self.discovery.hint
            )));
        }
        Ok(())
    }
}

/// Where snapshots are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    /// One JSON document holding every chain.
    Json,
    /// Embedded sled tree, one key per chain.
    Sled,
    /// Process-local only.
    Memory,
}

fn default_ttl_ms() -> u64 {
    3_600_000
}

fn default_backend() -> CacheBackend {
    CacheBackend::Json
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Freshness window in milliseconds
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: u64,

    /// Cache location; None means `~/.trustrouter/cache.json` (or `cache.sled`)
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_backend")]
    pub backend: CacheBackend,
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_millis(self.ttl_ms)
    }

    /// Configured path, or the default location for the backend.
    pub fn resolve_path(&self) -> Result<PathBuf, RouterError> {
        if let Some(path) = &self.path {
            return Ok(path.clone());
        }
        let dir = xdg::cache_dir()?;
        Ok(match self.backend {
            CacheBackend::Sled => dir.join("cache.sled"),
            CacheBackend::Json | CacheBackend::Memory => dir.join("cache.json"),
        })
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_ms: default_ttl_ms(),
            path: None,
            backend: default_backend(),
        }
    }
}

fn default_hint() -> u64 {
    200
}

fn default_ceiling() -> u64 {
    100_000
}

/// Agent discovery probing bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// First id probed
    #[serde(default = "default_hint")]
    pub hint: u64,

    /// Hard cap for the exponential ceiling search
    #[serde(default = "default_ceiling")]
    pub ceiling: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            hint: default_hint(),
            ceiling: default_ceiling(),
        }
    }
}

fn default_batch_size() -> usize {
    10
}

fn default_rpc_timeout_secs() -> u64 {
    10
}

fn default_metadata_timeout_secs() -> u64 {
    8
}

fn default_ipfs_gateway() -> String {
    "https://ipfs.io/ipfs/".to_string()
}

/// Network fetch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Ids fetched concurrently per batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Deadline for liveness probes and registry reads
    #[serde(default = "default_rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,

    /// Deadline for off-chain registration fetches
    #[serde(default = "default_metadata_timeout_secs")]
    pub metadata_timeout_secs: u64,

    /// HTTP gateway prefix that `ipfs://` pointers are rewritten to
    #[serde(default = "default_ipfs_gateway")]
    pub ipfs_gateway: String,
}

impl FetchConfig {
    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }

    pub fn metadata_timeout(&self) -> Duration {
        Duration::from_secs(self.metadata_timeout_secs)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            rpc_timeout_secs: default_rpc_timeout_secs(),
            metadata_timeout_secs: default_metadata_timeout_secs(),
            ipfs_gateway: default_ipfs_gateway(),
        }
    }
}

/// Optional replacements for a chain's built-in settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChainOverride {
    #[serde(default)]
    pub endpoints: Option<Vec<String>>,
    #[serde(default)]
    pub chain_id: Option<u64>,
    #[serde(default)]
    pub identity_registry: Option<String>,
    #[serde(default)]
    pub reputation_registry: Option<String>,
    #[serde(default)]
    pub validation_registry: Option<String>,
}
