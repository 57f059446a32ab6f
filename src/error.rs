//! Error types
//!
//! Only [`RouterError`] ever reaches a caller. The other types describe failures that
//! are absorbed locally and replaced by a documented fallback value; they exist so the
//! fallback branch is explicit and can be logged, counted and tested.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced to callers of the registry service.
#[derive(Error, Debug)]
pub enum RouterError {
    /// Every candidate read endpoint for the chain failed its liveness probe.
    #[error("all read endpoints failed for {chain}; try setting {env_var}")]
    NoLiveEndpoint { chain: String, env_var: String },

    #[error("unsupported chain: {chain} (supported: {supported})")]
    UnsupportedChain { chain: String, supported: String },

    /// The requested id is not assigned in the registry.
    #[error("agent {id} not found on {chain}")]
    EntryNotFound { chain: String, id: u64 },

    #[error("no agent named \"{name}\" found on {chain}")]
    NameNotFound { chain: String, name: String },

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("runtime error: {0}")]
    Runtime(String),
}

/// Failure of a single registry read call.
#[derive(Error, Debug)]
pub enum RpcError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{method} timed out after {secs}s")]
    Timeout { method: String, secs: u64 },

    #[error("endpoint returned HTTP {0}")]
    Status(u16),

    /// JSON-RPC error object, typically an execution revert.
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("malformed response: {0}")]
    Decode(String),
}

impl RpcError {
    /// True when the node answered but the call itself failed (revert, bad id).
    pub fn is_revert(&self) -> bool {
        matches!(self, RpcError::Rpc { .. })
    }
}

/// Why an off-chain registration document could not be resolved.
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("malformed data URI")]
    InvalidDataUri,

    #[error("base64 decode failed: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("document is not valid registration JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unsupported URI scheme: {0}")]
    UnsupportedScheme(String),

    #[error("fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("fetch returned HTTP {0}")]
    Status(u16),

    #[error("fetch timed out after {0}s")]
    Timeout(u64),
}

/// Cache storage failures. Never propagated past the store.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache at {path} unreadable: {reason}")]
    Unreadable { path: PathBuf, reason: String },

    #[error("cache at {path} unwritable: {reason}")]
    Unwritable { path: PathBuf, reason: String },
}

/// A failure absorbed while assembling one agent record.
#[derive(Debug, Clone, PartialEq)]
pub enum Degradation {
    /// Registration document missing or malformed; an empty registration was used.
    MetadataUnresolvable { id: u64, reason: String },
    /// Reputation facility reverted or is undeployed; zero feedback was used.
    ReputationUnavailable { id: u64, reason: String },
    /// Validation facility reverted or is undeployed; zero proofs were used.
    ValidationUnavailable { id: u64, reason: String },
}

impl Degradation {
    pub fn agent_id(&self) -> u64 {
        match self {
            Degradation::MetadataUnresolvable { id, .. }
            | Degradation::ReputationUnavailable { id, .. }
            | Degradation::ValidationUnavailable { id, .. } => *id,
        }
    }
}
