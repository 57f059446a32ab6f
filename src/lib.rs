//! TrustRouter: Reputation-Aware Agent Discovery
//!
//! Read-only client for ERC-8004 agent registries. Discovers how many agents a chain
//! holds, assembles their on-chain and off-chain data with partial-failure tolerance,
//! caches the result per chain and ranks agents by a composite trust score.

pub mod cache;
pub mod chain;
pub mod config;
pub mod discovery;
pub mod endpoint;
pub mod error;
pub mod fetcher;
pub mod logging;
pub mod resolver;
pub mod router;
pub mod rpc;
pub mod scoring;
pub mod tooling;
pub mod types;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::{Degradation, RouterError};
pub use router::{FetchOptions, FindRequest, ListRequest, ListResult, TrustRouter};
pub use scoring::{compute_trust_score, rank, RankOptions, SortField};
pub use types::{AgentRecord, CacheSnapshot, RegistrationFile, ScoredEntry, ServiceEntry};
