//! Shared fixtures: an in-process registry, connectors and router builders.

use alloy_primitives::Address;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use trustrouter::cache::{CacheStore, MemorySnapshotStore, SnapshotStore};
use trustrouter::chain::{ChainCatalog, ChainSpec};
use trustrouter::discovery::Discovery;
use trustrouter::endpoint::RegistryConnector;
use trustrouter::error::{RouterError, RpcError};
use trustrouter::resolver::HttpRegistrationResolver;
use trustrouter::rpc::{RegistryReader, ReputationSummary, ValidationSummary};
use trustrouter::TrustRouter;

/// Registry with ids `0..count`, serving registration documents as inline data URIs.
pub struct MockRegistry {
    count: AtomicU64,
    docs: Mutex<HashMap<u64, serde_json::Value>>,
    feedback: Mutex<HashMap<u64, (u64, i128, u8)>>,
    broken: Mutex<HashSet<u64>>,
    pub owner_calls: AtomicUsize,
}

impl MockRegistry {
    pub fn new(count: u64) -> Arc<Self> {
        Arc::new(Self {
            count: AtomicU64::new(count),
            docs: Mutex::new(HashMap::new()),
            feedback: Mutex::new(HashMap::new()),
            broken: Mutex::new(HashSet::new()),
            owner_calls: AtomicUsize::new(0),
        })
    }

    pub fn set_count(&self, count: u64) {
        self.count.store(count, Ordering::SeqCst);
    }

    pub fn set_doc(&self, id: u64, doc: serde_json::Value) {
        self.docs.lock().insert(id, doc);
    }

    /// Feedback with an average of `avg` (two decimals of precision on chain).
    pub fn set_feedback(&self, id: u64, count: u64, avg: f64) {
        let value = (avg * 100.0).round() as i128;
        self.feedback.lock().insert(id, (count, value, 2));
    }

    /// Both the owner and the pointer read fail for `id`.
    pub fn break_id(&self, id: u64) {
        self.broken.lock().insert(id);
    }

    pub fn owner_calls(&self) -> usize {
        self.owner_calls.load(Ordering::SeqCst)
    }

    fn assigned(&self, id: u64) -> bool {
        id < self.count.load(Ordering::SeqCst) && !self.broken.lock().contains(&id)
    }
}

fn revert() -> RpcError {
    RpcError::Rpc {
        code: 3,
        message: "execution reverted: ERC721NonexistentToken".to_string(),
    }
}

#[async_trait]
impl RegistryReader for MockRegistry {
    async fn owner_of(&self, id: u64) -> Result<String, RpcError> {
        self.owner_calls.fetch_add(1, Ordering::SeqCst);
        if self.assigned(id) {
            Ok(format!("0x{:040x}", 0xa000 + id))
        } else {
            Err(revert())
        }
    }

    async fn token_uri(&self, id: u64) -> Result<String, RpcError> {
        if !self.assigned(id) {
            return Err(revert());
        }
        let doc = self
            .docs
            .lock()
            .get(&id)
            .cloned()
            .unwrap_or_else(|| serde_json::json!({ "name": format!("Agent {}", id) }));
        Ok(format!(
            "data:application/json;base64,{}",
            STANDARD.encode(doc.to_string())
        ))
    }

    async fn reputation_clients(&self, id: u64) -> Result<Vec<Address>, RpcError> {
        if self.feedback.lock().contains_key(&id) {
            Ok(vec![Address::with_last_byte(0x11)])
        } else {
            Ok(Vec::new())
        }
    }

    async fn reputation_summary(
        &self,
        id: u64,
        _clients: &[Address],
    ) -> Result<ReputationSummary, RpcError> {
        let (count, value, decimals) = self.feedback.lock().get(&id).copied().ok_or_else(revert)?;
        Ok(ReputationSummary {
            count,
            value,
            decimals,
        })
    }

    async fn validation_summary(&self, _id: u64) -> Result<ValidationSummary, RpcError> {
        // Validation registry is not deployed.
        Err(RpcError::Decode("no contract code".to_string()))
    }
}

/// Connects every chain to the same mock registry.
pub struct StaticConnector(pub Arc<MockRegistry>);

#[async_trait]
impl RegistryConnector for StaticConnector {
    async fn connect(&self, _chain: &ChainSpec) -> Result<Arc<dyn RegistryReader>, RouterError> {
        Ok(self.0.clone())
    }
}

/// Every endpoint is down.
pub struct DeadConnector;

#[async_trait]
impl RegistryConnector for DeadConnector {
    async fn connect(&self, chain: &ChainSpec) -> Result<Arc<dyn RegistryReader>, RouterError> {
        Err(RouterError::NoLiveEndpoint {
            chain: chain.name.clone(),
            env_var: chain.env_var(),
        })
    }
}

pub fn router_with(
    connector: Arc<dyn RegistryConnector>,
    store: Arc<dyn SnapshotStore>,
) -> TrustRouter {
    let resolver = HttpRegistrationResolver::new("https://ipfs.io/ipfs/", Duration::from_secs(1))
        .expect("resolver");
    TrustRouter::with_components(
        ChainCatalog::builtin(),
        CacheStore::new(store, 3_600_000),
        connector,
        Arc::new(resolver),
        Discovery::default(),
        4,
    )
}

/// Router over `registry` with an in-memory cache.
pub fn router(registry: &Arc<MockRegistry>) -> TrustRouter {
    router_with(
        Arc::new(StaticConnector(registry.clone())),
        Arc::new(MemorySnapshotStore::new()),
    )
}
