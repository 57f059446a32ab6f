//! Endpoint selection
//!
//! Picks the first live read endpoint for a chain. Candidates are probed sequentially,
//! the environment override first, so dead endpoints are not hammered in parallel.

use crate::chain::ChainSpec;
use crate::error::{RouterError, RpcError};
use crate::rpc::{ContractRegistry, JsonRpcClient, RegistryReader};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Liveness check for a candidate endpoint.
#[async_trait]
pub trait LivenessProbe: Send + Sync {
    /// Latest block number the endpoint reports.
    async fn latest_block(&self, endpoint: &str) -> Result<u64, RpcError>;
}

/// Probes with `eth_blockNumber`.
pub struct RpcLivenessProbe {
    timeout: Duration,
}

impl RpcLivenessProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

#[async_trait]
impl LivenessProbe for RpcLivenessProbe {
    async fn latest_block(&self, endpoint: &str) -> Result<u64, RpcError> {
        JsonRpcClient::new(endpoint, self.timeout)?
            .block_number()
            .await
    }
}

/// Override endpoint from `{CHAIN}_RPC_URL`, or `ETH_RPC_URL` for ethereum.
pub fn env_override(chain: &ChainSpec) -> Option<String> {
    let read = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
    read(&chain.env_var()).or_else(|| {
        if chain.name == "ethereum" {
            read("ETH_RPC_URL")
        } else {
            None
        }
    })
}

/// Sequential first-success endpoint selector.
pub struct EndpointSelector<P: LivenessProbe> {
    probe: P,
    timeout: Duration,
}

impl<P: LivenessProbe> EndpointSelector<P> {
    pub fn new(probe: P, timeout: Duration) -> Self {
        Self { probe, timeout }
    }

    /// Select using the environment override for the chain, if any.
    pub async fn select(&self, chain: &ChainSpec) -> Result<String, RouterError> {
        self.select_with_override(chain, env_override(chain)).await
    }

    /// Try `preferred` first, then the chain's endpoints in order.
    pub async fn select_with_override(
        &self,
        chain: &ChainSpec,
        preferred: Option<String>,
    ) -> Result<String, RouterError> {
        let candidates = preferred.into_iter().chain(chain.endpoints.iter().cloned());
        for candidate in candidates {
            match tokio::time::timeout(self.timeout, self.probe.latest_block(&candidate)).await {
                Ok(Ok(block)) if block > 0 => {
                    info!(chain = %chain.name, endpoint = %candidate, block, "selected read endpoint");
                    return Ok(candidate);
                }
                Ok(Ok(block)) => {
                    debug!(chain = %chain.name, endpoint = %candidate, block, "endpoint reported no blocks");
                }
                Ok(Err(e)) => {
                    debug!(chain = %chain.name, endpoint = %candidate, error = %e, "endpoint probe failed");
                }
                Err(_) => {
                    debug!(
                        chain = %chain.name,
                        endpoint = %candidate,
                        "endpoint probe timed out after {}s",
                        self.timeout.as_secs()
                    );
                }
            }
        }
        Err(RouterError::NoLiveEndpoint {
            chain: chain.name.clone(),
            env_var: chain.env_var(),
        })
    }
}

/// Produces a registry reader bound to a live endpoint.
#[async_trait]
pub trait RegistryConnector: Send + Sync {
    async fn connect(&self, chain: &ChainSpec) -> Result<Arc<dyn RegistryReader>, RouterError>;
}

/// Connects through [`EndpointSelector`] and `eth_call` reads.
pub struct RpcConnector {
    selector: EndpointSelector<RpcLivenessProbe>,
    rpc_timeout: Duration,
}

impl RpcConnector {
    pub fn new(rpc_timeout: Duration) -> Self {
        Self {
            selector: EndpointSelector::new(RpcLivenessProbe::new(rpc_timeout), rpc_timeout),
            rpc_timeout,
        }
    }
}

#[async_trait]
impl RegistryConnector for RpcConnector {
    async fn connect(&self, chain: &ChainSpec) -> Result<Arc<dyn RegistryReader>, RouterError> {
        let endpoint = self.selector.select(chain).await?;
        let client = JsonRpcClient::new(endpoint, self.rpc_timeout)
            .map_err(|e| RouterError::Runtime(format!("Failed to build RPC client: {}", e)))?;
        Ok(Arc::new(ContractRegistry::new(client, chain.contracts.clone())))
    }
}
