//! Typed reads against the identity, reputation and validation registries.

use super::abi::{IIdentityRegistry, IReputationRegistry, IValidationRegistry};
use super::JsonRpcClient;
use crate::chain::RegistryContracts;
use crate::error::RpcError;
use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use async_trait::async_trait;

/// Aggregated feedback for one agent as reported by the reputation registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReputationSummary {
    pub count: u64,
    /// Fixed-point summary value, scaled by `10^decimals`.
    pub value: i128,
    pub decimals: u8,
}

impl ReputationSummary {
    /// Average score as a float clamped to [0, 100].
    pub fn average(&self) -> f64 {
        let raw = self.value as f64 / 10f64.powi(i32::from(self.decimals));
        raw.clamp(0.0, 100.0)
    }
}

/// Aggregated validation proofs for one agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValidationSummary {
    pub count: u64,
    /// Average response in percent.
    pub average: u8,
}

/// Read surface of the registry on one chain.
#[async_trait]
pub trait RegistryReader: Send + Sync {
    /// Owner address; fails when the id is not assigned.
    async fn owner_of(&self, id: u64) -> Result<String, RpcError>;

    /// Metadata pointer for the id.
    async fn token_uri(&self, id: u64) -> Result<String, RpcError>;

    async fn reputation_clients(&self, id: u64) -> Result<Vec<Address>, RpcError>;

    async fn reputation_summary(
        &self,
        id: u64,
        clients: &[Address],
    ) -> Result<ReputationSummary, RpcError>;

    /// Summary over all validators and tags.
    async fn validation_summary(&self, id: u64) -> Result<ValidationSummary, RpcError>;
}

/// [`RegistryReader`] backed by `eth_call` against the deployed contracts.
pub struct ContractRegistry {
    client: JsonRpcClient,
    contracts: RegistryContracts,
}

impl ContractRegistry {
    pub fn new(client: JsonRpcClient, contracts: RegistryContracts) -> Self {
        Self { client, contracts }
    }

    pub fn endpoint(&self) -> &str {
        self.client.url()
    }

    async fn call<C: SolCall>(&self, to: &str, call: C) -> Result<C::Return, RpcError> {
        let data = self.client.call(to, &call.abi_encode()).await?;
        if data.is_empty() {
            // A call to an address without code returns no data at all.
            return Err(RpcError::Decode(format!(
                "{} returned no data from {}",
                C::SIGNATURE,
                to
            )));
        }
        C::abi_decode_returns(&data, true)
            .map_err(|e| RpcError::Decode(format!("{}: {}", C::SIGNATURE, e)))
    }
}

#[async_trait]
impl RegistryReader for ContractRegistry {
    async fn owner_of(&self, id: u64) -> Result<String, RpcError> {
        let call = IIdentityRegistry::ownerOfCall {
            tokenId: U256::from(id),
        };
        let owner = self.call(&self.contracts.identity, call).await?;
        Ok(owner._0.to_checksum(None))
    }

    async fn token_uri(&self, id: u64) -> Result<String, RpcError> {
        let call = IIdentityRegistry::tokenURICall {
            tokenId: U256::from(id),
        };
        Ok(self.call(&self.contracts.identity, call).await?._0)
    }

    async fn reputation_clients(&self, id: u64) -> Result<Vec<Address>, RpcError> {
        let call = IReputationRegistry::getClientsCall {
            agentId: U256::from(id),
        };
        Ok(self.call(&self.contracts.reputation, call).await?._0)
    }

    async fn reputation_summary(
        &self,
        id: u64,
        clients: &[Address],
    ) -> Result<ReputationSummary, RpcError> {
        let call = IReputationRegistry::getSummaryCall {
            agentId: U256::from(id),
            clientAddresses: clients.to_vec(),
            tag1: String::new(),
            tag2: String::new(),
        };
        let summary = self.call(&self.contracts.reputation, call).await?;
        Ok(ReputationSummary {
            count: summary.count,
            value: summary.summaryValue,
            decimals: summary.summaryValueDecimals,
        })
    }

    async fn validation_summary(&self, id: u64) -> Result<ValidationSummary, RpcError> {
        let call = IValidationRegistry::getSummaryCall {
            agentId: U256::from(id),
            validatorAddresses: Vec::new(),
            tag: String::new(),
        };
        let summary = self.call(&self.contracts.validation, call).await?;
        Ok(ValidationSummary {
            count: summary.count,
            average: summary.avgResponse,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::serve_once;
    use std::time::Duration;

    fn contracts() -> RegistryContracts {
        RegistryContracts {
            identity: "0x8004A169FB4a3325136EB29fA0ceB6D2e539a432".to_string(),
            reputation: "0x8004BAa17C55a88189AE136b182e5fdA19dE9b63".to_string(),
            validation: "0x8004000000000000000000000000000000000000".to_string(),
        }
    }

    #[test]
    fn reputation_average_scales_and_clamps() {
        let summary = ReputationSummary {
            count: 3,
            value: 8750,
            decimals: 2,
        };
        assert_eq!(summary.average(), 87.5);

        let negative = ReputationSummary {
            count: 1,
            value: -40,
            decimals: 0,
        };
        assert_eq!(negative.average(), 0.0);

        let huge = ReputationSummary {
            count: 1,
            value: 250,
            decimals: 0,
        };
        assert_eq!(huge.average(), 100.0);
    }

    #[test]
    fn owner_of_call_encodes_selector_and_id() {
        let call = IIdentityRegistry::ownerOfCall {
            tokenId: U256::from(7u64),
        };
        let data = call.abi_encode();
        // ownerOf(uint256)
        assert_eq!(&data[..4], &[0x63, 0x52, 0x21, 0x1e]);
        assert_eq!(data.len(), 36);
        assert_eq!(data[35], 7);
    }

    #[tokio::test]
    async fn owner_of_decodes_address() {
        let url = serve_once(
            "200 OK",
            r#"{"jsonrpc":"2.0","id":1,"result":"0x000000000000000000000000d8da6bf26964af9d7eed9e03e53415d37aa96045"}"#,
        )
        .await;
        let client = JsonRpcClient::new(url, Duration::from_secs(5)).unwrap();
        let registry = ContractRegistry::new(client, contracts());
        let owner = registry.owner_of(1).await.unwrap();
        assert_eq!(owner, "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045");
    }

    #[tokio::test]
    async fn undeployed_contract_is_a_decode_failure() {
        let url = serve_once("200 OK", r#"{"jsonrpc":"2.0","id":1,"result":"0x"}"#).await;
        let client = JsonRpcClient::new(url, Duration::from_secs(5)).unwrap();
        let registry = ContractRegistry::new(client, contracts());
        assert!(matches!(
            registry.validation_summary(1).await,
            Err(RpcError::Decode(_))
        ));
    }
}
