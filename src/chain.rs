//! Chain catalog
//!
//! Built-in read endpoints and registry contract addresses for every supported chain,
//! plus the configuration overlay that can replace or extend them.

use crate::config::ChainOverride;
use crate::error::RouterError;
use std::collections::BTreeMap;

const IDENTITY_REGISTRY: &str = "0x8004A169FB4a3325136EB29fA0ceB6D2e539a432";
const REPUTATION_REGISTRY: &str = "0x8004BAa17C55a88189AE136b182e5fdA19dE9b63";
/// Validation registry is not deployed yet; reads against it degrade to zero.
const VALIDATION_REGISTRY: &str = "0x8004000000000000000000000000000000000000";

const TESTNET_IDENTITY_REGISTRY: &str = "0x8004A818BFB912233c491871b3d84c89A494BD9e";
const TESTNET_REPUTATION_REGISTRY: &str = "0x8004B663056A597Dffe9eCcC1965A193B7388713";

/// Registry contract addresses on one chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryContracts {
    pub identity: String,
    pub reputation: String,
    pub validation: String,
}

impl RegistryContracts {
    fn mainnet() -> Self {
        Self {
            identity: IDENTITY_REGISTRY.to_string(),
            reputation: REPUTATION_REGISTRY.to_string(),
            validation: VALIDATION_REGISTRY.to_string(),
        }
    }

    fn testnet() -> Self {
        Self {
            identity: TESTNET_IDENTITY_REGISTRY.to_string(),
            reputation: TESTNET_REPUTATION_REGISTRY.to_string(),
            validation: VALIDATION_REGISTRY.to_string(),
        }
    }
}

/// Everything needed to read the registry on one chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainSpec {
    pub name: String,
    pub chain_id: u64,
    /// Candidate read endpoints, tried in order.
    pub endpoints: Vec<String>,
    pub contracts: RegistryContracts,
}

impl ChainSpec {
    /// Environment variable that supplies a preferred endpoint for this chain.
    pub fn env_var(&self) -> String {
        rpc_env_var(&self.name)
    }
}

/// `{CHAIN}_RPC_URL`, upper-cased with every non-alphanumeric character replaced by `_`.
pub fn rpc_env_var(chain: &str) -> String {
    let mut key: String = chain
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    key.push_str("_RPC_URL");
    key
}

fn builtin(name: &str, chain_id: u64, endpoints: &[&str], testnet: bool) -> ChainSpec {
    ChainSpec {
        name: name.to_string(),
        chain_id,
        endpoints: endpoints.iter().map(|e| e.to_string()).collect(),
        contracts: if testnet {
            RegistryContracts::testnet()
        } else {
            RegistryContracts::mainnet()
        },
    }
}

fn builtin_chains() -> Vec<ChainSpec> {
    vec![
        builtin(
            "ethereum",
            1,
            &[
                "https://eth.drpc.org",
                "https://eth.llamarpc.com",
                "https://rpc.ankr.com/eth",
                "https://ethereum-rpc.publicnode.com",
                "https://endpoints.omniatech.io/v1/eth/mainnet/public",
            ],
            false,
        ),
        builtin(
            "base",
            8453,
            &[
                "https://mainnet.base.org",
                "https://base.drpc.org",
                "https://base.llamarpc.com",
                "https://rpc.ankr.com/base",
                "https://base-rpc.publicnode.com",
                "https://endpoints.omniatech.io/v1/base/mainnet/public",
            ],
            false,
        ),
        builtin(
            "arbitrum",
            42161,
            &[
                "https://arb1.arbitrum.io/rpc",
                "https://arbitrum.drpc.org",
                "https://rpc.ankr.com/arbitrum",
                "https://arbitrum-one-rpc.publicnode.com",
                "https://endpoints.omniatech.io/v1/arbitrum/one/public",
            ],
            false,
        ),
        builtin(
            "polygon",
            137,
            &[
                "https://polygon-rpc.com",
                "https://polygon.drpc.org",
                "https://polygon.llamarpc.com",
                "https://rpc.ankr.com/polygon",
                "https://polygon-bor-rpc.publicnode.com",
                "https://endpoints.omniatech.io/v1/matic/mainnet/public",
            ],
            false,
        ),
        builtin(
            "avalanche",
            43114,
            &[
                "https://api.avax.network/ext/bc/C/rpc",
                "https://avalanche.drpc.org",
                "https://rpc.ankr.com/avalanche",
                "https://avalanche-c-chain-rpc.publicnode.com",
            ],
            false,
        ),
        builtin(
            "bnb",
            56,
            &[
                "https://bsc-dataseed.binance.org",
                "https://bsc.drpc.org",
                "https://rpc.ankr.com/bsc",
                "https://bsc-rpc.publicnode.com",
            ],
            false,
        ),
        builtin(
            "gnosis",
            100,
            &[
                "https://rpc.gnosischain.com",
                "https://gnosis.drpc.org",
                "https://rpc.ankr.com/gnosis",
                "https://gnosis-rpc.publicnode.com",
            ],
            false,
        ),
        builtin(
            "linea",
            59144,
            &[
                "https://rpc.linea.build",
                "https://linea.drpc.org",
                "https://linea-rpc.publicnode.com",
            ],
            false,
        ),
        builtin(
            "celo",
            42220,
            &[
                "https://forno.celo.org",
                "https://celo.drpc.org",
                "https://rpc.ankr.com/celo",
            ],
            false,
        ),
        builtin(
            "sepolia",
            11155111,
            &[
                "https://sepolia.drpc.org",
                "https://rpc.ankr.com/eth_sepolia",
                "https://ethereum-sepolia-rpc.publicnode.com",
            ],
            true,
        ),
        builtin(
            "base-sepolia",
            84532,
            &[
                "https://sepolia.base.org",
                "https://base-sepolia.drpc.org",
                "https://rpc.ankr.com/base_sepolia",
            ],
            true,
        ),
    ]
}

/// Ordered set of chains the router can read.
#[derive(Debug, Clone)]
pub struct ChainCatalog {
    chains: Vec<ChainSpec>,
}

impl Default for ChainCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ChainCatalog {
    pub fn builtin() -> Self {
        Self {
            chains: builtin_chains(),
        }
    }

    /// Catalog from explicit specs, mainly for tests and embedding.
    pub fn from_specs(chains: Vec<ChainSpec>) -> Self {
        Self { chains }
    }

    /// Built-in catalog with configured overrides applied.
    ///
    /// Overrides for unknown chains add a new entry; it needs at least one endpoint and
    /// inherits mainnet contract addresses unless given.
    pub fn with_overrides(overrides: &BTreeMap<String, ChainOverride>) -> Result<Self, RouterError> {
        let mut catalog = Self::builtin();
        for (name, over) in overrides {
            match catalog.chains.iter_mut().find(|c| &c.name == name) {
                Some(spec) => apply_override(spec, over),
                None => {
                    let endpoints = over.endpoints.clone().unwrap_or_default();
                    if endpoints.is_empty() {
                        return Err(RouterError::ConfigError(format!(
                            "chain {} is not built in and has no endpoints configured",
                            name
                        )));
                    }
                    let mut spec = ChainSpec {
                        name: name.clone(),
                        chain_id: over.chain_id.unwrap_or(0),
                        endpoints,
                        contracts: RegistryContracts::mainnet(),
                    };
                    apply_override(&mut spec, over);
                    catalog.chains.push(spec);
                }
            }
        }
        Ok(catalog)
    }

    pub fn names(&self) -> Vec<&str> {
        self.chains.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn specs(&self) -> &[ChainSpec] {
        &self.chains
    }

    pub fn get(&self, chain: &str) -> Result<&ChainSpec, RouterError> {
        self.chains
            .iter()
            .find(|c| c.name == chain)
            .ok_or_else(|| RouterError::UnsupportedChain {
                chain: chain.to_string(),
                supported: self.names().join(", "),
            })
    }
}

fn apply_override(spec: &mut ChainSpec, over: &ChainOverride) {
    if let Some(endpoints) = &over.endpoints {
        if !endpoints.is_empty() {
            spec.endpoints = endpoints.clone();
        }
    }
    if let Some(chain_id) = over.chain_id {
        spec.chain_id = chain_id;
    }
    if let Some(identity) = &over.identity_registry {
        spec.contracts.identity = identity.clone();
    }
    if let Some(reputation) = &over.reputation_registry {
        spec.contracts.reputation = reputation.clone();
    }
    if let Some(validation) = &over.validation_registry {
        spec.contracts.validation = validation.clone();
    }
}

/// Names of the built-in chains.
pub fn supported_chains() -> Vec<String> {
    builtin_chains().into_iter().map(|c| c.name).collect()
}
