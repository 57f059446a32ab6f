//! Registry service
//!
//! [`TrustRouter`] composes endpoint selection, discovery, batch fetching, metadata
//! resolution, caching and ranking behind request values. Each request carries its own
//! `force_refresh` flag; no state other than the cache is shared between calls.

use crate::cache::{now_ms, CacheStore, SnapshotUpdate};
use crate::chain::{ChainCatalog, ChainSpec};
use crate::config::TrustRouterConfig;
use crate::discovery::{agent_count, Discovery, OwnerProbe};
use crate::endpoint::{RegistryConnector, RpcConnector};
use crate::error::RouterError;
use crate::fetcher::{AgentOutcome, BatchFetcher, FetchReport};
use crate::resolver::{HttpRegistrationResolver, MetadataResolver};
use crate::scoring::{compute_trust_score, rank, RankOptions, SortField};
use crate::types::{AgentRecord, ScoredEntry};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Entries scanned when resolving an agent by name.
pub const NAME_SCAN_LIMIT: u64 = 200;

/// Entries scanned by a task search.
pub const FIND_SCAN_LIMIT: u64 = 100;

/// Upper bound on entries fetched for a listing.
pub const LIST_SCAN_CAP: u64 = 100;

/// Range request for [`TrustRouter::fetch_agents`].
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub chain: String,
    /// Number of ids requested.
    pub first: u64,
    /// First id requested.
    pub skip: u64,
    pub force_refresh: bool,
}

impl FetchOptions {
    pub fn new(chain: impl Into<String>) -> Self {
        Self {
            chain: chain.into(),
            first: 50,
            skip: 0,
            force_refresh: false,
        }
    }
}

/// Task search request.
#[derive(Debug, Clone)]
pub struct FindRequest {
    pub chain: String,
    /// Whitespace-separated keywords.
    pub task: Option<String>,
    pub service_type: Option<String>,
    pub limit: usize,
    pub force_refresh: bool,
}

impl FindRequest {
    pub fn new(chain: impl Into<String>) -> Self {
        Self {
            chain: chain.into(),
            task: None,
            service_type: None,
            limit: 5,
            force_refresh: false,
        }
    }
}

/// Listing request.
#[derive(Debug, Clone)]
pub struct ListRequest {
    pub chain: String,
    pub sort: SortField,
    pub service_type: Option<String>,
    pub limit: usize,
    pub force_refresh: bool,
}

impl ListRequest {
    pub fn new(chain: impl Into<String>) -> Self {
        Self {
            chain: chain.into(),
            sort: SortField::default(),
            service_type: None,
            limit: 20,
            force_refresh: false,
        }
    }
}

/// Ranked listing together with the chain's agent count.
#[derive(Debug, Clone)]
pub struct ListResult {
    pub total: u64,
    pub entries: Vec<ScoredEntry>,
}

/// Read-only view of the agent registry across chains.
pub struct TrustRouter {
    catalog: ChainCatalog,
    cache: CacheStore,
    connector: Arc<dyn RegistryConnector>,
    resolver: Arc<dyn MetadataResolver>,
    discovery: Discovery,
    batch_size: usize,
}

impl TrustRouter {
    /// Router over live endpoints as described by `config`.
    pub fn new(config: &TrustRouterConfig) -> Result<Self, RouterError> {
        config.validate()?;
        let catalog = ChainCatalog::with_overrides(&config.chains)?;
        let resolver = HttpRegistrationResolver::new(
            config.fetch.ipfs_gateway.clone(),
            config.fetch.metadata_timeout(),
        )
        .map_err(|e| RouterError::Runtime(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self::with_components(
            catalog,
            CacheStore::from_config(&config.cache),
            Arc::new(RpcConnector::new(config.fetch.rpc_timeout())),
            Arc::new(resolver),
            Discovery::from_config(&config.discovery),
            config.fetch.batch_size,
        ))
    }

    /// Router over explicit components.
    pub fn with_components(
        catalog: ChainCatalog,
        cache: CacheStore,
        connector: Arc<dyn RegistryConnector>,
        resolver: Arc<dyn MetadataResolver>,
        discovery: Discovery,
        batch_size: usize,
    ) -> Self {
        Self {
            catalog,
            cache,
            connector,
            resolver,
            discovery,
            batch_size: batch_size.max(1),
        }
    }

    pub fn catalog(&self) -> &ChainCatalog {
        &self.catalog
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Number of registered agents on `chain`.
    pub async fn total_agents(&self, chain: &str, force_refresh: bool) -> Result<u64, RouterError> {
        let spec = self.catalog.get(chain)?;
        if let Some(snapshot) = self.cache.get_if_fresh(&spec.name, force_refresh) {
            if snapshot.total_agents > 0 {
                debug!(chain = %spec.name, total = snapshot.total_agents, "agent count from cache");
                return Ok(snapshot.total_agents);
            }
        }

        let reader = self.connector.connect(spec).await?;
        let total = agent_count(
            self.discovery
                .find_max_id(&OwnerProbe::new(reader.as_ref()))
                .await,
        );
        let merged = self
            .cache
            .merge(&spec.name, SnapshotUpdate::counted(total, Vec::new(), now_ms()));
        if merged.total_agents > total {
            debug!(
                chain = %spec.name,
                discovered = total,
                total = merged.total_agents,
                "discovery below cached count; keeping cached count"
            );
        }
        Ok(merged.total_agents)
    }

    /// Records for ids `[skip, skip + first)`, in id order.
    ///
    /// Ids that could not be read at all are reported in `omitted`; every other absorbed
    /// failure is listed in `degradations`.
    pub async fn fetch_agents(&self, options: &FetchOptions) -> Result<FetchReport, RouterError> {
        let spec = self.catalog.get(&options.chain)?;
        let start = options.skip;
        let end = options.skip.saturating_add(options.first);

        let cached = self
            .cache
            .get_if_fresh(&spec.name, options.force_refresh)
            .filter(|snapshot| snapshot.total_agents > 0);
        if let Some(snapshot) = &cached {
            if snapshot.covers(start, end) {
                debug!(chain = %spec.name, start, end, "serving range from cache");
                return Ok(FetchReport {
                    records: snapshot.range(start, end),
                    ..Default::default()
                });
            }
        }

        let reader = self.connector.connect(spec).await?;
        let total = match &cached {
            Some(snapshot) => snapshot.total_agents,
            None => agent_count(
                self.discovery
                    .find_max_id(&OwnerProbe::new(reader.as_ref()))
                    .await,
            ),
        };
        let end = end.min(total);

        let mut reused = Vec::new();
        let mut missing = Vec::new();
        for id in start..end.max(start) {
            match cached.as_ref().and_then(|snapshot| snapshot.agents.get(&id)) {
                Some(record) => reused.push(record.clone()),
                None => missing.push(id),
            }
        }

        let fetcher = BatchFetcher::new(reader.as_ref(), self.resolver.as_ref(), self.batch_size);
        let mut report = fetcher.fetch_ids(&missing).await;
        if !report.omitted.is_empty() || !report.degradations.is_empty() {
            info!(
                chain = %spec.name,
                omitted = report.omitted.len(),
                degraded = report.degradations.len(),
                "fetched range with partial data"
            );
        }

        self.cache.merge(
            &spec.name,
            SnapshotUpdate::counted(total, report.records.clone(), now_ms()),
        );

        report.records.extend(reused);
        report.records.sort_by_key(|record| record.id);
        Ok(report)
    }

    /// One agent by id.
    ///
    /// The record is written back without touching the snapshot's agent count or age.
    pub async fn fetch_agent(
        &self,
        chain: &str,
        id: u64,
        force_refresh: bool,
    ) -> Result<AgentRecord, RouterError> {
        let spec = self.catalog.get(chain)?;
        if let Some(record) = self
            .cache
            .get_if_fresh(&spec.name, force_refresh)
            .and_then(|mut snapshot| snapshot.agents.remove(&id))
        {
            return Ok(record);
        }

        let reader = self.connector.connect(spec).await?;
        let fetcher = BatchFetcher::new(reader.as_ref(), self.resolver.as_ref(), 1);
        match fetcher.fetch_one(id).await {
            AgentOutcome::Assembled {
                record,
                owner_known: true,
                ..
            } => {
                self.cache.merge(
                    &spec.name,
                    SnapshotUpdate::records_only(vec![record.clone()], now_ms()),
                );
                Ok(record)
            }
            _ => Err(not_found(spec, id)),
        }
    }

    /// First agent among the first entries whose name equals `name`, else contains it.
    pub async fn find_by_name(
        &self,
        chain: &str,
        name: &str,
        force_refresh: bool,
    ) -> Result<AgentRecord, RouterError> {
        let needle = name.trim().to_lowercase();
        let name_not_found = || RouterError::NameNotFound {
            chain: chain.to_string(),
            name: name.to_string(),
        };
        if needle.is_empty() {
            return Err(name_not_found());
        }

        let report = self
            .fetch_agents(&FetchOptions {
                chain: chain.to_string(),
                first: NAME_SCAN_LIMIT,
                skip: 0,
                force_refresh,
            })
            .await?;
        let lowered = |record: &AgentRecord| {
            record
                .registration
                .name
                .as_deref()
                .unwrap_or("")
                .to_lowercase()
        };
        let exact = report
            .records
            .iter()
            .position(|record| lowered(record) == needle);
        let index = exact.or_else(|| {
            report
                .records
                .iter()
                .position(|record| lowered(record).contains(&needle))
        });
        match index {
            Some(i) => Ok(report.records[i].clone()),
            None => Err(name_not_found()),
        }
    }

    /// Agents ranked for a task.
    pub async fn find(&self, request: &FindRequest) -> Result<Vec<ScoredEntry>, RouterError> {
        let report = self
            .fetch_agents(&FetchOptions {
                chain: request.chain.clone(),
                first: FIND_SCAN_LIMIT,
                skip: 0,
                force_refresh: request.force_refresh,
            })
            .await?;
        Ok(rank(
            &report.records,
            &RankOptions {
                task_keywords: request.task.clone(),
                service_type: request.service_type.clone(),
                sort: SortField::Reputation,
                limit: request.limit,
            },
        ))
    }

    /// Ranked listing plus the chain's agent count.
    pub async fn list(&self, request: &ListRequest) -> Result<ListResult, RouterError> {
        let first = (request.limit as u64).saturating_mul(2).min(LIST_SCAN_CAP);
        let report = self
            .fetch_agents(&FetchOptions {
                chain: request.chain.clone(),
                first,
                skip: 0,
                force_refresh: request.force_refresh,
            })
            .await?;
        // The fetch above refreshed the cache when needed.
        let total = self.total_agents(&request.chain, false).await?;
        let entries = rank(
            &report.records,
            &RankOptions {
                task_keywords: None,
                service_type: request.service_type.clone(),
                sort: request.sort,
                limit: request.limit,
            },
        );
        Ok(ListResult { total, entries })
    }

    /// One agent by numeric id or by name, with its trust score.
    pub async fn inspect(
        &self,
        chain: &str,
        id_or_name: &str,
        force_refresh: bool,
    ) -> Result<ScoredEntry, RouterError> {
        let agent = match id_or_name.trim().parse::<u64>() {
            Ok(id) => self.fetch_agent(chain, id, force_refresh).await?,
            Err(_) => self.find_by_name(chain, id_or_name, force_refresh).await?,
        };
        let trust_score = compute_trust_score(&agent);
        Ok(ScoredEntry { agent, trust_score })
    }
}

fn not_found(spec: &ChainSpec, id: u64) -> RouterError {
    warn!(chain = %spec.name, agent_id = id, "agent not found");
    RouterError::EntryNotFound {
        chain: spec.name.clone(),
        id,
    }
}
