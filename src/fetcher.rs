//! Batch fetcher
//!
//! Assembles [`AgentRecord`]s for many ids. Ids are processed in fixed-size batches;
//! the pipelines of one batch run concurrently and are joined before the next batch
//! starts, which caps in-flight requests at the batch size. A failure for one id never
//! affects the outcome of another.

use crate::error::Degradation;
use crate::resolver::MetadataResolver;
use crate::rpc::RegistryReader;
use crate::types::{AgentRecord, RegistrationFile, UNKNOWN_OWNER};
use futures::future::join_all;
use tracing::{debug, warn};

/// Result of assembling one id.
#[derive(Debug, Clone)]
pub enum AgentOutcome {
    Assembled {
        record: AgentRecord,
        /// False when the owner read failed and the placeholder owner was used.
        owner_known: bool,
        degradations: Vec<Degradation>,
    },
    /// Neither the owner nor the metadata pointer could be read.
    Unreadable { id: u64, reason: String },
}

/// Records assembled from a range, with everything that was absorbed along the way.
#[derive(Debug, Clone, Default)]
pub struct FetchReport {
    /// Assembled records in id order.
    pub records: Vec<AgentRecord>,
    /// Ids left out because nothing could be read for them.
    pub omitted: Vec<u64>,
    pub degradations: Vec<Degradation>,
}

/// Bounded-concurrency fetcher over a registry reader and a metadata resolver.
pub struct BatchFetcher<'a> {
    reader: &'a dyn RegistryReader,
    resolver: &'a dyn MetadataResolver,
    batch_size: usize,
}

impl<'a> BatchFetcher<'a> {
    pub fn new(
        reader: &'a dyn RegistryReader,
        resolver: &'a dyn MetadataResolver,
        batch_size: usize,
    ) -> Self {
        Self {
            reader,
            resolver,
            batch_size: batch_size.max(1),
        }
    }

    /// Fetch `[start, end)`.
    pub async fn fetch_range(&self, start: u64, end: u64) -> FetchReport {
        let ids: Vec<u64> = (start..end).collect();
        self.fetch_ids(&ids).await
    }

    /// Fetch the given ids, batch by batch.
    pub async fn fetch_ids(&self, ids: &[u64]) -> FetchReport {
        let mut report = FetchReport::default();
        for batch in ids.chunks(self.batch_size) {
            let outcomes = join_all(batch.iter().map(|&id| self.fetch_one(id))).await;
            for outcome in outcomes {
                match outcome {
                    AgentOutcome::Assembled {
                        record,
                        degradations,
                        ..
                    } => {
                        report.records.push(record);
                        report.degradations.extend(degradations);
                    }
                    AgentOutcome::Unreadable { id, reason } => {
                        warn!(agent_id = id, "omitting unreadable agent: {}", reason);
                        report.omitted.push(id);
                    }
                }
            }
        }
        report.records.sort_by_key(|record| record.id);
        report
    }

    /// Run the full pipeline for one id.
    pub async fn fetch_one(&self, id: u64) -> AgentOutcome {
        let (owner, pointer) = tokio::join!(self.reader.owner_of(id), self.reader.token_uri(id));

        let mut degradations = Vec::new();
        let (owner, owner_known, pointer) = match (owner, pointer) {
            (Err(owner_err), Err(pointer_err)) => {
                return AgentOutcome::Unreadable {
                    id,
                    reason: format!("owner: {}; token uri: {}", owner_err, pointer_err),
                };
            }
            (Ok(owner), pointer) => (owner, true, pointer),
            (Err(e), pointer) => {
                debug!(agent_id = id, error = %e, "owner unreadable");
                (UNKNOWN_OWNER.to_string(), false, pointer)
            }
        };
        let pointer = match pointer {
            Ok(pointer) => Some(pointer),
            Err(e) => {
                degradations.push(Degradation::MetadataUnresolvable {
                    id,
                    reason: format!("token uri: {}", e),
                });
                None
            }
        };

        let (registration, reputation, validation) = tokio::join!(
            self.registration(id, pointer.as_deref()),
            self.reputation(id),
            self.validation(id),
        );

        let (registration, issue) = registration;
        degradations.extend(issue);
        let ((feedback_count, avg_score), issue) = reputation;
        degradations.extend(issue);
        let ((validation_count, validation_avg), issue) = validation;
        degradations.extend(issue);

        AgentOutcome::Assembled {
            record: AgentRecord {
                id,
                owner,
                registration,
                feedback_count,
                avg_score,
                validation_count,
                validation_avg,
            },
            owner_known,
            degradations,
        }
    }

    async fn registration(
        &self,
        id: u64,
        pointer: Option<&str>,
    ) -> (RegistrationFile, Option<Degradation>) {
        match self.resolver.try_resolve(pointer).await {
            Ok(file) => (file, None),
            Err(e) => {
                debug!(agent_id = id, error = %e, "registration unresolvable");
                (
                    RegistrationFile::default(),
                    Some(Degradation::MetadataUnresolvable {
                        id,
                        reason: e.to_string(),
                    }),
                )
            }
        }
    }

    /// `(feedback_count, avg_score)`, zero when the facility is unavailable.
    async fn reputation(&self, id: u64) -> ((u64, f64), Option<Degradation>) {
        let summary = async {
            let clients = self.reader.reputation_clients(id).await?;
            if clients.is_empty() {
                return Ok((0, 0.0));
            }
            let summary = self.reader.reputation_summary(id, &clients).await?;
            Ok::<_, crate::error::RpcError>((summary.count, summary.average()))
        };
        match summary.await {
            Ok(values) => (values, None),
            Err(e) => {
                debug!(agent_id = id, error = %e, "reputation unavailable");
                (
                    (0, 0.0),
                    Some(Degradation::ReputationUnavailable {
                        id,
                        reason: e.to_string(),
                    }),
                )
            }
        }
    }

    /// `(validation_count, validation_avg)`, zero when the facility is unavailable.
    async fn validation(&self, id: u64) -> ((u64, f64), Option<Degradation>) {
        match self.reader.validation_summary(id).await {
            Ok(summary) => ((summary.count, f64::from(summary.average)), None),
            Err(e) => {
                debug!(agent_id = id, error = %e, "validation unavailable");
                (
                    (0, 0.0),
                    Some(Degradation::ValidationUnavailable {
                        id,
                        reason: e.to_string(),
                    }),
                )
            }
        }
    }
}
