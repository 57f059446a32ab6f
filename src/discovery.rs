//! Agent discovery
//!
//! The identity registry has no `totalSupply`, so the highest assigned id is found by
//! probing. Ids are assigned sequentially without gaps, which makes existence monotonic:
//! if `k` is unassigned so is every id above it. That allows an exponential search for
//! an upper bound followed by a binary search, O(log N) round trips in total.

use crate::config::DiscoveryConfig;
use crate::rpc::RegistryReader;
use async_trait::async_trait;
use tracing::{debug, info};

/// Answers whether an id is assigned.
#[async_trait]
pub trait ExistenceProbe: Send + Sync {
    async fn exists(&self, id: u64) -> bool;
}

/// Existence via `ownerOf`, which reverts for unassigned ids.
pub struct OwnerProbe<'a> {
    reader: &'a dyn RegistryReader,
}

impl<'a> OwnerProbe<'a> {
    pub fn new(reader: &'a dyn RegistryReader) -> Self {
        Self { reader }
    }
}

#[async_trait]
impl ExistenceProbe for OwnerProbe<'_> {
    async fn exists(&self, id: u64) -> bool {
        self.reader.owner_of(id).await.is_ok()
    }
}

/// Number of agents given the highest assigned id.
pub fn agent_count(max_id: Option<u64>) -> u64 {
    max_id.map(|id| id + 1).unwrap_or(0)
}

/// Probing strategy for the highest assigned id.
#[derive(Debug, Clone)]
pub struct Discovery {
    hint: u64,
    ceiling: u64,
}

impl Default for Discovery {
    fn default() -> Self {
        Self::from_config(&DiscoveryConfig::default())
    }
}

impl Discovery {
    pub fn new(hint: u64, ceiling: u64) -> Self {
        Self {
            hint: hint.min(ceiling),
            ceiling,
        }
    }

    pub fn from_config(config: &DiscoveryConfig) -> Self {
        Self::new(config.hint, config.ceiling)
    }

    /// Highest assigned id, or `None` when the registry is empty.
    ///
    /// Results above the safety ceiling are reported as the ceiling.
    pub async fn find_max_id<P: ExistenceProbe + ?Sized>(&self, probe: &P) -> Option<u64> {
        let max_id = if probe.exists(self.hint).await {
            let (lo, hi) = self.expand(probe).await;
            Some(bisect(probe, lo, hi).await)
        } else if self.hint == 0 {
            None
        } else {
            // Every id of [1, hint) may be unassigned; only id 0 needs a separate check.
            let found = bisect(probe, 0, self.hint - 1).await;
            if found == 0 && !probe.exists(0).await {
                None
            } else {
                Some(found)
            }
        };
        info!(hint = self.hint, max_id = ?max_id, "agent discovery finished");
        max_id
    }

    /// Double from the hint until an id is unassigned or the ceiling is passed.
    ///
    /// Returns `(lo, hi)` with `lo` known to exist and the answer within `[lo, hi]`.
    async fn expand<P: ExistenceProbe + ?Sized>(&self, probe: &P) -> (u64, u64) {
        let mut lo = self.hint;
        let mut next = self.hint.saturating_mul(2).max(self.hint + 1);
        while next <= self.ceiling {
            if probe.exists(next).await {
                lo = next;
                next = next.saturating_mul(2);
            } else {
                return (lo, next - 1);
            }
        }
        debug!(ceiling = self.ceiling, "discovery reached the safety ceiling");
        (lo, self.ceiling)
    }
}

/// Largest existing id in `[lo, hi]`, given that `lo` exists.
async fn bisect<P: ExistenceProbe + ?Sized>(probe: &P, mut lo: u64, mut hi: u64) -> u64 {
    while lo < hi {
        let mid = lo + (hi - lo + 1) / 2;
        if probe.exists(mid).await {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    lo
}
