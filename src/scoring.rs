//! Trust scoring and ranking

use crate::types::{AgentRecord, ScoredEntry};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Service type that selects on the payment-capability flag instead of service names.
pub const X402_PSEUDO_TYPE: &str = "x402";

/// Default number of ranked entries returned.
pub const DEFAULT_RANK_LIMIT: usize = 20;

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Composite trust score in [0, 100].
///
/// 60% average feedback score, 40% activity, where activity grows with the logarithm
/// of the feedback count and saturates at 100.
pub fn compute_trust_score(record: &AgentRecord) -> f64 {
    let reputation = if record.avg_score.is_nan() {
        0.0
    } else {
        record.avg_score.clamp(0.0, 100.0)
    };
    let activity = if record.feedback_count == 0 {
        0.0
    } else {
        (25.0 * (record.feedback_count as f64 + 1.0).log10()).min(100.0)
    };
    round2(0.6 * reputation + 0.4 * activity)
}

/// Ranking order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    /// Trust score, highest first.
    #[default]
    Reputation,
    /// Display name, ascending.
    Name,
    /// Id, highest first, as a proxy for registration recency.
    Recent,
}

impl FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reputation" => Ok(SortField::Reputation),
            "name" => Ok(SortField::Name),
            "recent" => Ok(SortField::Recent),
            other => Err(format!(
                "unknown sort field: {} (expected reputation, name or recent)",
                other
            )),
        }
    }
}

impl fmt::Display for SortField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortField::Reputation => write!(f, "reputation"),
            SortField::Name => write!(f, "name"),
            SortField::Recent => write!(f, "recent"),
        }
    }
}

/// Filter, sort and limit settings for [`rank`].
#[derive(Debug, Clone)]
pub struct RankOptions {
    /// Whitespace-separated keywords matched against name and description.
    pub task_keywords: Option<String>,
    /// Service name to require, or `x402` for the payment-capability flag.
    pub service_type: Option<String>,
    pub sort: SortField,
    pub limit: usize,
}

impl Default for RankOptions {
    fn default() -> Self {
        Self {
            task_keywords: None,
            service_type: None,
            sort: SortField::default(),
            limit: DEFAULT_RANK_LIMIT,
        }
    }
}

fn matches_service_type(record: &AgentRecord, service_type: &str) -> bool {
    if service_type.eq_ignore_ascii_case(X402_PSEUDO_TYPE) {
        return record.registration.supports_x402();
    }
    record
        .registration
        .services()
        .iter()
        .any(|svc| svc.name.eq_ignore_ascii_case(service_type))
}

/// Relevance bonus in [0, 10], or `None` when no keyword matches.
fn relevance_bonus(record: &AgentRecord, keywords: &[String]) -> Option<f64> {
    let text = record.registration.search_text();
    let matched = keywords.iter().filter(|kw| text.contains(kw.as_str())).count();
    if matched == 0 {
        None
    } else {
        Some(matched as f64 / keywords.len() as f64 * 10.0)
    }
}

fn compare_names(a: &AgentRecord, b: &AgentRecord) -> Ordering {
    let (a, b) = (a.registration.display_name(), b.registration.display_name());
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

/// Score, filter, sort and truncate `records`.
///
/// The keyword bonus is added on top of the trust score without re-clamping, so a
/// ranked score may slightly exceed 100. Ties break on id so the order is total.
pub fn rank(records: &[AgentRecord], options: &RankOptions) -> Vec<ScoredEntry> {
    let service_type = options
        .service_type
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty());
    let keywords: Vec<String> = options
        .task_keywords
        .as_deref()
        .unwrap_or("")
        .split_whitespace()
        .map(str::to_lowercase)
        .collect();

    let mut ranked: Vec<ScoredEntry> = records
        .iter()
        .filter(|record| service_type.map_or(true, |t| matches_service_type(record, t)))
        .filter_map(|record| {
            let base = compute_trust_score(record);
            let trust_score = if keywords.is_empty() {
                base
            } else {
                base + relevance_bonus(record, &keywords)?
            };
            Some(ScoredEntry {
                agent: record.clone(),
                trust_score,
            })
        })
        .collect();

    ranked.sort_by(|a, b| match options.sort {
        SortField::Reputation => b
            .trust_score
            .total_cmp(&a.trust_score)
            .then_with(|| a.agent.id.cmp(&b.agent.id)),
        SortField::Name => compare_names(&a.agent, &b.agent).then_with(|| a.agent.id.cmp(&b.agent.id)),
        SortField::Recent => b.agent.id.cmp(&a.agent.id),
    });
    ranked.truncate(options.limit);
    ranked
}
