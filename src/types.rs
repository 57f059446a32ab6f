//! Core types for the agent registry read model.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Placeholder owner for records whose owner could not be read.
pub const UNKNOWN_OWNER: &str = "unknown";

/// Display name for records without a registration name.
pub const UNNAMED: &str = "(unnamed)";

/// One capability an agent exposes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceEntry {
    /// Protocol tag such as `mcp`, `a2a` or `web`.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, deserialize_with = "lenient_list", skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_list", skip_serializing_if = "Option::is_none")]
    pub domains: Option<Vec<String>>,
}

/// Off-chain registration document for one agent.
///
/// Every field is optional. Unknown fields are ignored when parsing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationFile {
    #[serde(default, rename = "type", deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Older registration drafts call this list `endpoints`.
    #[serde(
        default,
        alias = "endpoints",
        deserialize_with = "lenient_list",
        skip_serializing_if = "Option::is_none"
    )]
    pub services: Option<Vec<ServiceEntry>>,
    #[serde(
        default,
        rename = "x402Support",
        alias = "x402support",
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub x402_support: Option<bool>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, deserialize_with = "lenient_list", skip_serializing_if = "Option::is_none")]
    pub supported_trust: Option<Vec<String>>,
}

/// A field of the wrong JSON type reads as absent instead of failing the document.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).ok())
}

/// Like [`lenient`] for lists: elements of the wrong shape are dropped, the rest kept.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Array(items) => Ok(Some(
            items
                .into_iter()
                .filter_map(|item| T::deserialize(item).ok())
                .collect(),
        )),
        _ => Ok(None),
    }
}

impl RegistrationFile {
    pub fn is_empty(&self) -> bool {
        *self == RegistrationFile::default()
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(UNNAMED)
    }

    pub fn services(&self) -> &[ServiceEntry] {
        self.services.as_deref().unwrap_or(&[])
    }

    pub fn supports_x402(&self) -> bool {
        self.x402_support.unwrap_or(false)
    }

    pub fn supported_trust(&self) -> &[String] {
        self.supported_trust.as_deref().unwrap_or(&[])
    }

    /// Endpoint of the first service tagged `x402`, if any.
    pub fn x402_endpoint(&self) -> Option<&str> {
        self.services()
            .iter()
            .find(|svc| svc.name.eq_ignore_ascii_case("x402"))
            .map(|svc| svc.endpoint.as_str())
    }

    /// Lower-cased name and description joined by a space, used for keyword matching.
    pub fn search_text(&self) -> String {
        format!(
            "{} {}",
            self.name.as_deref().unwrap_or(""),
            self.description.as_deref().unwrap_or("")
        )
        .to_lowercase()
    }
}

/// Canonical agent entity assembled from the registry and its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentRecord {
    #[serde(rename = "agentId")]
    pub id: u64,
    pub owner: String,
    #[serde(default)]
    pub registration: RegistrationFile,
    #[serde(default)]
    pub feedback_count: u64,
    /// Average feedback score in [0, 100]; 0 without feedback.
    #[serde(default)]
    pub avg_score: f64,
    #[serde(default)]
    pub validation_count: u64,
    #[serde(default)]
    pub validation_avg: f64,
}

impl AgentRecord {
    /// A record with no metadata and no reputation data.
    pub fn bare(id: u64, owner: impl Into<String>) -> Self {
        Self {
            id,
            owner: owner.into(),
            registration: RegistrationFile::default(),
            feedback_count: 0,
            avg_score: 0.0,
            validation_count: 0,
            validation_avg: 0.0,
        }
    }
}

/// Per-chain persisted snapshot of fetched agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSnapshot {
    /// Creation or last merge time, epoch milliseconds.
    pub timestamp: i64,
    /// Upper bound on known agent ids; never decreases.
    pub total_agents: u64,
    #[serde(default)]
    pub agents: BTreeMap<u64, AgentRecord>,
}

impl CacheSnapshot {
    pub fn new(timestamp: i64) -> Self {
        Self {
            timestamp,
            total_agents: 0,
            agents: BTreeMap::new(),
        }
    }

    /// True when every id of `[start, end)` below `total_agents` is cached.
    pub fn covers(&self, start: u64, end: u64) -> bool {
        (start..end.min(self.total_agents)).all(|id| self.agents.contains_key(&id))
    }

    /// Cached records of `[start, end)` in id order.
    pub fn range(&self, start: u64, end: u64) -> Vec<AgentRecord> {
        let end = end.min(self.total_agents);
        if start >= end {
            return Vec::new();
        }
        self.agents
            .range(start..end)
            .map(|(_, record)| record.clone())
            .collect()
    }
}

/// All cached snapshots keyed by chain name.
pub type CacheMap = BTreeMap<String, CacheSnapshot>;

/// Agent paired with its computed trust score. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredEntry {
    pub agent: AgentRecord,
    pub trust_score: f64,
}
