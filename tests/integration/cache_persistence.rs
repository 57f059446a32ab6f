use std::fs;
use std::sync::Arc;

use tempfile::TempDir;
use trustrouter::cache::{JsonFileStore, SledSnapshotStore};
use trustrouter::{FetchOptions, ListRequest};

use crate::integration::support::{router_with, DeadConnector, MockRegistry, StaticConnector};

#[tokio::test]
async fn json_cache_serves_a_later_process_without_network() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("trustrouter").join("cache.json");

    let registry = MockRegistry::new(4);
    registry.set_feedback(3, 9, 90.0);
    let online = router_with(
        Arc::new(StaticConnector(registry.clone())),
        Arc::new(JsonFileStore::new(&path)),
    );
    online.list(&ListRequest::new("base")).await.unwrap();
    assert!(path.exists());

    let raw: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    let base = &raw["base"];
    assert!(base["timestamp"].as_i64().unwrap() > 0);
    assert_eq!(base["totalAgents"], 4);
    assert_eq!(base["agents"]["3"]["agentId"], 3);
    assert_eq!(base["agents"]["3"]["feedbackCount"], 9);
    assert_eq!(base["agents"]["3"]["registration"]["name"], "Agent 3");

    // Every endpoint is down now; the fresh snapshot still answers.
    let offline = router_with(Arc::new(DeadConnector), Arc::new(JsonFileStore::new(&path)));
    let listing = offline.list(&ListRequest::new("base")).await.unwrap();
    assert_eq!(listing.total, 4);
    assert_eq!(listing.entries[0].agent.id, 3);

    // Other chains were never fetched.
    assert!(offline.list(&ListRequest::new("ethereum")).await.is_err());
}

#[tokio::test]
async fn corrupt_cache_falls_back_to_the_registry() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("cache.json");
    fs::write(&path, b"\x00\x01 definitely not json").unwrap();

    let registry = MockRegistry::new(2);
    let router = router_with(
        Arc::new(StaticConnector(registry.clone())),
        Arc::new(JsonFileStore::new(&path)),
    );
    let report = router.fetch_agents(&FetchOptions::new("base")).await.unwrap();
    assert_eq!(report.records.len(), 2);

    // The corrupt document has been replaced.
    let raw: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    assert_eq!(raw["base"]["totalAgents"], 2);
}

#[tokio::test]
async fn sled_cache_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("cache.sled");
    let registry = MockRegistry::new(3);

    {
        let store = SledSnapshotStore::open(&path).unwrap();
        let router = router_with(Arc::new(StaticConnector(registry.clone())), Arc::new(store));
        router.fetch_agents(&FetchOptions::new("base")).await.unwrap();
    }

    let store = SledSnapshotStore::open(&path).unwrap();
    let offline = router_with(Arc::new(DeadConnector), Arc::new(store));
    let report = offline.fetch_agents(&FetchOptions::new("base")).await.unwrap();
    let ids: Vec<u64> = report.records.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![0, 1, 2]);
}
