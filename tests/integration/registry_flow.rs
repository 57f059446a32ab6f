use std::sync::Arc;

use serde_json::json;
use trustrouter::cache::MemorySnapshotStore;
use trustrouter::error::Degradation;
use trustrouter::{FetchOptions, FindRequest, ListRequest, RouterError, SortField};

use crate::integration::support::{router, router_with, DeadConnector, MockRegistry};

#[tokio::test]
async fn list_ranks_by_trust_and_reports_total() {
    let registry = MockRegistry::new(6);
    registry.set_feedback(1, 9, 90.0);
    registry.set_feedback(4, 99, 70.0);
    registry.set_feedback(5, 1, 20.0);
    let router = router(&registry);

    let listing = router.list(&ListRequest::new("base")).await.unwrap();
    assert_eq!(listing.total, 6);
    assert_eq!(listing.entries.len(), 6);

    let ids: Vec<u64> = listing.entries.iter().map(|e| e.agent.id).collect();
    // 0.6*70 + 0.4*50 = 62.0, 0.6*90 + 0.4*25 = 64.0, then 0.6*20 + 0.4*7.53
    assert_eq!(&ids[..3], &[1, 4, 5]);
    assert_eq!(listing.entries[0].trust_score, 64.0);
    assert_eq!(listing.entries[1].trust_score, 62.0);
    // Unscored agents follow in id order.
    assert_eq!(&ids[3..], &[0, 2, 3]);
}

#[tokio::test]
async fn list_by_name_and_recent() {
    let registry = MockRegistry::new(3);
    registry.set_doc(0, json!({ "name": "Zeta" }));
    registry.set_doc(1, json!({ "name": "alpha" }));
    registry.set_doc(2, json!({ "name": "Beta" }));
    let router = router(&registry);

    let mut request = ListRequest::new("base");
    request.sort = SortField::Name;
    let names: Vec<String> = router
        .list(&request)
        .await
        .unwrap()
        .entries
        .iter()
        .map(|e| e.agent.registration.display_name().to_string())
        .collect();
    assert_eq!(names, vec!["alpha", "Beta", "Zeta"]);

    request.sort = SortField::Recent;
    request.limit = 2;
    let ids: Vec<u64> = router
        .list(&request)
        .await
        .unwrap()
        .entries
        .iter()
        .map(|e| e.agent.id)
        .collect();
    assert_eq!(ids, vec![2, 1]);
}

#[tokio::test]
async fn find_filters_by_task_and_type() {
    let registry = MockRegistry::new(4);
    registry.set_doc(
        0,
        json!({
            "name": "AuditBot",
            "description": "Smart contract security audits",
            "services": [{ "name": "MCP", "endpoint": "https://audit.example/mcp" }],
            "x402Support": true
        }),
    );
    registry.set_doc(
        1,
        json!({
            "name": "AuditLite",
            "description": "Quick audit checklists",
            "services": [{ "name": "a2a", "endpoint": "https://lite.example" }]
        }),
    );
    registry.set_doc(2, json!({ "name": "WeatherOracle" }));
    registry.set_feedback(2, 500, 99.0);
    let router = router(&registry);

    let mut request = FindRequest::new("base");
    request.task = Some("smart contract audit".to_string());
    let found = router.find(&request).await.unwrap();
    let ids: Vec<u64> = found.iter().map(|e| e.agent.id).collect();
    assert_eq!(ids, vec![0, 1]);
    // AuditBot matches all three keywords, AuditLite only "audit".
    assert_eq!(found[0].trust_score, 10.0);
    assert!((found[1].trust_score - 10.0 / 3.0).abs() < 1e-9);

    request.service_type = Some("mcp".to_string());
    let mcp: Vec<u64> = router
        .find(&request)
        .await
        .unwrap()
        .iter()
        .map(|e| e.agent.id)
        .collect();
    assert_eq!(mcp, vec![0]);

    let mut paid = FindRequest::new("base");
    paid.task = Some("audit".to_string());
    paid.service_type = Some("x402".to_string());
    let paid: Vec<u64> = router
        .find(&paid)
        .await
        .unwrap()
        .iter()
        .map(|e| e.agent.id)
        .collect();
    assert_eq!(paid, vec![0]);
}

#[tokio::test]
async fn unreadable_id_is_omitted_without_disturbing_others() {
    let registry = MockRegistry::new(8);
    registry.break_id(6);
    let router = router(&registry);

    let mut options = FetchOptions::new("base");
    options.first = 8;
    let report = router.fetch_agents(&options).await.unwrap();

    // Discovery sees 0..6 only: id 6 reverts, so the highest assigned id looks like 5.
    let ids: Vec<u64> = report.records.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![0, 1, 2, 3, 4, 5]);

    let mut skip = FetchOptions::new("base");
    skip.skip = 2;
    skip.first = 3;
    let page = router.fetch_agents(&skip).await.unwrap();
    let ids: Vec<u64> = page.records.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![2, 3, 4]);
}

#[tokio::test]
async fn broken_id_inside_range_is_reported() {
    let registry = MockRegistry::new(8);
    let router = router(&registry);
    let mut options = FetchOptions::new("base");
    options.first = 8;
    router.fetch_agents(&options).await.unwrap();

    registry.break_id(3);
    options.force_refresh = true;
    // Discovery still finds 7 as the highest id; only id 3 is unreadable.
    let report = router.fetch_agents(&options).await.unwrap();
    let ids: Vec<u64> = report.records.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![0, 1, 2, 4, 5, 6, 7]);
    assert_eq!(report.omitted, vec![3]);

    // Every record degraded on the undeployed validation registry.
    assert!(report
        .degradations
        .iter()
        .all(|d| matches!(d, Degradation::ValidationUnavailable { .. })));

    // The earlier copy of id 3 survives in the cache.
    let snapshot = router.cache().get_any("base").unwrap();
    assert!(snapshot.agents.contains_key(&3));
}

#[tokio::test]
async fn fresh_cache_avoids_the_network_until_forced() {
    let registry = MockRegistry::new(5);
    let router = router(&registry);
    let options = FetchOptions::new("base");

    router.fetch_agents(&options).await.unwrap();
    let calls = registry.owner_calls();
    assert!(calls > 0);

    let cached = router.fetch_agents(&options).await.unwrap();
    assert_eq!(cached.records.len(), 5);
    assert_eq!(registry.owner_calls(), calls);

    registry.set_count(7);
    let mut forced = options.clone();
    forced.force_refresh = true;
    let refreshed = router.fetch_agents(&forced).await.unwrap();
    assert_eq!(refreshed.records.len(), 7);
    assert!(registry.owner_calls() > calls);
    assert_eq!(router.total_agents("base", false).await.unwrap(), 7);
}

#[tokio::test]
async fn total_agents_never_shrinks_in_cache() {
    let registry = MockRegistry::new(10);
    let router = router(&registry);
    assert_eq!(router.total_agents("base", false).await.unwrap(), 10);

    // A flaky endpoint makes the tail look unassigned; callers still see the cached count.
    registry.set_count(4);
    assert_eq!(router.total_agents("base", true).await.unwrap(), 10);
    assert_eq!(router.cache().get_any("base").unwrap().total_agents, 10);

    registry.set_count(12);
    assert_eq!(router.total_agents("base", true).await.unwrap(), 12);
    assert_eq!(router.total_agents("base", false).await.unwrap(), 12);
}

#[tokio::test]
async fn empty_registry_has_no_agents() {
    let registry = MockRegistry::new(0);
    let router = router(&registry);
    assert_eq!(router.total_agents("base", false).await.unwrap(), 0);
    let report = router.fetch_agents(&FetchOptions::new("base")).await.unwrap();
    assert!(report.records.is_empty());
    assert!(router.list(&ListRequest::new("base")).await.unwrap().entries.is_empty());
}

#[tokio::test]
async fn inspect_by_id_and_name() {
    let registry = MockRegistry::new(3);
    registry.set_doc(
        2,
        json!({
            "name": "PriceOracle",
            "endpoints": [{ "name": "A2A", "endpoint": "https://oracle.example/a2a" }],
            "supportedTrust": ["reputation"]
        }),
    );
    registry.set_feedback(2, 9, 90.0);
    let router = router(&registry);

    let by_id = router.inspect("base", "2", false).await.unwrap();
    assert_eq!(by_id.agent.registration.display_name(), "PriceOracle");
    assert_eq!(by_id.agent.registration.services()[0].name, "A2A");
    assert_eq!(by_id.agent.feedback_count, 9);
    assert_eq!(by_id.agent.avg_score, 90.0);
    assert_eq!(by_id.trust_score, 64.0);
    assert_eq!(by_id.agent.owner, format!("0x{:040x}", 0xa002));

    let by_name = router.inspect("base", "oracle", false).await.unwrap();
    assert_eq!(by_name.agent.id, 2);

    assert!(matches!(
        router.inspect("base", "17", false).await,
        Err(RouterError::EntryNotFound { id: 17, .. })
    ));
    assert!(matches!(
        router.inspect("base", "nobody", false).await,
        Err(RouterError::NameNotFound { .. })
    ));
}

#[tokio::test]
async fn dead_endpoints_are_surfaced_with_hint() {
    let router = router_with(Arc::new(DeadConnector), Arc::new(MemorySnapshotStore::new()));
    let err = router
        .list(&ListRequest::new("base-sepolia"))
        .await
        .unwrap_err();
    assert!(matches!(err, RouterError::NoLiveEndpoint { .. }));
    assert!(err.to_string().contains("BASE_SEPOLIA_RPC_URL"));
}
