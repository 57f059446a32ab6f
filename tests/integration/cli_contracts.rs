use std::sync::Arc;

use serde_json::json;
use trustrouter::cache::MemorySnapshotStore;
use trustrouter::tooling::cli::{CliContext, Commands, GlobalArgs, OutputFormat};
use trustrouter::SortField;

use crate::integration::support::{router, router_with, DeadConnector, MockRegistry};

fn json_globals() -> GlobalArgs {
    GlobalArgs {
        output: OutputFormat::Json,
        ..Default::default()
    }
}

fn registry() -> Arc<MockRegistry> {
    let registry = MockRegistry::new(3);
    registry.set_doc(
        1,
        json!({
            "name": "PayBot",
            "description": "Pays for things",
            "services": [{ "name": "x402", "endpoint": "https://pay.example/x402" }],
            "x402Support": true,
            "supportedTrust": ["reputation", "crypto-economic"]
        }),
    );
    registry.set_feedback(1, 9, 90.0);
    registry
}

#[test]
fn list_json_contract_has_required_fields() {
    let cli = CliContext::with_router(router(&registry())).unwrap();
    let output = cli
        .execute(
            &Commands::List {
                sort: SortField::Reputation,
                service_type: None,
                limit: 20,
            },
            &json_globals(),
        )
        .unwrap();

    let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(parsed["chain"], "base");
    assert_eq!(parsed["total"], 3);
    let agents = parsed["agents"].as_array().unwrap();
    assert_eq!(agents.len(), 3);

    let top = &agents[0];
    assert_eq!(top["agentId"], 1);
    assert_eq!(top["name"], "PayBot");
    assert_eq!(top["trustScore"], 64.0);
    assert_eq!(top["feedbackCount"], 9);
    assert_eq!(top["avgScore"], 90.0);
    assert_eq!(top["validationCount"], 0);
    assert_eq!(top["validationAvg"], 0.0);
    assert_eq!(top["x402Support"], true);
    assert_eq!(top["x402Endpoint"], "https://pay.example/x402");
    assert!(top["services"].as_array().is_some());
    assert!(top["owner"].as_str().unwrap().starts_with("0x"));
    assert!(top.get("description").is_some());
}

#[test]
fn find_json_contract_filters_by_type() {
    let cli = CliContext::with_router(router(&registry())).unwrap();
    let output = cli
        .execute(
            &Commands::Find {
                task: "pays".to_string(),
                service_type: Some("x402".to_string()),
                limit: 5,
            },
            &json_globals(),
        )
        .unwrap();

    let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(parsed["task"], "pays");
    let agents = parsed["agents"].as_array().unwrap();
    assert_eq!(agents.len(), 1);
    assert_eq!(agents[0]["agentId"], 1);
    assert_eq!(agents[0]["trustScore"], 74.0);
}

#[test]
fn inspect_json_contract_includes_trust_details() {
    let cli = CliContext::with_router(router(&registry())).unwrap();
    let output = cli
        .execute(
            &Commands::Inspect {
                agent: "paybot".to_string(),
            },
            &json_globals(),
        )
        .unwrap();

    let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(parsed["agentId"], 1);
    assert_eq!(parsed["chain"], "base");
    assert_eq!(parsed["supportedTrust"][1], "crypto-economic");
}

#[test]
fn table_output_is_plain_text() {
    let cli = CliContext::with_router(router(&registry())).unwrap();
    let output = cli
        .execute(
            &Commands::Inspect {
                agent: "1".to_string(),
            },
            &GlobalArgs::default(),
        )
        .unwrap();
    assert!(output.contains("PayBot"));
    assert!(output.contains("64.00"));
    assert!(!output.contains('\u{1b}'));
}

#[test]
fn chains_json_lists_override_variables() {
    let cli = CliContext::with_router(router_with(
        Arc::new(DeadConnector),
        Arc::new(MemorySnapshotStore::new()),
    ))
    .unwrap();
    let output = cli.execute(&Commands::Chains, &json_globals()).unwrap();

    let parsed: serde_json::Value = serde_json::from_str(&output).unwrap();
    let chains = parsed.as_array().unwrap();
    let sepolia = chains
        .iter()
        .find(|c| c["name"] == "base-sepolia")
        .unwrap();
    assert_eq!(sepolia["chainId"], 84532);
    assert_eq!(sepolia["envVar"], "BASE_SEPOLIA_RPC_URL");
    assert!(!sepolia["endpoints"].as_array().unwrap().is_empty());
}

#[test]
fn surfaced_errors_reach_the_caller() {
    let cli = CliContext::with_router(router_with(
        Arc::new(DeadConnector),
        Arc::new(MemorySnapshotStore::new()),
    ))
    .unwrap();
    let err = cli
        .execute(
            &Commands::Inspect {
                agent: "0".to_string(),
            },
            &GlobalArgs::default(),
        )
        .unwrap_err();
    assert!(err.to_string().contains("BASE_RPC_URL"));
}
