//! End-to-end relay tests over real loopback sockets.
//!
//! Each test spins up relay nodes on ephemeral ports and drives them
//! through the public chain client, exactly as the loader would.

use chainsim::config::{LoaderConfig, NodeConfig};
use chainsim::error::RelayError;
use chainsim::loader::run_trials;
use chainsim::relay::client::fetch_chain_payload;
use chainsim::relay::{create_router, RelayState};
use chainsim::sampler::LengthPolicy;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::time::Duration;

/// Loopback port 1 refuses connections; used as a dead hop.
const DEAD_HOP: &str = "http://127.0.0.1:1/";

async fn spawn_node() -> String {
    let config = NodeConfig {
        connect_timeout: Duration::from_millis(500),
        ..NodeConfig::default()
    };
    let state = RelayState::new(config).expect("http client");
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve");
    });

    format!("http://{addr}/")
}

#[tokio::test]
async fn test_terminus_returns_exact_payload_size() {
    let node = spawn_node().await;
    let client = reqwest::Client::new();

    for size in [0u64, 1, 16, 4096] {
        let payload = fetch_chain_payload(&client, &[node.clone()], size)
            .await
            .expect("single-hop chain");
        assert_eq!(payload.len() as u64, size);
    }
}

#[tokio::test]
async fn test_three_node_chain_relays_sixteen_bytes() {
    // A forwards to B, B forwards to C, C synthesizes 16 bytes which
    // come back up the chain unchanged.
    let a = spawn_node().await;
    let b = spawn_node().await;
    let c = spawn_node().await;
    let client = reqwest::Client::new();

    let payload = fetch_chain_payload(&client, &[a, b, c], 16)
        .await
        .expect("three-hop chain");
    assert_eq!(payload.len(), 16);
}

#[tokio::test]
async fn test_payload_size_is_independent_of_chain_length() {
    let nodes = vec![
        spawn_node().await,
        spawn_node().await,
        spawn_node().await,
        spawn_node().await,
    ];
    let client = reqwest::Client::new();

    for n in 1..=nodes.len() {
        let payload = fetch_chain_payload(&client, &nodes[..n], 32)
            .await
            .expect("chain");
        assert_eq!(payload.len(), 32, "wrong payload length at depth {n}");
    }
}

#[tokio::test]
async fn test_dead_terminal_hop_fails_the_whole_chain() {
    // C is unreachable: B reports 502 upward, A reports 502 to the
    // root caller. No partial result escapes.
    let a = spawn_node().await;
    let b = spawn_node().await;
    let client = reqwest::Client::new();

    let err = fetch_chain_payload(&client, &[a, b, DEAD_HOP.to_string()], 16)
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::HopStatus(status) if status.as_u16() == 502));
}

#[tokio::test]
async fn test_unreachable_root_is_a_connectivity_error() {
    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_millis(500))
        .build()
        .expect("client");

    let err = fetch_chain_payload(&client, &[DEAD_HOP.to_string()], 16)
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::Connectivity(_)));
}

#[tokio::test]
async fn test_oversized_payload_request_is_rejected() {
    // A terminus must refuse to allocate an absurd payload instead of
    // aborting the node.
    let node = spawn_node().await;
    let client = reqwest::Client::new();

    let err = fetch_chain_payload(&client, &[node], u64::MAX)
        .await
        .unwrap_err();
    assert!(matches!(err, RelayError::HopStatus(status) if status.as_u16() == 413));
}

#[tokio::test]
async fn test_payload_at_the_limit_is_served() {
    let node = spawn_node().await;
    let client = reqwest::Client::new();

    let limit = NodeConfig::default().max_payload_size;
    let payload = fetch_chain_payload(&client, &[node], limit)
        .await
        .expect("payload at the configured limit");
    assert_eq!(payload.len() as u64, limit);
}

#[tokio::test]
async fn test_malformed_request_body_is_rejected() {
    let node = spawn_node().await;
    let client = reqwest::Client::new();

    let resp = client
        .post(&node)
        .header("content-type", "application/json")
        .body("not json")
        .send()
        .await
        .expect("send");
    assert!(resp.status().is_client_error());
}

#[tokio::test]
async fn test_health_endpoint() {
    let node = spawn_node().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{node}health"))
        .send()
        .await
        .expect("send");
    assert!(resp.status().is_success());
}

#[tokio::test]
async fn test_loader_measures_live_members_and_survives_dead_ones() {
    let live = spawn_node().await;
    let client = reqwest::Client::builder()
        .connect_timeout(Duration::from_millis(500))
        .build()
        .expect("client");
    let mut rng = StdRng::seed_from_u64(3);

    // Live run: every trial records a non-negative duration.
    let config = LoaderConfig {
        count: 3,
        payload_size: 16,
        show_chain: false,
    };
    let mut out = Vec::new();
    run_trials(
        &client,
        std::slice::from_ref(&live),
        LengthPolicy::All,
        &config,
        &mut rng,
        &mut out,
    )
    .await
    .expect("loader run");

    let text = String::from_utf8(out).unwrap();
    let records: Vec<&str> = text.lines().skip(1).collect();
    assert_eq!(records.len(), 3);
    for record in &records {
        let duration: f64 = record.split(',').nth(1).unwrap().parse().unwrap();
        assert!(duration >= 0.0, "live trial recorded failure: {record}");
    }

    // Dead run: sentinel per trial, run completes.
    let mut out = Vec::new();
    run_trials(
        &client,
        &[DEAD_HOP.to_string()],
        LengthPolicy::All,
        &config,
        &mut rng,
        &mut out,
    )
    .await
    .expect("loader run over dead member");

    let text = String::from_utf8(out).unwrap();
    let records: Vec<&str> = text.lines().skip(1).collect();
    assert_eq!(records.len(), 3);
    for record in &records {
        assert_eq!(*record, "1,-1.000000");
    }
}
