//! Relay Node
//!
//! One hop of the chain-relay protocol, served over HTTP.
//!
//! This module contains:
//! - `client`: the downstream hop HTTP client
//! - the axum router and handler implementing consume-and-forward
//!
//! A node with an empty remaining-hop list is the terminus and answers
//! with freshly synthesized random bytes; otherwise it forwards the
//! strict tail to the head hop and relays the returned payload
//! verbatim. Handlers share no mutable state, only the read-only node
//! configuration and the pooled HTTP client.

pub mod client;

use crate::config::NodeConfig;
use crate::protocol::ChainRequest;
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::{debug, warn};

/// Shared relay state, cloned into every handler.
#[derive(Clone)]
pub struct RelayState {
    pub http: reqwest::Client,
    pub config: NodeConfig,
}

impl RelayState {
    pub fn new(config: NodeConfig) -> Result<Self, reqwest::Error> {
        let http = client::build_http_client(&config)?;
        Ok(Self { http, config })
    }
}

/// Create the relay router.
pub fn create_router(state: RelayState) -> Router {
    Router::new()
        .route("/", post(relay_chain))
        .route("/health", get(health_check))
        .with_state(state)
}

/// Liveness probe endpoint.
async fn health_check() -> &'static str {
    "OK"
}

/// Relay endpoint: terminate or forward one chain request.
async fn relay_chain(
    State(state): State<RelayState>,
    Json(request): Json<ChainRequest>,
) -> Result<Vec<u8>, (StatusCode, String)> {
    if request.payload_size > state.config.max_payload_size {
        return Err((
            StatusCode::PAYLOAD_TOO_LARGE,
            format!(
                "payload_size {} exceeds limit {}",
                request.payload_size, state.config.max_payload_size
            ),
        ));
    }

    if request.remaining_hops.is_empty() {
        return Ok(synthesize_payload(request.payload_size));
    }

    debug!(
        remaining = request.remaining_hops.len(),
        payload_size = request.payload_size,
        "Relaying chain request"
    );

    match client::fetch_chain_payload(&state.http, &request.remaining_hops, request.payload_size)
        .await
    {
        Ok(payload) => Ok(payload),
        Err(e) => {
            warn!(error = %e, "Downstream hop failed");
            Err((StatusCode::BAD_GATEWAY, e.to_string()))
        }
    }
}

/// Synthesize the terminus payload from a cryptographically strong
/// random source.
fn synthesize_payload(size: u64) -> Vec<u8> {
    let mut payload = vec![0u8; size as usize];
    OsRng.fill_bytes(&mut payload);
    payload
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_has_requested_size() {
        assert_eq!(synthesize_payload(0).len(), 0);
        assert_eq!(synthesize_payload(16).len(), 16);
        assert_eq!(synthesize_payload(4096).len(), 4096);
    }

    #[test]
    fn test_payloads_are_not_repeated() {
        // 32 random bytes colliding would mean a broken source.
        assert_ne!(synthesize_payload(32), synthesize_payload(32));
    }
}
