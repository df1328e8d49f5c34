//! Downstream Hop Client
//!
//! Issues one chain request to the next hop and returns the payload it
//! relays back. Pure with respect to node state: everything the call
//! needs arrives as arguments, and a failed hop is reported upward
//! immediately with no retry.

use crate::config::NodeConfig;
use crate::error::RelayError;
use crate::protocol::ChainRequest;
use tracing::debug;

/// Build the HTTP client used for downstream hops.
///
/// `disable_keep_alive` empties the connection pool so every hop pays
/// full connection-setup cost, which some experiments want to measure.
pub fn build_http_client(config: &NodeConfig) -> Result<reqwest::Client, reqwest::Error> {
    let mut builder = reqwest::Client::builder().connect_timeout(config.connect_timeout);

    if config.disable_keep_alive {
        builder = builder.pool_max_idle_per_host(0);
    }

    builder.build()
}

/// Contact the head of `chain` and ask it to resolve the rest.
///
/// The head consumes itself: the forwarded request carries the strict
/// tail, so the remaining-hop list shrinks by one at every hop until
/// the terminus synthesizes the payload.
pub async fn fetch_chain_payload(
    client: &reqwest::Client,
    chain: &[String],
    payload_size: u64,
) -> Result<Vec<u8>, RelayError> {
    let (next_hop, tail) = chain.split_first().ok_or(RelayError::EmptyChain)?;

    let request = ChainRequest {
        remaining_hops: tail.to_vec(),
        payload_size,
    };

    debug!(next_hop = %next_hop, remaining = tail.len(), "Forwarding chain request");

    let response = client
        .post(next_hop)
        .json(&request)
        .send()
        .await
        .map_err(RelayError::Connectivity)?;

    let status = response.status();
    if !status.is_success() {
        return Err(RelayError::HopStatus(status));
    }

    let body = response.bytes().await.map_err(RelayError::Protocol)?;
    Ok(body.to_vec())
}
