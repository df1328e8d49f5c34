//! Error Taxonomy
//!
//! Domain errors for the relay path and configuration validation.
//! Coordination-store failures are carried as `anyhow` context in the
//! registry module, since they are orchestration failures rather than
//! per-request outcomes.

use axum::http::StatusCode;
use thiserror::Error;

/// Fatal configuration errors. These terminate the process at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("requested chain length {requested} exceeds membership size {available}")]
    ChainTooLong { requested: usize, available: usize },

    #[error("membership is empty, nothing to sample")]
    EmptyMembership,

    #[error("invalid chain-length policy '{0}' (expected 'all', 'random', or a positive integer)")]
    InvalidLengthPolicy(String),

    #[error("no {family} address configured on interface {interface}")]
    NoInterfaceAddress { interface: String, family: &'static str },

    #[error("failed to enumerate network interfaces")]
    InterfaceEnumeration(#[source] local_ip_address::Error),
}

/// Per-hop relay failures. Observed by the caller one hop up, never
/// retried; the root caller sees only success or failure.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("chain is empty, no next hop to contact")]
    EmptyChain,

    #[error("downstream hop unreachable or timed out")]
    Connectivity(#[source] reqwest::Error),

    #[error("downstream hop returned status {0}")]
    HopStatus(StatusCode),

    #[error("failed to read downstream response body")]
    Protocol(#[source] reqwest::Error),
}
