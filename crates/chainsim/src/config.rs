//! Configuration
//!
//! Explicit immutable configuration values passed to each component at
//! construction. No component reads ambient global state; `main.rs`
//! builds these from CLI arguments.

use std::time::Duration;

/// Per-node relay configuration, shared read-only across request
/// handlers.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Dial timeout for the downstream hop connection.
    pub connect_timeout: Duration,

    /// Disable HTTP connection reuse between hops. Useful when the
    /// experiment should include connection-setup cost in every hop.
    pub disable_keep_alive: bool,

    /// Largest payload a terminus will synthesize. Requests above
    /// this are rejected instead of attempting the allocation.
    pub max_payload_size: u64,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            disable_keep_alive: false,
            max_payload_size: 16 * 1024 * 1024,
        }
    }
}

/// Membership registry configuration.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Etcd endpoints.
    pub endpoints: Vec<String>,

    /// TTL for the membership lease (seconds).
    pub lease_ttl: i64,

    /// Delay before resubscribing after a watch stream failure.
    pub reconnect_delay: Duration,

    /// Initial interval for etcd connection retry.
    pub backoff_initial: Duration,

    /// Maximum interval for etcd connection retry.
    pub backoff_max: Duration,

    /// Maximum elapsed time for etcd connection retries before the
    /// startup failure becomes fatal.
    pub backoff_max_elapsed: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            endpoints: vec!["http://127.0.0.1:2379".to_string()],
            lease_ttl: 5,
            reconnect_delay: Duration::from_secs(5),
            backoff_initial: Duration::from_secs(1),
            backoff_max: Duration::from_secs(10),
            backoff_max_elapsed: Duration::from_secs(60),
        }
    }
}

/// Experiment driver configuration.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Number of trials to run.
    pub count: usize,

    /// Payload size requested from the terminus (bytes).
    pub payload_size: u64,

    /// Include the full sampled chain in each output record.
    pub show_chain: bool,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            count: 1,
            payload_size: 64,
            show_chain: false,
        }
    }
}
