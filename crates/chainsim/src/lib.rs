//! Chainsim Library
//!
//! Service-chain latency simulator: relay nodes discover each other
//! through etcd leases and forward synthetic requests along sampled
//! chains so a loader can measure round-trip time against chain depth.

pub mod config;
pub mod error;
pub mod loader;
pub mod net;
pub mod protocol;
pub mod registry;
pub mod relay;
pub mod sampler;
