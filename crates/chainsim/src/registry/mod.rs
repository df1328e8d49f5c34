//! Membership Registry
//!
//! Keeps this node's advertisement alive in etcd and provides
//! membership snapshots to the sampler.
//!
//! This module contains:
//! - `client`: etcd connection, registration, snapshot and clear
//! - `watcher`: the watch-driven lease renewal loop
//!
//! Renewal is reactive rather than timer-driven: instead of a periodic
//! heartbeat, the node watches the registry prefix for deletions and
//! re-registers itself when a deletion turns out to be a genuine lease
//! expiry. All consistency is delegated to etcd; no client-side
//! locking is needed.

mod client;
mod watcher;

pub use client::{member_key, member_url, RegistryClient, REGISTRY_PREFIX};
pub use watcher::run_watch_loop;
