//! Registry Operations
//!
//! Etcd-backed membership primitives: connect with backoff, register
//! under a lease, snapshot the member list, administrative clear.

use crate::config::RegistryConfig;
use anyhow::{anyhow, Context, Result};
use backoff::{future::retry, ExponentialBackoff};
use etcd_client::{
    Client, DeleteOptions, GetOptions, PutOptions, WatchOptions, WatchStream, Watcher,
};
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, warn};

/// Prefix under which every member advertises itself.
pub const REGISTRY_PREFIX: &str = "/chainsim/members";

/// Etcd key for a member, derived from its address.
pub fn member_key(ip: &IpAddr, port: u16) -> String {
    format!("{REGISTRY_PREFIX}/{ip}-{port}")
}

/// Callable URL stored as the key's value.
pub fn member_url(ip: &IpAddr, port: u16) -> String {
    match ip {
        IpAddr::V4(v4) => format!("http://{v4}:{port}/"),
        IpAddr::V6(v6) => format!("http://[{v6}]:{port}/"),
    }
}

/// Membership registry client. Owns the lease lifecycle for this node
/// only; it never mutates other members' leases.
#[derive(Clone)]
pub struct RegistryClient {
    client: Client,
    config: RegistryConfig,
}

impl RegistryClient {
    /// Connect to etcd with bounded exponential backoff. Exhausting
    /// the retry budget at startup is fatal to the caller.
    pub async fn connect(config: RegistryConfig) -> Result<Self> {
        let backoff = ExponentialBackoff {
            initial_interval: config.backoff_initial,
            max_interval: config.backoff_max,
            max_elapsed_time: Some(config.backoff_max_elapsed),
            ..Default::default()
        };

        let endpoints = config.endpoints.clone();
        let client = retry(backoff, || async {
            match Client::connect(&endpoints, None).await {
                Ok(client) => {
                    debug!("Connected to etcd");
                    Ok(client)
                }
                Err(e) => {
                    warn!(error = %e, "etcd connection failed, retrying");
                    Err(backoff::Error::transient(e))
                }
            }
        })
        .await
        .map_err(|e| anyhow!("Failed to connect to etcd after retries: {e:?}"))?;

        Ok(Self { client, config })
    }

    /// Register `key -> url` under a fresh lease with the configured
    /// TTL. Returns the lease id.
    pub async fn register(&mut self, key: &str, url: &str) -> Result<i64> {
        let lease = self
            .client
            .lease_grant(self.config.lease_ttl, None)
            .await
            .context("Failed to grant lease")?;
        let lease_id = lease.id();

        let options = PutOptions::new().with_lease(lease_id);
        self.client
            .put(key, url, Some(options))
            .await
            .context("Failed to write registration key")?;

        debug!(
            key = %key,
            lease_id = lease_id,
            ttl = self.config.lease_ttl,
            "Member registered"
        );
        Ok(lease_id)
    }

    /// Snapshot of all member URLs currently under the registry
    /// prefix. No ordering guarantee.
    pub async fn list_members(&mut self) -> Result<Vec<String>> {
        let options = GetOptions::new().with_prefix();
        let resp = self
            .client
            .get(format!("{REGISTRY_PREFIX}/"), Some(options))
            .await
            .context("Failed to list members")?;

        let mut members = Vec::with_capacity(resp.kvs().len());
        for kv in resp.kvs() {
            members.push(kv.value_str()?.to_string());
        }
        Ok(members)
    }

    /// Delete every key under the registry prefix. Administrative
    /// reset between experiment runs; watchers see ordinary deletions
    /// whose leases are still alive and therefore do not treat this
    /// as expiry churn.
    pub async fn clear_all(&mut self) -> Result<i64> {
        let options = DeleteOptions::new().with_prefix();
        let resp = self
            .client
            .delete(format!("{REGISTRY_PREFIX}/"), Some(options))
            .await
            .context("Failed to clear registry")?;
        Ok(resp.deleted())
    }

    /// Revoke a lease so the key disappears promptly on graceful
    /// shutdown instead of lingering for a TTL.
    pub async fn revoke(&mut self, lease_id: i64) {
        match self.client.lease_revoke(lease_id).await {
            Ok(_) => debug!(lease_id = lease_id, "Lease revoked"),
            Err(e) => warn!(lease_id = lease_id, error = %e, "Failed to revoke lease"),
        }
    }

    /// Open a watch stream over the registry prefix. Deletion events
    /// carry the previous key-value pair so the watcher can inspect
    /// the lease the deleted key was bound to.
    pub async fn watch_registry(&mut self) -> Result<(Watcher, WatchStream)> {
        let options = WatchOptions::new().with_prefix().with_prev_key();
        self.client
            .watch(REGISTRY_PREFIX, Some(options))
            .await
            .context("Failed to open registry watch stream")
    }

    /// Delay before resubscribing after a watch stream failure.
    pub fn reconnect_delay(&self) -> Duration {
        self.config.reconnect_delay
    }

    /// Decide whether a lease that a deleted key carried has genuinely
    /// expired. Depending on the etcd version, a TTL query for a
    /// vanished lease answers either `ttl == -1` or a "lease not
    /// found" error; both mean expiry.
    pub async fn lease_expired(&mut self, lease_id: i64) -> Result<bool> {
        match self.client.lease_time_to_live(lease_id, None).await {
            Ok(resp) => Ok(expiry_from_ttl(resp.ttl())),
            Err(e) if is_lease_not_found(&e) => Ok(true),
            Err(e) => Err(e).context("Failed to query lease TTL"),
        }
    }
}

fn expiry_from_ttl(ttl: i64) -> bool {
    ttl == -1
}

fn is_lease_not_found(err: &etcd_client::Error) -> bool {
    err.to_string().contains("lease not found")
}
