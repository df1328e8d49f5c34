//! Watch-Driven Lease Renewal
//!
//! Long-lived background loop that keeps this node's registration
//! alive. Instead of heartbeating on a timer, it watches the registry
//! prefix for deletions and re-registers when a deletion turns out to
//! be a genuine lease expiry. A dead watch stream would otherwise
//! leave the node permanently unregistered once its lease lapsed, so
//! the loop resubscribes after any stream failure and re-registers on
//! the way back in to cover expiries it may have missed.

use super::client::RegistryClient;
use anyhow::{anyhow, Result};
use etcd_client::{Event, EventType};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Run the renewal loop for the lifetime of the process.
///
/// `current_lease` is kept up to date with the lease id of the most
/// recent registration so the shutdown path can revoke the right one.
pub async fn run_watch_loop(
    mut registry: RegistryClient,
    key: String,
    url: String,
    current_lease: Arc<AtomicI64>,
) {
    loop {
        match watch_session(&mut registry, &key, &url, &current_lease).await {
            Ok(()) => warn!("Registry watch stream closed, resubscribing"),
            Err(e) => warn!(error = %e, "Registry watch session failed, resubscribing"),
        }

        tokio::time::sleep(registry.reconnect_delay()).await;

        // Our lease may have expired while the watch was down; the
        // expiry event is gone, so re-register unconditionally.
        match registry.register(&key, &url).await {
            Ok(lease_id) => current_lease.store(lease_id, Ordering::Release),
            Err(e) => warn!(error = %e, "Re-registration after watch failure failed"),
        }
    }
}

/// Consume one watch stream until it closes or fails.
async fn watch_session(
    registry: &mut RegistryClient,
    key: &str,
    url: &str,
    current_lease: &AtomicI64,
) -> Result<()> {
    let (_watcher, mut stream) = registry.watch_registry().await?;
    debug!("Registry watch stream established");

    while let Some(resp) = stream.message().await? {
        if resp.canceled() {
            return Err(anyhow!("Watch stream canceled by server"));
        }

        for event in resp.events() {
            if event.event_type() != EventType::Delete {
                continue;
            }

            let action = renewal_action(deleted_key(event) == Some(key), deleted_lease(event));
            match action {
                RenewalAction::Reregister => {
                    // Our own key disappearing means we are
                    // unregistered, no matter whether the cause was
                    // expiry or an administrative clear.
                    info!(key = %key, "Own registration deleted, re-registering");
                    let new_lease = registry.register(key, url).await?;
                    current_lease.store(new_lease, Ordering::Release);
                }
                RenewalAction::CheckLease(lease_id) => {
                    match registry.lease_expired(lease_id).await {
                        Ok(true) => {
                            // Another member's lease lapsed. The
                            // renewal signal is any genuine expiry
                            // under the prefix; re-registering our own
                            // key on it is idempotent.
                            info!(lease_id = lease_id, "Lease expiry detected, re-registering");
                            let new_lease = registry.register(key, url).await?;
                            current_lease.store(new_lease, Ordering::Release);
                        }
                        Ok(false) => {
                            // Explicit delete of another member while
                            // its lease still lives. Each node renews
                            // only itself.
                            debug!(lease_id = lease_id, "Deletion with live lease ignored");
                        }
                        Err(e) => {
                            warn!(lease_id = lease_id, error = %e, "Lease expiry check failed")
                        }
                    }
                }
                RenewalAction::Ignore => {}
            }
        }
    }

    Ok(())
}

/// What a deletion event asks of the renewal loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RenewalAction {
    /// This node's own key is gone; re-register regardless of cause.
    Reregister,
    /// Another member's leased key was deleted; the lease's remaining
    /// TTL decides whether this was a genuine expiry.
    CheckLease(i64),
    /// Unleased key or no previous KV: administrative churn.
    Ignore,
}

/// Decide how to react to a deletion under the registry prefix.
fn renewal_action(own_key: bool, prev_lease: Option<i64>) -> RenewalAction {
    if own_key {
        return RenewalAction::Reregister;
    }
    match prev_lease {
        Some(lease_id) => RenewalAction::CheckLease(lease_id),
        None => RenewalAction::Ignore,
    }
}

/// Key a deletion event removed.
fn deleted_key(event: &Event) -> Option<&str> {
    event.kv().and_then(|kv| kv.key_str().ok())
}

/// Lease id the deleted key was bound to, if any.
fn deleted_lease(event: &Event) -> Option<i64> {
    let prev = event.prev_kv()?;
    match prev.lease() {
        0 => None,
        lease_id => Some(lease_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_own_key_deletion_always_reregisters() {
        // Expiry of our own lease and an administrative clear both
        // leave us unregistered; either way the fix is the same.
        assert_eq!(renewal_action(true, Some(42)), RenewalAction::Reregister);
        assert_eq!(renewal_action(true, None), RenewalAction::Reregister);
    }

    #[test]
    fn test_other_members_lease_is_checked_for_expiry() {
        assert_eq!(renewal_action(false, Some(42)), RenewalAction::CheckLease(42));
    }

    #[test]
    fn test_unleased_deletion_is_ignored() {
        assert_eq!(renewal_action(false, None), RenewalAction::Ignore);
    }
}
