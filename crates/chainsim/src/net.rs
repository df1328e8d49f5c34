//! Local IP Discovery
//!
//! Resolves the node's advertised address from a named network
//! interface. Boundary collaborator: the registry stores whatever
//! address this returns.

use crate::error::ConfigError;
use std::net::IpAddr;
use tracing::debug;

/// Return the first configured address of the given family on the
/// named interface.
pub fn interface_ip(interface: &str, ipv6: bool) -> Result<IpAddr, ConfigError> {
    let netifas =
        local_ip_address::list_afinet_netifas().map_err(ConfigError::InterfaceEnumeration)?;

    let family = if ipv6 { "IPv6" } else { "IPv4" };

    let ip = netifas
        .into_iter()
        .find(|(name, ip)| name == interface && ip.is_ipv6() == ipv6)
        .map(|(_, ip)| ip)
        .ok_or_else(|| ConfigError::NoInterfaceAddress {
            interface: interface.to_string(),
            family,
        })?;

    debug!(interface = %interface, ip = %ip, "Discovered local address");
    Ok(ip)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_interface_is_a_config_error() {
        let err = interface_ip("no-such-interface-0", false).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::NoInterfaceAddress { .. } | ConfigError::InterfaceEnumeration(_)
        ));
    }

    #[test]
    fn test_loopback_has_an_ipv4_address() {
        // "lo" on Linux; skip quietly elsewhere.
        if let Ok(ip) = interface_ip("lo", false) {
            assert!(ip.is_ipv4());
        }
    }
}
