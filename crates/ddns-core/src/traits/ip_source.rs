// # IP Source Trait
//
// Defines the interface for detecting the caller's current public IP address.
//
// ## Implementations
//
// - HTTP echo-service cascade: `ddns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::IpSource;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* IpSource implementation */;
//
//     let current_ip = source.current().await?;
//     println!("public IP: {}", current_ip);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::IpAddr;

/// IP version (v4 or v6)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpVersion {
    V4,
    V6,
}

impl IpVersion {
    /// Address family a DNS record type can hold
    ///
    /// `A` holds IPv4 and `AAAA` holds IPv6. Any other type is returned as
    /// `None`, meaning no family restriction.
    pub fn for_record_type(record_type: &str) -> Option<Self> {
        match record_type {
            "A" => Some(IpVersion::V4),
            "AAAA" => Some(IpVersion::V6),
            _ => None,
        }
    }

    /// Check whether an address belongs to this family
    pub fn matches(&self, ip: &IpAddr) -> bool {
        match self {
            IpVersion::V4 => ip.is_ipv4(),
            IpVersion::V6 => ip.is_ipv6(),
        }
    }
}

/// Trait for IP source implementations
///
/// An IP source answers a single question: what is the public address right
/// now? It is a read-only observer.
///
/// # Trust Level: Semi-Trusted
///
/// ## Allowed Capabilities
/// - ✅ Perform outbound HTTP requests to IP echo services
/// - ✅ Fall back across several services internally
///
/// ## Forbidden Capabilities
/// - ❌ Perform DNS updates (use `DnsProvider`)
/// - ❌ Access state store directly (use `DdnsEngine`)
/// - ❌ Retry a single service or sleep between attempts
/// - ❌ Make decisions about when to update DNS
///
/// Every request an implementation issues must carry a bounded timeout so
/// that `current()` can never block indefinitely.
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Get the current public IP address
    ///
    /// # Returns
    ///
    /// - `Ok(IpAddr)`: The current IP address
    /// - `Err(Error::AllServicesUnavailable)`: If no service produced an address
    async fn current(&self) -> Result<IpAddr, crate::Error>;

    /// Get the IP version this source is restricted to
    ///
    /// Returns `None` if any address family is accepted.
    fn version(&self) -> Option<IpVersion> {
        None
    }
}
