// # State Store Trait
//
// Defines the interface for the local last-known-good IP cache.
//
// ## Purpose
//
// The state store remembers the address that was last confirmed to be in
// DNS, so that consecutive runs with an unchanged public IP make no
// authenticated API calls at all.
//
// The remote record stays the source of truth. Losing or corrupting the
// cache only costs one extra lookup on the next run.
//
// ## Implementations
//
// - File-based: single JSON document (`FileStateStore`)
// - In-memory: `MemoryStateStore`

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::net::IpAddr;

/// The cached observation: an address and when it was confirmed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedIpRecord {
    /// The last confirmed IP address
    pub ip: IpAddr,
    /// When the address was confirmed
    pub observed_at: DateTime<Utc>,
}

impl CachedIpRecord {
    /// Create a record observed at the given time
    pub fn new(ip: IpAddr, observed_at: DateTime<Utc>) -> Self {
        Self { ip, observed_at }
    }

    /// Create a record observed now
    pub fn now(ip: IpAddr) -> Self {
        Self::new(ip, Utc::now())
    }
}

/// Trait for state store implementations
///
/// A store holds exactly one record, the one for the target this process
/// manages. The record is always read and replaced as a whole.
///
/// # Trust Level: Trusted (Core Component)
///
/// ## Allowed Capabilities
/// - ✅ Perform I/O for persistent storage
///
/// ## Forbidden Capabilities
/// - ❌ Implement business logic (owned by `DdnsEngine`)
/// - ❌ Perform DNS updates (owned by `DnsProvider`)
/// - ❌ Detect IP addresses (owned by `IpSource`)
///
/// Implementations report errors honestly. Swallowing them is the engine's
/// call: a failed `load` becomes a cold start and a failed `save` is logged.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read the cached record
    ///
    /// # Returns
    ///
    /// - `Ok(Some(record))`: A usable cached record
    /// - `Ok(None)`: Nothing cached yet
    /// - `Err(Error)`: The cache exists but could not be read or parsed
    async fn load(&self) -> Result<Option<CachedIpRecord>, crate::Error>;

    /// Replace the cached record
    ///
    /// The whole record is written as one unit; readers never observe a
    /// partially written record.
    async fn save(&self, record: &CachedIpRecord) -> Result<(), crate::Error>;
}
