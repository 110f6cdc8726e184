// # DNS Provider Trait
//
// Defines the interface for reading and updating DNS records via provider APIs.
//
// ## Implementations
//
// - Alibaba Cloud DNS: `ddns-provider-aliyun` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::DnsProvider;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//
//     if let Some(record) = provider.find_record("example.com", "www", "A").await? {
//         provider
//             .update_record(&record.record_id, "www", "A", "1.2.3.4", 600)
//             .await?;
//     }
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

/// A DNS record as stored at the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRecord {
    /// The record ID (provider-specific, opaque)
    pub record_id: String,
    /// The record label (e.g. "@", "www")
    pub rr: String,
    /// The record type (e.g. "A", "AAAA")
    pub record_type: String,
    /// The current record value
    pub value: String,
    /// Time-to-live for the record
    pub ttl: u32,
}

/// Trait for DNS provider implementations
///
/// # Trust Level: Untrusted
///
/// DNS providers are **untrusted** components with strict limitations:
///
/// ## Allowed Capabilities
/// - ✅ Perform HTTP/HTTPS API calls to their endpoints only
/// - ✅ Parse provider-specific responses
/// - ✅ Return success or failure
///
/// ## Forbidden Capabilities
/// - ❌ Implement retry logic or backoff (retry belongs to the scheduler)
/// - ❌ Access state store (owned by `DdnsEngine`)
/// - ❌ Decide whether an update is needed (owned by `DdnsEngine`)
/// - ❌ Create or delete records
///
/// Providers are stateless and single-shot: each method maps to one API call.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Look up a record by label and type
    ///
    /// Returns the first record whose `rr` and `record_type` both match
    /// exactly (case-sensitive).
    ///
    /// # Returns
    ///
    /// - `Ok(Some(RemoteRecord))`: The matching record
    /// - `Ok(None)`: No record with that label and type exists
    /// - `Err(Error::Authentication)`: The credentials were rejected
    /// - `Err(Error::Provider)`: Any other API-level error
    async fn find_record(
        &self,
        domain: &str,
        rr: &str,
        record_type: &str,
    ) -> Result<Option<RemoteRecord>, crate::Error>;

    /// Set the value and TTL of an existing record
    ///
    /// Success must be backed by an explicit success status from the
    /// provider; anything else is reported as `Err(Error::Provider)`.
    async fn update_record(
        &self,
        record_id: &str,
        rr: &str,
        record_type: &str,
        value: &str,
        ttl: u32,
    ) -> Result<(), crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;

    /// Whether `update_record` only pretends to write
    ///
    /// A dry-run update returns `Ok` without changing the record, so the
    /// engine must not treat it as confirmed.
    fn is_dry_run(&self) -> bool {
        false
    }
}
