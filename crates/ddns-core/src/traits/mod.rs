//! Core traits for the DDNS system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`IpSource`]: Detect the current public IP address
//! - [`DnsProvider`]: Look up and update DNS records via provider APIs
//! - [`StateStore`]: Local cache of the last confirmed IP

pub mod ip_source;
pub mod dns_provider;
pub mod state_store;

pub use ip_source::{IpSource, IpVersion};
pub use dns_provider::{DnsProvider, RemoteRecord};
pub use state_store::{StateStore, CachedIpRecord};
