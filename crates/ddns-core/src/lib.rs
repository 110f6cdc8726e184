// # ddns-core
//
// Core library for the DDNS reconciliation client.
//
// ## Architecture Overview
//
// This library keeps one DNS record in line with the caller's public IP:
// - **IpSource**: Trait for detecting the current public IP
// - **DnsProvider**: Trait for looking up and updating DNS records via provider APIs
// - **StateStore**: Trait for the local last-known-good IP cache
// - **DdnsEngine**: Core engine that runs the cache → detect → compare → update flow
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from implementations
// 2. **Dependency Injection**: The engine receives every collaborator explicitly
// 3. **Minimal API Traffic**: An unchanged IP costs zero authenticated calls
// 4. **Library-First**: All core functionality can be used as a library
// 5. **Remote Is Authoritative**: The cache only ever saves calls, it never
//    replaces the remote comparison

pub mod traits;
pub mod engine;
pub mod config;
pub mod error;
pub mod state;

// Re-export core types for convenience
pub use traits::{IpSource, DnsProvider, StateStore};
pub use engine::{DdnsEngine, Decision};
pub use config::{DdnsConfig, RecordTarget};
pub use error::{Error, Result};
pub use state::{MemoryStateStore, FileStateStore};
