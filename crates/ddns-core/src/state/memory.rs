// # Memory State Store
//
// In-memory implementation of StateStore.
//
// ## Purpose
//
// Provides a state store that doesn't persist across restarts. Useful for
// embedding the engine in a long-running process, and for tests.
//
// ## Crash Behavior
//
// - The cached IP is lost on restart
// - The first run after a restart performs a remote lookup (no harm, the
//   remote record is authoritative)

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::state_store::{CachedIpRecord, StateStore};

/// In-memory single-record state store
///
/// Clones share the same slot.
///
/// # Example
///
/// ```rust,no_run
/// use ddns_core::state::MemoryStateStore;
/// use ddns_core::traits::{CachedIpRecord, StateStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryStateStore::new();
///
///     store.save(&CachedIpRecord::now("1.2.3.4".parse()?)).await?;
///
///     let cached = store.load().await?;
///     assert_eq!(cached.map(|r| r.ip), Some("1.2.3.4".parse()?));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    inner: Arc<RwLock<Option<CachedIpRecord>>>,
}

impl MemoryStateStore {
    /// Create a new empty memory state store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with a record
    pub fn with_record(record: CachedIpRecord) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(record))),
        }
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_none()
    }

    /// Drop the cached record
    pub async fn clear(&self) {
        *self.inner.write().await = None;
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> Result<Option<CachedIpRecord>, Error> {
        Ok(self.inner.read().await.clone())
    }

    async fn save(&self, record: &CachedIpRecord) -> Result<(), Error> {
        *self.inner.write().await = Some(record.clone());
        Ok(())
    }
}
