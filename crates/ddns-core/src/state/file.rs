// # File State Store
//
// File-based implementation of StateStore.
//
// ## Purpose
//
// Keeps the last confirmed IP across process invocations, so a cron-driven
// client can skip API calls while the public IP stays the same.
//
// ## Crash Safety
//
// - Atomic writes: the record is written to `<path>.tmp`, then renamed over
//   the real file, so an interrupted run never leaves half a record behind
// - Corruption: an unreadable file is reported as an error and the engine
//   treats it as a cold start
//
// ## File Format
//
// ```json
// {
//   "ip": "1.2.3.4",
//   "timestamp": "2025-01-09T12:00:00Z"
// }
// ```
//
// Naive timestamps without an offset (`2025-01-09T12:00:00.123456`) are
// accepted on read and taken as UTC.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use std::io::ErrorKind;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::Error;
use crate::traits::state_store::{CachedIpRecord, StateStore};

/// Serializable state file format
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct StateFileFormat {
    ip: IpAddr,
    timestamp: String,
}

impl From<&CachedIpRecord> for StateFileFormat {
    fn from(record: &CachedIpRecord) -> Self {
        Self {
            ip: record.ip,
            timestamp: record
                .observed_at
                .to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

/// File-based single-record state store
///
/// # Example
///
/// ```rust,no_run
/// use ddns_core::state::FileStateStore;
/// use ddns_core::traits::{CachedIpRecord, StateStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileStateStore::new("/var/lib/ddns/current_ip.json");
///
///     store.save(&CachedIpRecord::now("1.2.3.4".parse()?)).await?;
///
///     let cached = store.load().await?;
///     assert_eq!(cached.map(|r| r.ip), Some("1.2.3.4".parse()?));
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    /// Create a store backed by the given file
    ///
    /// Nothing is touched on disk until the first `save`.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get path to temporary file for atomic writes
    ///
    /// Appends `.tmp` rather than replacing the extension, so
    /// `state.json` becomes `state.json.tmp`.
    fn temp_path(&self) -> PathBuf {
        PathBuf::from(format!("{}.tmp", self.path.display()))
    }

    fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
        if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
            return Some(ts.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load(&self) -> Result<Option<CachedIpRecord>, Error> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::debug!("State file does not exist: {}", self.path.display());
                return Ok(None);
            }
            Err(e) => {
                return Err(Error::state_store(format!(
                    "Failed to read state file {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };

        let state_file: StateFileFormat = serde_json::from_str(&content).map_err(|e| {
            Error::state_store(format!(
                "Failed to parse state file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let observed_at = Self::parse_timestamp(&state_file.timestamp).ok_or_else(|| {
            Error::state_store(format!(
                "Invalid timestamp in state file {}: {}",
                self.path.display(),
                state_file.timestamp
            ))
        })?;

        Ok(Some(CachedIpRecord::new(state_file.ip, observed_at)))
    }

    async fn save(&self, record: &CachedIpRecord) -> Result<(), Error> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to create state directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let json = serde_json::to_string(&StateFileFormat::from(record))
            .map_err(|e| Error::state_store(format!("Failed to serialize state: {}", e)))?;

        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.sync_all().await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("State written to file: {}", self.path.display());
        Ok(())
    }
}
