//! Core DDNS engine
//!
//! The DdnsEngine is responsible for:
//! - Reading the locally cached IP
//! - Detecting the current public IP via IpSource
//! - Deciding whether the DNS record needs an update
//! - Updating the record via DnsProvider
//! - Persisting the confirmed IP after a successful pass
//!
//! ## Architecture
//!
//! ```text
//!                            ┌──────────────┐
//!                            │  DdnsEngine  │
//!                            └──────────────┘
//!                                     │
//!         ┌───────────────────────────┼───────────────────────────┐
//!         │                           │                           │
//!         ▼                           ▼                           ▼
//! ┌─────────────┐           ┌──────────────┐           ┌─────────────┐
//! │ StateStore  │           │   IpSource   │           │ DnsProvider │
//! │ (cache)     │           │   (detect)   │           │ (find/set)  │
//! └─────────────┘           └──────────────┘           └─────────────┘
//! ```
//!
//! ## Reconciliation Flow
//!
//! 1. Load the cached IP (a missing or broken cache is a cold start)
//! 2. Detect the current IP; if every service fails, stop here
//! 3. Cached IP equals detected IP → done, no API call at all
//! 4. Look up the remote record; absent → configuration error
//! 5. Remote value equals detected IP → refresh the cache, no update call
//! 6. Otherwise update the record; only on success refresh the cache (a
//!    dry-run provider never refreshes it)

use crate::config::RecordTarget;
use crate::error::{Error, Result};
use crate::traits::{CachedIpRecord, DnsProvider, IpSource, StateStore};
use std::future::Future;
use std::net::IpAddr;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Outcome of a successful reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Detected IP matched the local cache; no remote call was made
    NoopCacheHit,
    /// Remote record already held the detected IP; only the cache was refreshed
    NoopRemoteMatch,
    /// Remote record was updated to the detected IP
    UpdateRequired,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Decision::NoopCacheHit => "cache hit",
            Decision::NoopRemoteMatch => "remote match",
            Decision::UpdateRequired => "updated",
        };
        f.write_str(name)
    }
}

/// Core DDNS engine
///
/// The engine reconciles one DNS record against the observed public IP.
/// All collaborators are injected, so each can be replaced by a test double.
///
/// ## Lifecycle
///
/// - One-shot (cron): call [`DdnsEngine::reconcile()`] once per invocation
/// - Loop: call [`DdnsEngine::run()`] to reconcile on a fixed interval until
///   ctrl-c
///
/// Runs against the same target must not overlap; the engine takes no lock.
pub struct DdnsEngine {
    /// IP source for detecting the public address
    ip_source: Box<dyn IpSource>,

    /// DNS provider for reading and updating the record
    provider: Box<dyn DnsProvider>,

    /// Local cache of the last confirmed IP
    state_store: Box<dyn StateStore>,

    /// The record to manage
    target: RecordTarget,
}

impl DdnsEngine {
    /// Create a new DDNS engine
    ///
    /// # Parameters
    ///
    /// - `ip_source`: IP source implementation
    /// - `provider`: DNS provider implementation
    /// - `state_store`: State store implementation
    /// - `target`: The record to reconcile
    pub fn new(
        ip_source: Box<dyn IpSource>,
        provider: Box<dyn DnsProvider>,
        state_store: Box<dyn StateStore>,
        target: RecordTarget,
    ) -> Self {
        Self {
            ip_source,
            provider,
            state_store,
            target,
        }
    }

    /// The record this engine manages
    pub fn target(&self) -> &RecordTarget {
        &self.target
    }

    /// Run one reconciliation pass
    ///
    /// # Returns
    ///
    /// - `Ok(Decision)`: The pass completed; the decision says what it did
    /// - `Err(Error)`: Detection, lookup or update failed; the cache is untouched
    pub async fn reconcile(&self) -> Result<Decision> {
        let target = &self.target;
        info!("Starting DDNS reconciliation for {}", target);

        let cached = self.load_cache().await;

        let detected = self.ip_source.current().await?;
        info!("Current public IP: {}", detected);

        if let Some(cached) = &cached
            && cached.ip == detected
        {
            info!(
                "IP unchanged since last run (cached at {}), no update needed ({})",
                cached.observed_at, detected
            );
            return Ok(Decision::NoopCacheHit);
        }

        let record = self
            .provider
            .find_record(&target.domain, &target.rr, &target.record_type)
            .await?
            .ok_or_else(|| {
                Error::record_not_found(&target.rr, &target.domain, &target.record_type)
            })?;

        debug!(
            "Remote record {} currently holds {}",
            record.record_id, record.value
        );

        if same_address(&record.value, detected) {
            self.persist(detected).await;
            info!(
                "DNS record already up to date, refreshed local cache ({})",
                detected
            );
            return Ok(Decision::NoopRemoteMatch);
        }

        info!(
            "IP changed, updating {} from {} to {}",
            target, record.value, detected
        );

        self.provider
            .update_record(
                &record.record_id,
                &target.rr,
                &target.record_type,
                &detected.to_string(),
                target.ttl,
            )
            .await
            .map_err(|e| {
                let e = into_update_failure(e);
                error!("DNS record update failed via {}: {}", self.provider.provider_name(), e);
                e
            })?;

        if self.provider.is_dry_run() {
            // Nothing was written remotely, so the cache must not claim it was
            info!(
                "[DRY-RUN] DNS record left unchanged, local cache not updated: {} -> {}",
                target, detected
            );
            return Ok(Decision::UpdateRequired);
        }

        self.persist(detected).await;
        info!("DNS record updated successfully: {} -> {}", target, detected);

        Ok(Decision::UpdateRequired)
    }

    /// Reconcile immediately and then on every `interval` until ctrl-c
    ///
    /// Transient failures are logged and retried on the next tick. Fatal
    /// failures (see [`Error::is_fatal`]) end the loop.
    pub async fn run(&self, interval: Duration) -> Result<()> {
        self.run_until(interval, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for ctrl-c: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Same as [`DdnsEngine::run()`], stopping when `shutdown_rx` fires
    ///
    /// Lets tests and embedders control shutdown without OS signals.
    pub async fn run_with_shutdown(
        &self,
        interval: Duration,
        shutdown_rx: tokio::sync::oneshot::Receiver<()>,
    ) -> Result<()> {
        self.run_until(interval, async {
            let _ = shutdown_rx.await;
        })
        .await
    }

    async fn run_until<F>(&self, interval: Duration, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!("Reconciling {} every {:?}", self.target, interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = &mut shutdown => break,
            }

            // A pass interrupted here leaves the cache as it was: it is
            // written once, after the remote side is settled.
            tokio::select! {
                result = self.reconcile() => match result {
                    Ok(decision) => debug!("Reconciliation finished: {}", decision),
                    Err(e) if e.is_fatal() => {
                        error!("Fatal error, stopping: {}", e);
                        return Err(e);
                    }
                    Err(e) => error!("Reconciliation failed, retrying next interval: {}", e),
                },
                _ = &mut shutdown => break,
            }
        }

        info!("Shutdown signal received, engine stopped");
        Ok(())
    }

    /// Read the cache, treating any failure as a cold start
    async fn load_cache(&self) -> Option<CachedIpRecord> {
        match self.state_store.load().await {
            Ok(cached) => cached,
            Err(e) => {
                warn!("Failed to read cached IP, treating as cold start: {}", e);
                None
            }
        }
    }

    /// Write the cache, logging and ignoring failures
    async fn persist(&self, ip: IpAddr) {
        if let Err(e) = self.state_store.save(&CachedIpRecord::now(ip)).await {
            warn!("Failed to save IP to local cache: {}", e);
        }
    }
}

/// Compare a provider-side record value with the detected address
///
/// Both sides are compared as parsed addresses, so formatting differences
/// such as IPv6 case or zero compression do not count as a change. A value
/// that does not parse never matches.
fn same_address(remote_value: &str, detected: IpAddr) -> bool {
    remote_value
        .parse::<IpAddr>()
        .is_ok_and(|remote| remote == detected)
}

fn into_update_failure(err: Error) -> Error {
    match err {
        Error::Provider {
            status,
            code,
            message,
            ..
        } => Error::UpdateFailed {
            status,
            code,
            message,
        },
        other => other,
    }
}
