//! Test doubles and common utilities for reconciliation contract tests
//!
//! Every double is `Clone` and keeps its counters behind `Arc`, so a test
//! hands a clone to the engine and inspects the original afterwards.

#![allow(dead_code)]

use ddns_core::config::RecordTarget;
use ddns_core::error::{Error, Result};
use ddns_core::traits::{CachedIpRecord, DnsProvider, IpSource, RemoteRecord, StateStore};
use ddns_core::DdnsEngine;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Parse an IP literal
pub fn ip(s: &str) -> IpAddr {
    s.parse().expect("valid IP literal")
}

/// The record every contract test reconciles
pub fn target() -> RecordTarget {
    RecordTarget::new("example.com", "@", "A", 600)
}

/// Build an engine around the given doubles
pub fn engine(
    ip_source: &ScriptedIpSource,
    provider: &MockDnsProvider,
    state_store: &MockStateStore,
) -> DdnsEngine {
    DdnsEngine::new(
        Box::new(ip_source.clone()),
        Box::new(provider.clone()),
        Box::new(state_store.clone()),
        target(),
    )
}

/// An IpSource that returns a scripted address (or fails)
#[derive(Clone)]
pub struct ScriptedIpSource {
    current_ip: Arc<Mutex<Option<IpAddr>>>,
    current_call_count: Arc<AtomicUsize>,
}

impl ScriptedIpSource {
    /// A source that always detects `ip`
    pub fn returning(ip: IpAddr) -> Self {
        Self {
            current_ip: Arc::new(Mutex::new(Some(ip))),
            current_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A source whose every service is down
    pub fn unavailable() -> Self {
        Self {
            current_ip: Arc::new(Mutex::new(None)),
            current_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Change what the next detection returns
    pub fn set_ip(&self, ip: IpAddr) {
        *self.current_ip.lock().unwrap() = Some(ip);
    }

    /// Get the number of times current() was called
    pub fn current_call_count(&self) -> usize {
        self.current_call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IpSource for ScriptedIpSource {
    async fn current(&self) -> Result<IpAddr> {
        self.current_call_count.fetch_add(1, Ordering::SeqCst);
        let current = *self.current_ip.lock().unwrap();
        current.ok_or(Error::AllServicesUnavailable { attempted: 5 })
    }
}

/// How a MockDnsProvider call should fail
#[derive(Clone, Debug)]
pub enum ProviderFailure {
    /// Credentials rejected
    Auth,
    /// API-level error with this HTTP status
    Api(u16),
    /// Transport failure
    Network,
}

impl ProviderFailure {
    fn to_error(&self) -> Error {
        match self {
            ProviderFailure::Auth => Error::auth("InvalidAccessKeyId.NotFound"),
            ProviderFailure::Api(status) => {
                Error::provider("mock", *status, "InternalError", "provider refused")
            }
            ProviderFailure::Network => Error::http("connection reset"),
        }
    }
}

/// A mock DnsProvider holding a single record and tracking calls
///
/// A successful update rewrites the stored record, like a real provider.
#[derive(Clone)]
pub struct MockDnsProvider {
    record: Arc<Mutex<Option<RemoteRecord>>>,
    find_failure: Arc<Mutex<Option<ProviderFailure>>>,
    update_failure: Arc<Mutex<Option<ProviderFailure>>>,
    find_call_count: Arc<AtomicUsize>,
    update_call_count: Arc<AtomicUsize>,
    updates: Arc<Mutex<Vec<(String, String, u32)>>>,
    dry_run: bool,
}

impl MockDnsProvider {
    /// A provider whose target record currently holds `value`
    pub fn with_record(value: &str) -> Self {
        let record = RemoteRecord {
            record_id: "rec-1".to_string(),
            rr: "@".to_string(),
            record_type: "A".to_string(),
            value: value.to_string(),
            ttl: 600,
        };
        Self::new(Some(record))
    }

    /// A provider where the target record does not exist
    pub fn without_record() -> Self {
        Self::new(None)
    }

    fn new(record: Option<RemoteRecord>) -> Self {
        Self {
            record: Arc::new(Mutex::new(record)),
            find_failure: Arc::new(Mutex::new(None)),
            update_failure: Arc::new(Mutex::new(None)),
            find_call_count: Arc::new(AtomicUsize::new(0)),
            update_call_count: Arc::new(AtomicUsize::new(0)),
            updates: Arc::new(Mutex::new(Vec::new())),
            dry_run: false,
        }
    }

    /// A view of the same record whose updates are never applied
    pub fn dry_run(&self) -> Self {
        Self {
            dry_run: true,
            ..self.clone()
        }
    }

    /// Make find_record() fail
    pub fn fail_find(&self, failure: ProviderFailure) {
        *self.find_failure.lock().unwrap() = Some(failure);
    }

    /// Make update_record() fail
    pub fn fail_update(&self, failure: ProviderFailure) {
        *self.update_failure.lock().unwrap() = Some(failure);
    }

    /// Get the number of times find_record() was called
    pub fn find_call_count(&self) -> usize {
        self.find_call_count.load(Ordering::SeqCst)
    }

    /// Get the number of times update_record() was called, dry runs included
    pub fn update_call_count(&self) -> usize {
        self.update_call_count.load(Ordering::SeqCst)
    }

    /// (record_id, value, ttl) of every update attempt
    pub fn updates(&self) -> Vec<(String, String, u32)> {
        self.updates.lock().unwrap().clone()
    }

    /// Current remote value
    pub fn remote_value(&self) -> Option<String> {
        self.record.lock().unwrap().as_ref().map(|r| r.value.clone())
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn find_record(
        &self,
        _domain: &str,
        rr: &str,
        record_type: &str,
    ) -> Result<Option<RemoteRecord>> {
        self.find_call_count.fetch_add(1, Ordering::SeqCst);
        if let Some(failure) = self.find_failure.lock().unwrap().as_ref() {
            return Err(failure.to_error());
        }

        Ok(self
            .record
            .lock()
            .unwrap()
            .clone()
            .filter(|r| r.rr == rr && r.record_type == record_type))
    }

    async fn update_record(
        &self,
        record_id: &str,
        _rr: &str,
        _record_type: &str,
        value: &str,
        ttl: u32,
    ) -> Result<()> {
        self.update_call_count.fetch_add(1, Ordering::SeqCst);
        self.updates
            .lock()
            .unwrap()
            .push((record_id.to_string(), value.to_string(), ttl));

        if let Some(failure) = self.update_failure.lock().unwrap().as_ref() {
            return Err(failure.to_error());
        }

        if self.dry_run {
            return Ok(());
        }

        if let Some(record) = self.record.lock().unwrap().as_mut() {
            record.value = value.to_string();
            record.ttl = ttl;
        }
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }

    fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

/// A mock StateStore that tracks calls and can be told to fail
#[derive(Clone)]
pub struct MockStateStore {
    state: Arc<Mutex<Option<CachedIpRecord>>>,
    fail_load: Arc<Mutex<bool>>,
    fail_save: Arc<Mutex<bool>>,
    load_call_count: Arc<AtomicUsize>,
    save_call_count: Arc<AtomicUsize>,
}

impl MockStateStore {
    /// An empty cache (cold start)
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(None)),
            fail_load: Arc::new(Mutex::new(false)),
            fail_save: Arc::new(Mutex::new(false)),
            load_call_count: Arc::new(AtomicUsize::new(0)),
            save_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A cache holding `ip`
    pub fn with_ip(ip: IpAddr) -> Self {
        let store = Self::new();
        *store.state.lock().unwrap() = Some(CachedIpRecord::now(ip));
        store
    }

    /// Make load() report a corrupt cache
    pub fn fail_load(&self) {
        *self.fail_load.lock().unwrap() = true;
    }

    /// Make save() report an I/O error
    pub fn fail_save(&self) {
        *self.fail_save.lock().unwrap() = true;
    }

    /// Currently cached record
    pub fn cached(&self) -> Option<CachedIpRecord> {
        self.state.lock().unwrap().clone()
    }

    /// Currently cached IP
    pub fn cached_ip(&self) -> Option<IpAddr> {
        self.cached().map(|r| r.ip)
    }

    /// Get the number of times load() was called
    pub fn load_call_count(&self) -> usize {
        self.load_call_count.load(Ordering::SeqCst)
    }

    /// Get the number of times save() was called
    pub fn save_call_count(&self) -> usize {
        self.save_call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl StateStore for MockStateStore {
    async fn load(&self) -> Result<Option<CachedIpRecord>> {
        self.load_call_count.fetch_add(1, Ordering::SeqCst);
        if *self.fail_load.lock().unwrap() {
            return Err(Error::state_store("Failed to parse state file: expected value"));
        }
        Ok(self.state.lock().unwrap().clone())
    }

    async fn save(&self, record: &CachedIpRecord) -> Result<()> {
        self.save_call_count.fetch_add(1, Ordering::SeqCst);
        if *self.fail_save.lock().unwrap() {
            return Err(Error::state_store("Failed to create temp file: permission denied"));
        }
        *self.state.lock().unwrap() = Some(record.clone());
        Ok(())
    }
}
