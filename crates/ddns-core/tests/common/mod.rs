//! Test doubles and common utilities for engine contract tests
//!
//! The mock provider keeps an in-memory zone so lookups observe earlier
//! writes, and counts every call.

#![allow(dead_code)]

use ddns_core::error::{Error, Result};
use ddns_core::traits::{
    DnsProvider, HostRegistry, ProviderCredential, RecordSpec, RemoteRecord, SettingsStore,
};
use ddns_core::{Host, MemoryStore, NewHost, ReconciliationEngine, SecretStore, UpdateRequest};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const MASTER_SECRET: &str = "test-master-secret-0123456789";
pub const ZONE_ID: &str = "zone-123";
pub const API_TOKEN: &str = "cf-api-token";

/// A mock DnsProvider backed by an in-memory zone
#[derive(Default)]
pub struct MockDnsProvider {
    records: Mutex<HashMap<String, RemoteRecord>>,
    next_id: AtomicUsize,
    lookup_count: AtomicUsize,
    create_count: AtomicUsize,
    update_count: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    fail_writes: AtomicBool,
    delay: Option<Duration>,
    last_credential: Mutex<Option<(String, String)>>,
}

impl MockDnsProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep inside every call to widen race windows
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Pre-populate a remote record
    pub fn seed(&self, name: &str, content: &str) -> String {
        let id = format!("rec-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.records.lock().unwrap().insert(
            name.to_string(),
            RemoteRecord {
                id: id.clone(),
                name: name.to_string(),
                content: content.to_string(),
                ttl: 300,
                record_type: "A".to_string(),
            },
        );
        id
    }

    pub fn record(&self, name: &str) -> Option<RemoteRecord> {
        self.records.lock().unwrap().get(name).cloned()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn lookup_count(&self) -> usize {
        self.lookup_count.load(Ordering::SeqCst)
    }

    pub fn create_count(&self) -> usize {
        self.create_count.load(Ordering::SeqCst)
    }

    pub fn update_count(&self) -> usize {
        self.update_count.load(Ordering::SeqCst)
    }

    /// Total provider writes (create + update)
    pub fn write_count(&self) -> usize {
        self.create_count() + self.update_count()
    }

    /// Highest number of provider calls observed running at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn last_credential(&self) -> Option<(String, String)> {
        self.last_credential.lock().unwrap().clone()
    }

    async fn enter(&self, credential: &ProviderCredential) {
        *self.last_credential.lock().unwrap() = Some((
            credential.zone_id().to_string(),
            credential.api_token().to_string(),
        ));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn leave(&self) {
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::provider_status("mock", 500, "injected failure"));
        }
        Ok(())
    }

    fn store(&self, id: String, record: &RecordSpec) -> RemoteRecord {
        let remote = RemoteRecord {
            id,
            name: record.hostname.clone(),
            content: record.content.clone(),
            ttl: record.ttl,
            record_type: record.record_type.as_str().to_string(),
        };
        self.records
            .lock()
            .unwrap()
            .insert(record.hostname.clone(), remote.clone());
        remote
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn lookup(
        &self,
        hostname: &str,
        credential: &ProviderCredential,
    ) -> Result<Option<RemoteRecord>> {
        self.lookup_count.fetch_add(1, Ordering::SeqCst);
        self.enter(credential).await;
        let found = self.record(hostname);
        self.leave();
        Ok(found)
    }

    async fn create(
        &self,
        record: &RecordSpec,
        credential: &ProviderCredential,
    ) -> Result<RemoteRecord> {
        self.create_count.fetch_add(1, Ordering::SeqCst);
        self.enter(credential).await;
        let result = self.check_writable().map(|_| {
            let id = format!("rec-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
            self.store(id, record)
        });
        self.leave();
        result
    }

    async fn update(
        &self,
        record_id: &str,
        record: &RecordSpec,
        credential: &ProviderCredential,
    ) -> Result<RemoteRecord> {
        self.update_count.fetch_add(1, Ordering::SeqCst);
        self.enter(credential).await;
        let result = self
            .check_writable()
            .map(|_| self.store(record_id.to_string(), record));
        self.leave();
        result
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Engine wired to a memory store and a mock provider
pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub provider: Arc<MockDnsProvider>,
    pub secrets: Arc<SecretStore>,
    pub engine: Arc<ReconciliationEngine>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_provider(MockDnsProvider::new())
    }

    pub fn with_provider(provider: MockDnsProvider) -> Self {
        let store = Arc::new(MemoryStore::new());
        let provider = Arc::new(provider);
        let secrets = Arc::new(SecretStore::new(MASTER_SECRET));
        let engine = Arc::new(ReconciliationEngine::new(
            store.clone(),
            store.clone(),
            provider.clone(),
            secrets.clone(),
        ));
        Self {
            store,
            provider,
            secrets,
            engine,
        }
    }

    /// Store the zone id and the encrypted API token
    pub async fn configure(&self) {
        self.store
            .set_zone_id(Some(ZONE_ID.to_string()))
            .await
            .unwrap();
        let ciphertext = self.secrets.encrypt(API_TOKEN).unwrap();
        self.store.set_api_token_ciphertext(ciphertext).await.unwrap();
    }

    pub async fn add_host(&self, hostname: &str) -> Host {
        self.store.create_host(NewHost::new(hostname)).await.unwrap()
    }

    pub async fn host(&self, hostname: &str) -> Host {
        self.store
            .find_by_hostname(hostname)
            .await
            .unwrap()
            .expect("host exists")
    }
}

pub fn source_ip() -> IpAddr {
    IpAddr::from([198, 51, 100, 1])
}

pub fn request(host: &Host, ip: Option<&str>) -> UpdateRequest {
    UpdateRequest {
        hostname: host.hostname.clone(),
        token: host.auth_token.expose().to_string(),
        ip: ip.map(str::to_string),
        source_ip: source_ip(),
    }
}
