// # DNS Provider Trait
//
// Defines the interface to the remote DNS provider: three operations,
// lookup / create / update, against one zone.
//
// ## Implementations
//
// - Cloudflare: `ddns-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::traits::{DnsProvider, ProviderCredential, RecordSpec};
//
// let credential = ProviderCredential::new("zone-id", "api-token");
// match provider.lookup("home.example.org", &credential).await? {
//     Some(record) if record.content == "1.2.3.4" => { /* nothing to do */ }
//     Some(record) => { provider.update(&record.id, &spec, &credential).await?; }
//     None => { provider.create(&spec, &credential).await?; }
// }
// ```

use async_trait::async_trait;
use std::fmt;

use crate::model::RecordType;

/// A DNS record as reported by the provider
///
/// Fetched per request and never persisted: the provider is the source of
/// truth for the record's remote id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRecord {
    /// The record ID (provider-specific)
    pub id: String,
    /// The record name
    pub name: String,
    /// Record content (IP address or CNAME target)
    pub content: String,
    /// Time-to-live for the record
    pub ttl: u32,
    /// Record type as reported by the provider
    pub record_type: String,
}

/// Desired state of a record for create/update calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSpec {
    pub hostname: String,
    pub content: String,
    pub record_type: RecordType,
    pub ttl: u32,
}

/// Plaintext provider credentials, alive only for one reconciliation
///
/// The `Debug` implementation hides the API token.
#[derive(Clone)]
pub struct ProviderCredential {
    zone_id: String,
    api_token: String,
}

impl ProviderCredential {
    pub fn new(zone_id: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            zone_id: zone_id.into(),
            api_token: api_token.into(),
        }
    }

    /// Zone the records live in
    pub fn zone_id(&self) -> &str {
        &self.zone_id
    }

    /// API token
    /// ⚠️ NEVER log this value
    pub fn api_token(&self) -> &str {
        &self.api_token
    }
}

impl fmt::Debug for ProviderCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredential")
            .field("zone_id", &self.zone_id)
            .field("api_token", &"<REDACTED>")
            .finish()
    }
}

/// Trait for DNS provider implementations
///
/// Providers are stateless adapters. Each method performs a single API call
/// and returns success or failure; deciding *whether* to write, retrying and
/// committing local state are owned by the
/// [`ReconciliationEngine`](crate::engine::ReconciliationEngine).
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Failures
///
/// Any non-success HTTP status, malformed response, transport failure or
/// timeout must surface as [`Error::Provider`](crate::Error::Provider).
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Look up the record for `hostname` by exact name
    ///
    /// If the provider returns several records with that name, the first one
    /// is authoritative. This mirrors the provider's own ordering and is not
    /// re-derived here (no filtering by record type).
    ///
    /// # Returns
    ///
    /// - `Ok(Some(RemoteRecord))`: the first matching record
    /// - `Ok(None)`: no record with that name exists
    /// - `Err(Error)`: the request failed
    async fn lookup(
        &self,
        hostname: &str,
        credential: &ProviderCredential,
    ) -> Result<Option<RemoteRecord>, crate::Error>;

    /// Create a new, non-proxied record
    async fn create(
        &self,
        record: &RecordSpec,
        credential: &ProviderCredential,
    ) -> Result<RemoteRecord, crate::Error>;

    /// Overwrite the record `record_id` in place (non-proxied)
    async fn update(
        &self,
        record_id: &str,
        record: &RecordSpec,
        credential: &ProviderCredential,
    ) -> Result<RemoteRecord, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
