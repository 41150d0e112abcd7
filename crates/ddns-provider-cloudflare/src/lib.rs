// # Cloudflare DNS Provider
//
// Cloudflare API v4 implementation of `DnsProvider`.
//
// The provider is stateless and single-shot:
//
// - One HTTP request per trait call
// - No retries, backoff or caching (the engine decides what to write)
// - No background tasks
// - Credentials arrive with each call and are never stored or logged
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List DNS Records: GET `/zones/:zone_id/dns_records?name=...`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`
//
// Every response uses the same envelope:
//
// ```json
// { "success": true, "errors": [], "messages": [], "result": { ... } }
// ```

use async_trait::async_trait;
use ddns_core::traits::{DnsProvider, ProviderCredential, RecordSpec, RemoteRecord};
use ddns_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Cloudflare API base URL
const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

const PROVIDER: &str = "cloudflare";

/// Longest raw body excerpt carried into an error message
const MAX_BODY_EXCERPT: usize = 200;

/// Cloudflare DNS provider
///
/// Records are always written with `proxied: false`: a dynamic-DNS name has to
/// resolve to the submitted address, not to Cloudflare's edge.
#[derive(Clone)]
pub struct CloudflareProvider {
    /// HTTP client for API requests
    client: reqwest::Client,

    /// API root, overridable for tests
    base_url: String,
}

impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("base_url", &self.base_url)
            .finish()
    }
}

/// Cloudflare response envelope
#[derive(Debug, Deserialize)]
struct ApiEnvelope<T> {
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    message: String,
}

/// DNS record as returned by Cloudflare
#[derive(Debug, Deserialize)]
struct DnsRecord {
    id: String,
    name: String,
    content: String,
    #[serde(default)]
    ttl: u32,
    #[serde(rename = "type")]
    record_type: String,
}

impl From<DnsRecord> for RemoteRecord {
    fn from(record: DnsRecord) -> Self {
        RemoteRecord {
            id: record.id,
            name: record.name,
            content: record.content,
            ttl: record.ttl,
            record_type: record.record_type,
        }
    }
}

/// Request body for create and update
#[derive(Debug, Serialize)]
struct RecordBody<'a> {
    #[serde(rename = "type")]
    record_type: &'a str,
    name: &'a str,
    content: &'a str,
    ttl: u32,
    proxied: bool,
}

impl<'a> From<&'a RecordSpec> for RecordBody<'a> {
    fn from(spec: &'a RecordSpec) -> Self {
        RecordBody {
            record_type: spec.record_type.as_str(),
            name: &spec.hostname,
            content: &spec.content,
            ttl: spec.ttl,
            proxied: false,
        }
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Parameters
    ///
    /// - `timeout`: Upper bound for each API request, including connect
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_base_url(timeout, CLOUDFLARE_API_BASE)
    }

    /// Create a provider that talks to `base_url` instead of the public API
    pub fn with_base_url(timeout: Duration, base_url: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn records_url(&self, zone_id: &str) -> String {
        format!("{}/zones/{}/dns_records", self.base_url, zone_id)
    }

    /// Send a request and unwrap the Cloudflare envelope
    ///
    /// # Returns
    ///
    /// - `Ok(T)`: the `result` field of a successful response
    /// - `Err(Error::Provider)`: transport failure, timeout, non-2xx status,
    ///   `success: false`, or an unparseable body
    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
        credential: &ProviderCredential,
        action: &str,
    ) -> Result<T> {
        let response = request
            .bearer_auth(credential.api_token())
            .send()
            .await
            .map_err(|e| transport_error(action, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(action, e))?;

        if !status.is_success() {
            let detail = serde_json::from_str::<ApiEnvelope<serde_json::Value>>(&body)
                .ok()
                .and_then(|envelope| describe_errors(&envelope.errors))
                .unwrap_or_else(|| excerpt(&body));
            tracing::debug!("Cloudflare {} failed with status {}", action, status);
            return Err(Error::provider_status(
                PROVIDER,
                status.as_u16(),
                format!("{} failed: {}", action, detail),
            ));
        }

        let envelope: ApiEnvelope<T> = serde_json::from_str(&body).map_err(|e| {
            Error::provider(PROVIDER, format!("{} returned an invalid response: {}", action, e))
        })?;

        if !envelope.success {
            let detail = describe_errors(&envelope.errors)
                .unwrap_or_else(|| "request was not successful".to_string());
            return Err(Error::provider_status(
                PROVIDER,
                status.as_u16(),
                format!("{} failed: {}", action, detail),
            ));
        }

        envelope.result.ok_or_else(|| {
            Error::provider(PROVIDER, format!("{} returned no result", action))
        })
    }
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    /// Look up a record by exact name
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?name=home.example.org
    /// Authorization: Bearer <token>
    /// ```
    ///
    /// Cloudflare may return several records with one name (for example an A
    /// and an AAAA); the first one is used.
    async fn lookup(
        &self,
        hostname: &str,
        credential: &ProviderCredential,
    ) -> Result<Option<RemoteRecord>> {
        tracing::debug!("Looking up Cloudflare record: {}", hostname);

        let request = self
            .client
            .get(self.records_url(credential.zone_id()))
            .query(&[("name", hostname)]);

        let records: Vec<DnsRecord> = self.send(request, credential, "record lookup").await?;
        Ok(records.into_iter().next().map(RemoteRecord::from))
    }

    /// Create a record
    ///
    /// # API Call
    ///
    /// ```http
    /// POST /zones/:zone_id/dns_records
    /// {"type": "A", "name": "home.example.org", "content": "1.2.3.4", "ttl": 300, "proxied": false}
    /// ```
    async fn create(
        &self,
        record: &RecordSpec,
        credential: &ProviderCredential,
    ) -> Result<RemoteRecord> {
        tracing::debug!(
            "Creating Cloudflare record: {} -> {} ({})",
            record.hostname,
            record.content,
            record.record_type
        );

        let request = self
            .client
            .post(self.records_url(credential.zone_id()))
            .json(&RecordBody::from(record));

        let created: DnsRecord = self.send(request, credential, "record create").await?;
        Ok(created.into())
    }

    /// Overwrite a record in place
    ///
    /// # API Call
    ///
    /// ```http
    /// PUT /zones/:zone_id/dns_records/:record_id
    /// {"type": "A", "name": "home.example.org", "content": "5.6.7.8", "ttl": 300, "proxied": false}
    /// ```
    async fn update(
        &self,
        record_id: &str,
        record: &RecordSpec,
        credential: &ProviderCredential,
    ) -> Result<RemoteRecord> {
        tracing::debug!(
            "Updating Cloudflare record {}: {} -> {} ({})",
            record_id,
            record.hostname,
            record.content,
            record.record_type
        );

        let url = format!("{}/{}", self.records_url(credential.zone_id()), record_id);
        let request = self.client.put(url).json(&RecordBody::from(record));

        let updated: DnsRecord = self.send(request, credential, "record update").await?;
        Ok(updated.into())
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

fn transport_error(action: &str, err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::provider(PROVIDER, format!("{} timed out", action))
    } else {
        // The URL is noise in client-facing messages
        Error::provider(PROVIDER, format!("{} failed: {}", action, err.without_url()))
    }
}

/// Render Cloudflare `errors[]` as one line, or `None` if there are none
fn describe_errors(errors: &[ApiMessage]) -> Option<String> {
    if errors.is_empty() {
        return None;
    }
    Some(
        errors
            .iter()
            .map(|e| format!("{} ({})", e.message, e.code))
            .collect::<Vec<_>>()
            .join("; "),
    )
}

fn excerpt(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return "empty response body".to_string();
    }
    match body.char_indices().nth(MAX_BODY_EXCERPT) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
