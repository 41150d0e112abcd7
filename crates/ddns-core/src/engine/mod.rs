//! Reconciliation engine
//!
//! The ReconciliationEngine turns one authenticated update request into the
//! minimal provider write:
//! - Authenticating the caller against the HostRegistry
//! - Resolving the target content (explicit IP or request source)
//! - Loading and decrypting provider credentials
//! - Looking up the remote record and deciding create / update / no-op
//! - Committing `current_ip` and `last_updated` after provider success
//!
//! ## Architecture
//!
//! ```text
//!  UpdateRequest
//!       │
//!       ▼
//! ┌──────────────────────┐     ┌──────────────┐
//! │ ReconciliationEngine │────▶│ HostLocks    │ (one at a time per hostname)
//! └──────────────────────┘     └──────────────┘
//!       │
//!       ├───────────────────┬───────────────────┬───────────────────┐
//!       ▼                   ▼                   ▼                   ▼
//! ┌─────────────┐   ┌───────────────┐   ┌─────────────┐   ┌─────────────┐
//! │HostRegistry │   │ SettingsStore │   │ SecretStore │   │ DnsProvider │
//! │(auth/commit)│   │ (zone/token)  │   │ (decrypt)   │   │(lookup/write)│
//! └─────────────┘   └───────────────┘   └─────────────┘   └─────────────┘
//! ```
//!
//! ## Failure Semantics
//!
//! Nothing is written locally unless the provider call succeeded. A crash or
//! error between the provider write and the local commit leaves the local
//! mirror stale; the next request reconciles against the provider again.

mod locks;

pub use locks::{HostGuard, HostLocks};

use chrono::Utc;
use std::fmt;
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::model::{Host, RecordType};
use crate::secrets::SecretStore;
use crate::traits::{DnsProvider, HostRegistry, ProviderCredential, RecordSpec, SettingsStore};
use crate::validation::{canonical_ip_for, normalize_hostname, validate_content};

/// An inbound dynamic-DNS update
#[derive(Clone)]
pub struct UpdateRequest {
    /// Hostname as submitted by the client
    pub hostname: String,
    /// Per-host auth token as submitted by the client
    pub token: String,
    /// Explicit content; when absent or blank the source address is used
    pub ip: Option<String>,
    /// Observed address of the caller
    pub source_ip: IpAddr,
}

impl fmt::Debug for UpdateRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpdateRequest")
            .field("hostname", &self.hostname)
            .field("token", &"<REDACTED>")
            .field("ip", &self.ip)
            .field("source_ip", &self.source_ip)
            .finish()
    }
}

/// What a successful reconciliation did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Remote record already had the content; no provider write
    Unchanged { hostname: String, content: String },

    /// No remote record existed; one was created
    Created {
        hostname: String,
        record_id: String,
        content: String,
    },

    /// The existing remote record was overwritten in place
    Updated {
        hostname: String,
        record_id: String,
        previous: String,
        content: String,
    },
}

impl ReconcileOutcome {
    /// Content the record holds after reconciliation
    pub fn content(&self) -> &str {
        match self {
            Self::Unchanged { content, .. }
            | Self::Created { content, .. }
            | Self::Updated { content, .. } => content,
        }
    }

    /// Whether the provider was written to
    pub fn changed(&self) -> bool {
        !matches!(self, Self::Unchanged { .. })
    }

    /// Human-readable summary returned to clients
    pub fn message(&self) -> String {
        match self {
            Self::Unchanged { .. } => "IP is already up to date.".to_string(),
            Self::Created {
                hostname, content, ..
            }
            | Self::Updated {
                hostname, content, ..
            } => format!("IP for host {hostname} updated to {content}."),
        }
    }
}

/// Core reconciliation engine
///
/// Cheap to share behind an `Arc`; every dependency is itself shared.
///
/// ## Concurrency
///
/// Requests for the same normalized hostname run one at a time from
/// authentication to local commit, so two racing updates never interleave
/// their provider lookups and writes. Different hostnames proceed in
/// parallel.
pub struct ReconciliationEngine {
    registry: Arc<dyn HostRegistry>,
    settings: Arc<dyn SettingsStore>,
    provider: Arc<dyn DnsProvider>,
    secrets: Arc<SecretStore>,
    locks: HostLocks,
}

impl ReconciliationEngine {
    /// Create a new engine
    ///
    /// # Parameters
    ///
    /// - `registry`: Host registry used for authentication and commit
    /// - `settings`: Provider settings (zone id, encrypted token)
    /// - `provider`: DNS provider implementation
    /// - `secrets`: Secret store holding the master key
    pub fn new(
        registry: Arc<dyn HostRegistry>,
        settings: Arc<dyn SettingsStore>,
        provider: Arc<dyn DnsProvider>,
        secrets: Arc<SecretStore>,
    ) -> Self {
        Self {
            registry,
            settings,
            provider,
            secrets,
            locks: HostLocks::new(),
        }
    }

    /// Apply one update request
    ///
    /// # Returns
    ///
    /// - `Ok(ReconcileOutcome)`: the provider reflects the target content
    /// - `Err(Error::Validation)`: missing fields or content unfit for the record type
    /// - `Err(Error::Unauthorized)`: unknown hostname or wrong token (indistinguishable)
    /// - `Err(Error::NotConfigured)`: zone id or API token missing or undecryptable
    /// - `Err(Error::Provider)`: the provider call failed; local state untouched
    pub async fn apply_update(&self, request: UpdateRequest) -> Result<ReconcileOutcome> {
        if request.hostname.trim().is_empty() || request.token.is_empty() {
            return Err(Error::validation("'hostname' and 'token' are required"));
        }

        // Unparseable names cannot be registered, so they fail authentication
        let hostname = normalize_hostname(&request.hostname).map_err(|_| Error::Unauthorized)?;

        let _guard = self.locks.acquire(&hostname).await;

        let host = self.authenticate(&hostname, &request.token).await?;
        let content = resolve_content(&host, request.ip.as_deref(), request.source_ip)?;
        let credential = self.load_credential().await?;

        let outcome = self.reconcile(&host, &content, &credential).await?;

        if outcome.changed() || host.current_ip.as_deref() != Some(outcome.content()) {
            self.registry
                .record_reconciliation(host.id, outcome.content(), Utc::now())
                .await?;
        }

        match &outcome {
            ReconcileOutcome::Unchanged { .. } => {
                debug!("Record {} already points to {}, no update", hostname, content);
            }
            ReconcileOutcome::Created { record_id, .. } => {
                info!("Created record {} -> {} (id {})", hostname, content, record_id);
            }
            ReconcileOutcome::Updated {
                record_id,
                previous,
                ..
            } => {
                info!(
                    "Updated record {} -> {} (previous: {}, id {})",
                    hostname, content, previous, record_id
                );
            }
        }

        Ok(outcome)
    }

    /// Hold the per-hostname lock outside of `apply_update`
    ///
    /// Administrative edits use this to avoid racing an in-flight
    /// reconciliation of the same hostname.
    pub async fn lock_hostname(&self, hostname: &str) -> Result<HostGuard> {
        let hostname = normalize_hostname(hostname)?;
        Ok(self.locks.acquire(&hostname).await)
    }

    async fn authenticate(&self, hostname: &str, token: &str) -> Result<Host> {
        match self.registry.find_by_hostname(hostname).await? {
            Some(host) if host.auth_token.verify(token) => Ok(host),
            Some(_) => {
                warn!("Rejected update for {}: invalid token", hostname);
                Err(Error::Unauthorized)
            }
            None => {
                warn!("Rejected update for {}: unknown host", hostname);
                Err(Error::Unauthorized)
            }
        }
    }

    /// Build the per-request credential from stored settings
    async fn load_credential(&self) -> Result<ProviderCredential> {
        let settings = self.settings.provider_settings().await?;

        let zone_id = settings
            .zone_id
            .filter(|z| !z.trim().is_empty())
            .ok_or_else(|| Error::not_configured("zone id is not set"))?;

        let ciphertext = settings
            .api_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::not_configured("API token is not set"))?;

        let api_token = match self.secrets.decrypt(&ciphertext) {
            Ok(token) => token,
            Err(_) => {
                warn!("Stored API token could not be decrypted; was the secret key changed?");
                return Err(Error::not_configured("API token could not be decrypted"));
            }
        };

        Ok(ProviderCredential::new(zone_id, api_token))
    }

    async fn reconcile(
        &self,
        host: &Host,
        content: &str,
        credential: &ProviderCredential,
    ) -> Result<ReconcileOutcome> {
        let spec = RecordSpec {
            hostname: host.hostname.clone(),
            content: content.to_string(),
            record_type: host.record_type,
            ttl: host.ttl,
        };

        match self.provider.lookup(&host.hostname, credential).await? {
            Some(remote) if same_content(host.record_type, &remote.content, content) => {
                Ok(ReconcileOutcome::Unchanged {
                    hostname: host.hostname.clone(),
                    content: content.to_string(),
                })
            }
            Some(remote) => {
                debug!(
                    "Record {} differs ({} != {}), updating {} via {}",
                    host.hostname,
                    remote.content,
                    content,
                    remote.id,
                    self.provider.provider_name()
                );
                let written = self.provider.update(&remote.id, &spec, credential).await?;
                Ok(ReconcileOutcome::Updated {
                    hostname: host.hostname.clone(),
                    record_id: written.id,
                    previous: remote.content,
                    content: content.to_string(),
                })
            }
            None => {
                debug!(
                    "Record {} not found, creating via {}",
                    host.hostname,
                    self.provider.provider_name()
                );
                let written = self.provider.create(&spec, credential).await?;
                Ok(ReconcileOutcome::Created {
                    hostname: host.hostname.clone(),
                    record_id: written.id,
                    content: content.to_string(),
                })
            }
        }
    }
}

impl fmt::Debug for ReconciliationEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReconciliationEngine")
            .field("provider", &self.provider.provider_name())
            .field("active_locks", &self.locks.len())
            .finish()
    }
}

/// Pick the target content: an explicit non-blank `ip`, else the caller's address
fn resolve_content(host: &Host, explicit: Option<&str>, source_ip: IpAddr) -> Result<String> {
    match explicit.map(str::trim).filter(|s| !s.is_empty()) {
        Some(value) => validate_content(host.record_type, value),
        None => canonical_ip_for(host.record_type, source_ip),
    }
}

/// Compare remote content against the target in canonical form
fn same_content(record_type: RecordType, remote: &str, target: &str) -> bool {
    match validate_content(record_type, remote) {
        Ok(canonical) => canonical == target,
        Err(_) => remote == target,
    }
}
