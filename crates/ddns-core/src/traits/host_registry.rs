// # Host Registry Trait
//
// Persisted mapping from hostname to host configuration and last-known
// state. `find_by_hostname` sits on the hot path of every public update
// request, so implementations keep a hostname index.
//
// ## Implementations
//
// - `MemoryStore`: in-process, lost on restart
// - `FileStore`: JSON file with atomic writes and backup recovery

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::model::{Host, HostChanges, HostId, NewHost};

/// Trait for host registry implementations
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently from multiple tasks. Each
/// mutating method is one atomic write: either all fields change or none do.
///
/// # Hostnames
///
/// Writes normalize hostnames with
/// [`normalize_hostname`](crate::validation::normalize_hostname); lookups
/// expect already-normalized input. Hostnames are unique: creating or
/// renaming to a hostname that is already registered fails with
/// [`Error::Conflict`](crate::Error::Conflict).
#[async_trait]
pub trait HostRegistry: Send + Sync {
    /// Insert a new host with a freshly generated auth token
    ///
    /// # Returns
    ///
    /// - `Ok(Host)`: the stored host, including its id and token
    /// - `Err(Error::Conflict)`: the hostname is already registered
    async fn create_host(&self, host: NewHost) -> Result<Host, crate::Error>;

    /// Get a host by id
    async fn get_host(&self, id: HostId) -> Result<Option<Host>, crate::Error>;

    /// Get a host by its (normalized) hostname
    async fn find_by_hostname(&self, hostname: &str) -> Result<Option<Host>, crate::Error>;

    /// List all hosts ordered by id
    async fn list_hosts(&self) -> Result<Vec<Host>, crate::Error>;

    /// Apply an administrator edit (hostname, record type, TTL)
    ///
    /// The auth token, current IP and last-updated timestamp are untouched.
    ///
    /// # Returns
    ///
    /// - `Err(Error::NotFound)`: no host with that id
    /// - `Err(Error::Conflict)`: the new hostname belongs to another host
    async fn update_host(&self, id: HostId, changes: HostChanges) -> Result<Host, crate::Error>;

    /// Record a successful reconciliation
    ///
    /// Sets `current_ip` and `last_updated` together in a single write.
    async fn record_reconciliation(
        &self,
        id: HostId,
        content: &str,
        at: DateTime<Utc>,
    ) -> Result<Host, crate::Error>;

    /// Delete a host
    ///
    /// # Returns
    ///
    /// - `Ok(Host)`: the removed host
    /// - `Err(Error::NotFound)`: no host with that id
    async fn delete_host(&self, id: HostId) -> Result<Host, crate::Error>;

    /// Persist any pending changes
    async fn flush(&self) -> Result<(), crate::Error>;
}
