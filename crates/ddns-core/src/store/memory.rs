// # Memory Store
//
// In-memory implementation of HostRegistry and SettingsStore.
//
// ## Crash Behavior
//
// - All hosts, tokens and settings are lost on restart
// - Hosts must be re-created (with new tokens) after a restart
//
// ## When to Use
//
// - Tests
// - Throwaway deployments where the admin API re-seeds hosts

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::table::HostTable;
use crate::Error;
use crate::model::{Host, HostChanges, HostId, NewHost, ProviderSettings};
use crate::traits::{HostRegistry, SettingsStore};

/// In-memory store implementation
///
/// Clones share the same table.
///
/// # Example
///
/// ```rust,no_run
/// use ddns_core::model::NewHost;
/// use ddns_core::store::MemoryStore;
/// use ddns_core::traits::HostRegistry;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryStore::new();
///     let host = store.create_host(NewHost::new("home.example.org")).await?;
///
///     let found = store.find_by_hostname("home.example.org").await?;
///     assert_eq!(found.map(|h| h.id), Some(host.id));
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<HostTable>>,
}

impl MemoryStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered hosts
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the store holds no hosts
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl HostRegistry for MemoryStore {
    async fn create_host(&self, host: NewHost) -> Result<Host, Error> {
        self.inner.write().await.insert(host)
    }

    async fn get_host(&self, id: HostId) -> Result<Option<Host>, Error> {
        Ok(self.inner.read().await.get(id).cloned())
    }

    async fn find_by_hostname(&self, hostname: &str) -> Result<Option<Host>, Error> {
        Ok(self.inner.read().await.find(hostname).cloned())
    }

    async fn list_hosts(&self) -> Result<Vec<Host>, Error> {
        Ok(self.inner.read().await.list())
    }

    async fn update_host(&self, id: HostId, changes: HostChanges) -> Result<Host, Error> {
        self.inner.write().await.update(id, changes)
    }

    async fn record_reconciliation(
        &self,
        id: HostId,
        content: &str,
        at: DateTime<Utc>,
    ) -> Result<Host, Error> {
        self.inner
            .write()
            .await
            .record_reconciliation(id, content, at)
    }

    async fn delete_host(&self, id: HostId) -> Result<Host, Error> {
        self.inner.write().await.remove(id)
    }

    async fn flush(&self) -> Result<(), Error> {
        // Nothing to persist
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn provider_settings(&self) -> Result<ProviderSettings, Error> {
        Ok(self.inner.read().await.settings.clone())
    }

    async fn set_zone_id(&self, zone_id: Option<String>) -> Result<(), Error> {
        self.inner.write().await.settings.zone_id = zone_id;
        Ok(())
    }

    async fn set_api_token_ciphertext(&self, ciphertext: String) -> Result<(), Error> {
        self.inner.write().await.settings.api_token = Some(ciphertext);
        Ok(())
    }
}
