// # File Store
//
// File-based implementation of HostRegistry and SettingsStore with crash
// recovery.
//
// ## Crash Recovery
//
// - Atomic writes: Uses write-then-rename for atomicity
// - Corruption detection: Validates JSON and the hostname index on load
// - Automatic backup: Keeps .backup of last known good state
// - Recovery: Falls back to backup if corruption detected
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "next_id": 2,
//   "hosts": [
//     {
//       "id": 1,
//       "hostname": "home.example.org",
//       "record_type": "A",
//       "ttl": 300,
//       "auth_token": "9f86d081884c7d659a2feaa0c55ad015",
//       "current_ip": "203.0.113.7",
//       "last_updated": "2025-01-09T12:00:00Z"
//     }
//   ],
//   "settings": { "zone_id": "023e105f4ecef8ad9ca31a8372d0c353", "api_token": "<ciphertext>" }
// }
// ```
//
// The file holds per-host auth tokens, so it is created with mode 0600 on
// unix.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use super::table::{HostTable, STORE_FORMAT_VERSION, StoreSnapshot};
use crate::Error;
use crate::model::{Host, HostChanges, HostId, NewHost, ProviderSettings};
use crate::traits::{HostRegistry, SettingsStore};

/// File-based store with crash recovery
///
/// Every mutation is applied to a copy of the table, written to disk, and
/// only then made visible. A failed write leaves both the file and the
/// in-memory view unchanged.
///
/// # Example
///
/// ```rust,no_run
/// use ddns_core::model::NewHost;
/// use ddns_core::store::FileStore;
/// use ddns_core::traits::HostRegistry;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileStore::new("/var/lib/ddns/state.json").await?;
///
///     // Written to disk before returning
///     let host = store.create_host(NewHost::new("home.example.org")).await?;
///     println!("token: {}", host.auth_token.expose());
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    state: RwLock<HostTable>,
}

impl FileStore {
    /// Create or load a file store
    ///
    /// This will:
    /// 1. Create parent directories if needed
    /// 2. Try to load the existing store file
    /// 3. If corruption detected, try to load from backup
    /// 4. If both fail, start with an empty store
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::config(format!(
                    "Failed to create state directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let table = Self::load_with_recovery(&path).await?;

        Ok(Self {
            path,
            state: RwLock::new(table),
        })
    }

    /// Path of the store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the store with automatic recovery
    ///
    /// Only corruption (unparseable JSON, duplicate hostnames) triggers the
    /// backup. I/O errors such as permission failures are returned as-is so
    /// the daemon refuses to start instead of silently dropping hosts.
    async fn load_with_recovery(path: &Path) -> Result<HostTable, Error> {
        let err = match Self::load(path).await {
            Ok(table) => {
                tracing::debug!("Loaded store from file: {} hosts", table.len());
                return Ok(table);
            }
            Err(e) if Self::is_corruption(&e) => e,
            Err(e) => return Err(e),
        };

        tracing::warn!(
            "Store file appears corrupted: {}. Attempting recovery from backup.",
            err
        );

        let backup_path = Self::backup_path(path);
        if !backup_path.exists() {
            tracing::warn!("No backup file found. Starting with empty store.");
            return Ok(HostTable::default());
        }

        match Self::load(&backup_path).await {
            Ok(table) => {
                tracing::info!("Recovered store from backup: {} hosts", table.len());
                if let Err(restore_err) = Self::restore_from_backup(path, &backup_path).await {
                    tracing::error!("Failed to restore store file from backup: {}", restore_err);
                }
                Ok(table)
            }
            Err(backup_err) => {
                tracing::error!(
                    "Backup also corrupted: {}. Starting with empty store.",
                    backup_err
                );
                Ok(HostTable::default())
            }
        }
    }

    fn is_corruption(err: &Error) -> bool {
        matches!(err, Error::Json(_) | Error::StateStore(_))
    }

    /// Load the store from a single file
    async fn load(path: &Path) -> Result<HostTable, Error> {
        if !path.exists() {
            tracing::debug!("Store file does not exist: {}", path.display());
            return Ok(HostTable::default());
        }

        let content = fs::read_to_string(path).await?;
        let snapshot: StoreSnapshot = serde_json::from_str(&content)?;

        if snapshot.version != STORE_FORMAT_VERSION {
            tracing::warn!(
                "Store file version mismatch: expected {}, got {}. \
                Attempting to load anyway.",
                STORE_FORMAT_VERSION,
                snapshot.version
            );
        }

        HostTable::from_snapshot(snapshot)
    }

    /// Apply `f` to a copy of the table, persist it, then publish it
    async fn mutate<T, F>(&self, f: F) -> Result<T, Error>
    where
        F: FnOnce(&mut HostTable) -> Result<T, Error>,
    {
        let mut guard = self.state.write().await;
        let mut next = guard.clone();
        let out = f(&mut next)?;
        self.write_snapshot(&next.snapshot()).await?;
        *guard = next;
        Ok(out)
    }

    /// Write a snapshot to disk atomically
    async fn write_snapshot(&self, snapshot: &StoreSnapshot) -> Result<(), Error> {
        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| Error::state_store(format!("Failed to serialize store: {}", e)))?;

        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                file.set_permissions(std::fs::Permissions::from_mode(0o600))
                    .await
                    .map_err(|e| {
                        Error::state_store(format!(
                            "Failed to restrict permissions on {}: {}",
                            temp_path.display(),
                            e
                        ))
                    })?;
            }

            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.sync_all().await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to sync temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        if self.path.exists() {
            let backup_path = Self::backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &backup_path).await {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("Store written to file: {}", self.path.display());
        Ok(())
    }

    async fn restore_from_backup(path: &Path, backup_path: &Path) -> Result<(), Error> {
        fs::copy(backup_path, path).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to restore from backup {} to {}: {}",
                backup_path.display(),
                path.display(),
                e
            ))
        })?;

        tracing::info!("Restored store file from backup");
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

#[async_trait]
impl HostRegistry for FileStore {
    async fn create_host(&self, host: NewHost) -> Result<Host, Error> {
        self.mutate(|table| table.insert(host)).await
    }

    async fn get_host(&self, id: HostId) -> Result<Option<Host>, Error> {
        Ok(self.state.read().await.get(id).cloned())
    }

    async fn find_by_hostname(&self, hostname: &str) -> Result<Option<Host>, Error> {
        Ok(self.state.read().await.find(hostname).cloned())
    }

    async fn list_hosts(&self) -> Result<Vec<Host>, Error> {
        Ok(self.state.read().await.list())
    }

    async fn update_host(&self, id: HostId, changes: HostChanges) -> Result<Host, Error> {
        self.mutate(|table| table.update(id, changes)).await
    }

    async fn record_reconciliation(
        &self,
        id: HostId,
        content: &str,
        at: DateTime<Utc>,
    ) -> Result<Host, Error> {
        self.mutate(|table| table.record_reconciliation(id, content, at))
            .await
    }

    async fn delete_host(&self, id: HostId) -> Result<Host, Error> {
        self.mutate(|table| table.remove(id)).await
    }

    async fn flush(&self) -> Result<(), Error> {
        let guard = self.state.read().await;
        self.write_snapshot(&guard.snapshot()).await
    }
}

#[async_trait]
impl SettingsStore for FileStore {
    async fn provider_settings(&self) -> Result<ProviderSettings, Error> {
        Ok(self.state.read().await.settings.clone())
    }

    async fn set_zone_id(&self, zone_id: Option<String>) -> Result<(), Error> {
        self.mutate(|table| {
            table.settings.zone_id = zone_id;
            Ok(())
        })
        .await
    }

    async fn set_api_token_ciphertext(&self, ciphertext: String) -> Result<(), Error> {
        self.mutate(|table| {
            table.settings.api_token = Some(ciphertext);
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_file_store_basic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = FileStore::new(&path).await.unwrap();
        assert!(store.list_hosts().await.unwrap().is_empty());

        let host = store
            .create_host(NewHost::new("home.example.org"))
            .await
            .unwrap();
        store
            .record_reconciliation(host.id, "1.2.3.4", Utc::now())
            .await
            .unwrap();

        assert!(path.exists());

        // Load new instance and verify persistence
        let store2 = FileStore::new(&path).await.unwrap();
        let loaded = store2
            .find_by_hostname("home.example.org")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(loaded.id, host.id);
        assert_eq!(loaded.auth_token, host.auth_token);
        assert_eq!(loaded.current_ip.as_deref(), Some("1.2.3.4"));
    }

    #[tokio::test]
    async fn test_file_store_settings_persist() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = FileStore::new(&path).await.unwrap();
        store.set_zone_id(Some("zone-1".to_string())).await.unwrap();
        store
            .set_api_token_ciphertext("ciphertext".to_string())
            .await
            .unwrap();

        let store2 = FileStore::new(&path).await.unwrap();
        let settings = store2.provider_settings().await.unwrap();
        assert_eq!(settings.zone_id.as_deref(), Some("zone-1"));
        assert_eq!(settings.api_token.as_deref(), Some("ciphertext"));
    }

    #[tokio::test]
    async fn test_file_store_corruption_recovery() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = FileStore::new(&path).await.unwrap();
        store
            .create_host(NewHost::new("a.example.org"))
            .await
            .unwrap();

        // Second write creates the backup holding only the first host
        store
            .create_host(NewHost::new("b.example.org"))
            .await
            .unwrap();

        let backup_path = FileStore::backup_path(&path);
        assert!(backup_path.exists(), "Backup file should exist after write");

        fs::write(&path, b"corrupted json data").await.unwrap();

        let store2 = FileStore::new(&path)
            .await
            .expect("corrupted store should recover from backup");
        let hosts = store2.list_hosts().await.unwrap();
        assert_eq!(hosts.len(), 1, "Backup should contain previous state");
        assert_eq!(hosts[0].hostname, "a.example.org");
    }

    #[tokio::test]
    async fn test_file_store_failed_mutation_leaves_state_unchanged() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = FileStore::new(&path).await.unwrap();
        store
            .create_host(NewHost::new("a.example.org"))
            .await
            .unwrap();

        let err = store
            .create_host(NewHost::new("A.example.org"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));

        let store2 = FileStore::new(&path).await.unwrap();
        assert_eq!(store2.list_hosts().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_file_store_atomic_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = FileStore::new(&path).await.unwrap();
        let host = store
            .create_host(NewHost::new("home.example.org"))
            .await
            .unwrap();

        for i in 0..10 {
            store
                .record_reconciliation(host.id, &format!("1.2.3.{}", i), Utc::now())
                .await
                .unwrap();
        }

        let store2 = FileStore::new(&path).await.unwrap();
        let loaded = store2.get_host(host.id).await.unwrap().unwrap();
        assert_eq!(loaded.current_ip.as_deref(), Some("1.2.3.9"));
        assert!(!store.temp_path().exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_file_store_is_private() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");

        let store = FileStore::new(&path).await.unwrap();
        store.flush().await.unwrap();

        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
