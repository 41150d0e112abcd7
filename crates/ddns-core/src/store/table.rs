//! In-memory host table shared by the store implementations
//!
//! Hosts are kept in id order with a hash index from hostname to id, so
//! `find_by_hostname` is a single map lookup.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::error::{Error, Result};
use crate::model::{AuthToken, Host, HostChanges, HostId, NewHost, ProviderSettings};
use crate::validation::{normalize_hostname, validate_ttl};

/// Store format version
/// Used for future migration if format changes
pub(crate) const STORE_FORMAT_VERSION: &str = "1.0";

/// Serializable snapshot of the whole store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct StoreSnapshot {
    pub version: String,
    pub next_id: u64,
    #[serde(default)]
    pub hosts: Vec<Host>,
    #[serde(default)]
    pub settings: ProviderSettings,
}

impl Default for StoreSnapshot {
    fn default() -> Self {
        Self {
            version: STORE_FORMAT_VERSION.to_string(),
            next_id: 1,
            hosts: Vec::new(),
            settings: ProviderSettings::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct HostTable {
    next_id: u64,
    hosts: BTreeMap<HostId, Host>,
    by_hostname: HashMap<String, HostId>,
    pub settings: ProviderSettings,
}

impl Default for HostTable {
    fn default() -> Self {
        Self {
            next_id: 1,
            hosts: BTreeMap::new(),
            by_hostname: HashMap::new(),
            settings: ProviderSettings::default(),
        }
    }
}

impl HostTable {
    /// Rebuild the table and its index from a snapshot
    ///
    /// Hostnames are normalized on load so hand-edited files stay reachable.
    /// Fails if the snapshot contains an invalid hostname, or two hosts with
    /// the same id or normalized hostname.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self> {
        let mut table = Self {
            next_id: snapshot.next_id.max(1),
            settings: snapshot.settings,
            ..Self::default()
        };

        for mut host in snapshot.hosts {
            host.hostname = normalize_hostname(&host.hostname).map_err(|e| {
                Error::state_store(format!("invalid hostname in store '{}': {e}", host.hostname))
            })?;
            if table.by_hostname.contains_key(&host.hostname) {
                return Err(Error::state_store(format!(
                    "duplicate hostname in store: {}",
                    host.hostname
                )));
            }
            if table.hosts.contains_key(&host.id) {
                return Err(Error::state_store(format!("duplicate host id in store: {}", host.id)));
            }
            table.next_id = table.next_id.max(host.id.0 + 1);
            table.by_hostname.insert(host.hostname.clone(), host.id);
            table.hosts.insert(host.id, host);
        }

        Ok(table)
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            version: STORE_FORMAT_VERSION.to_string(),
            next_id: self.next_id,
            hosts: self.hosts.values().cloned().collect(),
            settings: self.settings.clone(),
        }
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn insert(&mut self, new: NewHost) -> Result<Host> {
        let hostname = normalize_hostname(&new.hostname)?;
        let ttl = validate_ttl(new.ttl)?;

        if self.by_hostname.contains_key(&hostname) {
            return Err(Error::conflict(format!("hostname already registered: {hostname}")));
        }

        let id = HostId(self.next_id);
        self.next_id += 1;

        let host = Host {
            id,
            hostname: hostname.clone(),
            record_type: new.record_type,
            ttl,
            auth_token: AuthToken::generate(),
            current_ip: None,
            last_updated: None,
        };

        self.by_hostname.insert(hostname, id);
        self.hosts.insert(id, host.clone());
        Ok(host)
    }

    pub fn get(&self, id: HostId) -> Option<&Host> {
        self.hosts.get(&id)
    }

    pub fn find(&self, hostname: &str) -> Option<&Host> {
        self.by_hostname
            .get(hostname)
            .and_then(|id| self.hosts.get(id))
    }

    pub fn list(&self) -> Vec<Host> {
        self.hosts.values().cloned().collect()
    }

    pub fn update(&mut self, id: HostId, changes: HostChanges) -> Result<Host> {
        let hostname = normalize_hostname(&changes.hostname)?;
        let ttl = validate_ttl(changes.ttl)?;

        if let Some(owner) = self.by_hostname.get(&hostname)
            && *owner != id
        {
            return Err(Error::conflict(format!("hostname already registered: {hostname}")));
        }

        let host = self
            .hosts
            .get_mut(&id)
            .ok_or_else(|| Error::not_found(format!("host {id}")))?;

        if host.hostname != hostname {
            self.by_hostname.remove(&host.hostname);
            self.by_hostname.insert(hostname.clone(), id);
            host.hostname = hostname;
        }
        host.record_type = changes.record_type;
        host.ttl = ttl;

        Ok(host.clone())
    }

    pub fn record_reconciliation(
        &mut self,
        id: HostId,
        content: &str,
        at: DateTime<Utc>,
    ) -> Result<Host> {
        let host = self
            .hosts
            .get_mut(&id)
            .ok_or_else(|| Error::not_found(format!("host {id}")))?;
        host.current_ip = Some(content.to_string());
        host.last_updated = Some(at);
        Ok(host.clone())
    }

    pub fn remove(&mut self, id: HostId) -> Result<Host> {
        let host = self
            .hosts
            .remove(&id)
            .ok_or_else(|| Error::not_found(format!("host {id}")))?;
        self.by_hostname.remove(&host.hostname);
        Ok(host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RecordType;

    #[test]
    fn test_insert_assigns_ids_and_tokens() {
        let mut table = HostTable::default();
        let a = table.insert(NewHost::new("a.example.com")).unwrap();
        let b = table.insert(NewHost::new("b.example.com")).unwrap();

        assert_eq!(a.id, HostId(1));
        assert_eq!(b.id, HostId(2));
        assert_ne!(a.auth_token, b.auth_token);
        assert_eq!(a.ttl, 300);
        assert_eq!(a.record_type, RecordType::A);
        assert!(a.current_ip.is_none());
        assert!(a.last_updated.is_none());
    }

    #[test]
    fn test_insert_normalizes_and_rejects_duplicates() {
        let mut table = HostTable::default();
        let host = table.insert(NewHost::new("Home.Example.org.")).unwrap();
        assert_eq!(host.hostname, "home.example.org");

        let err = table.insert(NewHost::new("home.example.org")).unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn test_update_reindexes_hostname() {
        let mut table = HostTable::default();
        let host = table.insert(NewHost::new("old.example.com")).unwrap();
        let token = host.auth_token.clone();

        let updated = table
            .update(
                host.id,
                HostChanges {
                    hostname: "new.example.com".to_string(),
                    record_type: RecordType::Aaaa,
                    ttl: 120,
                },
            )
            .unwrap();

        assert_eq!(updated.auth_token, token);
        assert!(table.find("old.example.com").is_none());
        assert_eq!(table.find("new.example.com").unwrap().ttl, 120);
    }

    #[test]
    fn test_update_rejects_taken_hostname() {
        let mut table = HostTable::default();
        table.insert(NewHost::new("a.example.com")).unwrap();
        let b = table.insert(NewHost::new("b.example.com")).unwrap();

        let err = table
            .update(
                b.id,
                HostChanges {
                    hostname: "a.example.com".to_string(),
                    record_type: RecordType::A,
                    ttl: 300,
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn test_snapshot_round_trip_keeps_next_id() {
        let mut table = HostTable::default();
        let a = table.insert(NewHost::new("a.example.com")).unwrap();
        table.insert(NewHost::new("b.example.com")).unwrap();
        table.remove(a.id).unwrap();

        let mut restored = HostTable::from_snapshot(table.snapshot()).unwrap();
        assert_eq!(restored.len(), 1);
        let c = restored.insert(NewHost::new("c.example.com")).unwrap();
        assert_eq!(c.id, HostId(3));
    }

    #[test]
    fn test_snapshot_with_duplicate_hostnames_is_rejected() {
        let mut table = HostTable::default();
        let a = table.insert(NewHost::new("a.example.com")).unwrap();
        let mut snapshot = table.snapshot();
        let mut dup = a.clone();
        dup.id = HostId(7);
        snapshot.hosts.push(dup);

        assert!(HostTable::from_snapshot(snapshot).is_err());
    }

    #[test]
    fn test_snapshot_hostnames_are_normalized_on_load() {
        let mut table = HostTable::default();
        let host = table.insert(NewHost::new("home.example.org")).unwrap();
        let mut snapshot = table.snapshot();
        snapshot.hosts[0].hostname = "Home.Example.org.".to_string();

        let restored = HostTable::from_snapshot(snapshot).unwrap();
        let found = restored.find("home.example.org").unwrap();
        assert_eq!(found.id, host.id);
        assert_eq!(found.hostname, "home.example.org");
    }

    #[test]
    fn test_snapshot_with_case_variant_duplicates_is_rejected() {
        let mut table = HostTable::default();
        let a = table.insert(NewHost::new("a.example.com")).unwrap();
        let mut snapshot = table.snapshot();
        let mut dup = a.clone();
        dup.id = HostId(7);
        dup.hostname = "A.EXAMPLE.COM".to_string();
        snapshot.hosts.push(dup);

        let err = HostTable::from_snapshot(snapshot).unwrap_err();
        assert!(matches!(err, Error::StateStore(_)));
    }

    #[test]
    fn test_snapshot_with_invalid_hostname_is_rejected() {
        let mut table = HostTable::default();
        table.insert(NewHost::new("a.example.com")).unwrap();
        let mut snapshot = table.snapshot();
        snapshot.hosts[0].hostname = "bad host!".to_string();

        let err = HostTable::from_snapshot(snapshot).unwrap_err();
        assert!(matches!(err, Error::StateStore(_)));
    }
}
