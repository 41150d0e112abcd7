// # ddns-core
//
// Core library for the self-hosted dynamic DNS updater.
//
// ## Architecture Overview
//
// Registered hosts push their address with a per-host token; the core
// decides whether the provider's record needs to change and applies the
// minimal write:
// - **SecretStore**: Authenticated encryption of provider credentials at rest
// - **DnsProvider**: Trait for looking up, creating and updating records
// - **HostRegistry** / **SettingsStore**: Persistent hosts and provider settings
// - **ReconciliationEngine**: Authenticate → resolve → lookup → write → commit
//
// ## Design Principles
//
// 1. **Library-First**: The HTTP boundary and the daemon are thin layers
// 2. **Provider is the source of truth**: Remote record ids are never cached
// 3. **Commit after success**: Local state changes only after the provider accepted the write
// 4. **Idempotency**: Submitting the current address never writes to the provider

pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod secrets;
pub mod store;
pub mod traits;
pub mod validation;

// Re-export core types for convenience
pub use config::{DdnsConfig, ProviderConfig, ServerConfig, StateStoreConfig};
pub use engine::{ReconcileOutcome, ReconciliationEngine, UpdateRequest};
pub use error::{Error, Result};
pub use model::{AuthToken, Host, HostChanges, HostId, NewHost, ProviderSettings, RecordType};
pub use secrets::SecretStore;
pub use store::{FileStore, MemoryStore};
pub use traits::{DnsProvider, HostRegistry, SettingsStore};
