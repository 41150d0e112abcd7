//! Core traits for the DDNS system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`DnsProvider`]: Look up, create and update records via the provider API
//! - [`HostRegistry`]: Persistent host configuration and last-known state
//! - [`SettingsStore`]: Singleton provider settings (encrypted token)

pub mod dns_provider;
pub mod host_registry;
pub mod settings_store;

pub use dns_provider::{DnsProvider, ProviderCredential, RecordSpec, RemoteRecord};
pub use host_registry::HostRegistry;
pub use settings_store::SettingsStore;
