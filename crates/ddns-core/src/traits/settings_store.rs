// # Settings Store Trait
//
// Storage for the singleton provider settings (zone id and encrypted API
// token). Values are read fresh for every reconciliation so edits made by
// an administrator take effect on the next request without a restart.

use async_trait::async_trait;

use crate::model::ProviderSettings;

/// Trait for provider settings storage
///
/// The API token is stored exactly as given: callers encrypt it with
/// [`SecretStore`](crate::secrets::SecretStore) first. Implementations never
/// see plaintext credentials.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Current provider settings (defaults when never configured)
    async fn provider_settings(&self) -> Result<ProviderSettings, crate::Error>;

    /// Replace the zone id (`None` clears it)
    async fn set_zone_id(&self, zone_id: Option<String>) -> Result<(), crate::Error>;

    /// Replace the stored API token ciphertext
    async fn set_api_token_ciphertext(&self, ciphertext: String) -> Result<(), crate::Error>;
}
