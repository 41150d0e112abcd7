//! Configuration types for the DDNS system
//!
//! The daemon fills these from the environment; library users can build them
//! directly or deserialize them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default listen address for the HTTP server
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Default location of the file store
pub const DEFAULT_STATE_PATH: &str = "/var/lib/ddns/state.json";

/// Minimum length for the master secret and the admin token
pub const MIN_SECRET_LEN: usize = 16;

/// Main DDNS configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DdnsConfig {
    /// HTTP server settings
    #[serde(default)]
    pub server: ServerConfig,

    /// Host registry / settings storage
    #[serde(default)]
    pub state_store: StateStoreConfig,

    /// DNS provider client settings
    #[serde(default)]
    pub provider: ProviderConfig,
}

impl DdnsConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.server.validate()?;
        self.state_store.validate()?;
        self.provider.validate()?;

        // An update is a lookup followed by at most one write
        let worst_case = self.provider.timeout_secs.saturating_mul(2);
        if self.server.request_timeout_secs <= worst_case {
            return Err(crate::Error::config(format!(
                "Request timeout ({}s) must be greater than twice the provider timeout ({}s)",
                self.server.request_timeout_secs, self.provider.timeout_secs
            )));
        }
        Ok(())
    }
}

/// HTTP server configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Per-request timeout enforced by the router (seconds)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Take the client address from the last `X-Forwarded-For` entry
    ///
    /// Only enable behind exactly one trusted reverse proxy.
    #[serde(default)]
    pub trust_forwarded_for: bool,

    /// Bearer token for the admin API; admin routes are disabled when unset
    #[serde(default)]
    pub admin_token: Option<String>,
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.bind_addr.parse::<std::net::SocketAddr>().is_err() {
            return Err(crate::Error::config(format!(
                "Invalid bind address '{}', expected host:port",
                self.bind_addr
            )));
        }
        if !(1..=300).contains(&self.request_timeout_secs) {
            return Err(crate::Error::config(
                "Request timeout must be between 1 and 300 seconds",
            ));
        }
        if let Some(token) = &self.admin_token
            && token.len() < MIN_SECRET_LEN
        {
            return Err(crate::Error::config(format!(
                "Admin token must be at least {MIN_SECRET_LEN} characters"
            )));
        }
        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            request_timeout_secs: default_request_timeout_secs(),
            trust_forwarded_for: false,
            admin_token: None,
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_addr", &self.bind_addr)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("trust_forwarded_for", &self.trust_forwarded_for)
            .field("admin_token", &self.admin_token.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

/// State store configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StateStoreConfig {
    /// File-based store
    File {
        /// Path to the store file
        path: String,
    },

    /// In-memory store (not persistent)
    Memory,
}

impl StateStoreConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            StateStoreConfig::File { path } if path.trim().is_empty() => {
                Err(crate::Error::config("State store path cannot be empty"))
            }
            _ => Ok(()),
        }
    }
}

impl Default for StateStoreConfig {
    fn default() -> Self {
        StateStoreConfig::File {
            path: DEFAULT_STATE_PATH.to_string(),
        }
    }
}

/// DNS provider configuration
///
/// `zone_id` and `api_token` seed the stored provider settings at startup;
/// afterwards the admin API owns them.
#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// HTTP timeout for each provider call (seconds)
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,

    /// Zone to seed into settings
    #[serde(default)]
    pub zone_id: Option<String>,

    /// Plaintext API token to encrypt into settings
    #[serde(default)]
    pub api_token: Option<String>,
}

impl ProviderConfig {
    pub fn validate(&self) -> Result<(), crate::Error> {
        if !(1..=60).contains(&self.timeout_secs) {
            return Err(crate::Error::config(
                "Provider timeout must be between 1 and 60 seconds",
            ));
        }
        Ok(())
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_provider_timeout_secs(),
            zone_id: None,
            api_token: None,
        }
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("timeout_secs", &self.timeout_secs)
            .field("zone_id", &self.zone_id)
            .field("api_token", &self.api_token.as_ref().map(|_| "<REDACTED>"))
            .finish()
    }
}

fn default_bind_addr() -> String {
    DEFAULT_BIND_ADDR.to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_provider_timeout_secs() -> u64 {
    10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = DdnsConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.bind_addr, "0.0.0.0:8080");
        assert_eq!(config.provider.timeout_secs, 10);
        assert_eq!(
            config.state_store,
            StateStoreConfig::File {
                path: "/var/lib/ddns/state.json".to_string()
            }
        );
    }

    #[test]
    fn test_deserialize_partial() {
        let config: DdnsConfig = serde_json::from_str(
            r#"{"state_store": {"type": "memory"}, "server": {"trust_forwarded_for": true}}"#,
        )
        .unwrap();
        assert_eq!(config.state_store, StateStoreConfig::Memory);
        assert!(config.server.trust_forwarded_for);
        assert_eq!(config.server.request_timeout_secs, 30);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = DdnsConfig::default();
        config.server.bind_addr = "localhost".to_string();
        assert!(config.validate().is_err());

        let mut config = DdnsConfig::default();
        config.server.admin_token = Some("short".to_string());
        assert!(config.validate().is_err());

        let mut config = DdnsConfig::default();
        config.provider.timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = DdnsConfig::default();
        config.state_store = StateStoreConfig::File {
            path: " ".to_string(),
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_request_timeout_must_cover_two_provider_calls() {
        let mut config = DdnsConfig::default();
        config.provider.timeout_secs = 10;
        config.server.request_timeout_secs = 20;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("twice the provider timeout"));

        config.server.request_timeout_secs = 15;
        assert!(config.validate().is_err());

        config.server.request_timeout_secs = 21;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let mut config = DdnsConfig::default();
        config.server.admin_token = Some("admin-token-0123456789".to_string());
        config.provider.api_token = Some("cf-token-secret".to_string());

        let debug_str = format!("{:?}", config);
        assert!(!debug_str.contains("admin-token-0123456789"));
        assert!(!debug_str.contains("cf-token-secret"));
    }
}
