//! Plain data records for hosts and provider settings
//!
//! These types carry no query logic; persistence goes through the
//! [`HostRegistry`](crate::traits::HostRegistry) and
//! [`SettingsStore`](crate::traits::SettingsStore) traits.

use chrono::{DateTime, Utc};
use rand::RngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Number of random bytes in a generated auth token (hex-encoded to 32 chars)
pub const AUTH_TOKEN_BYTES: usize = 16;

/// Default record TTL in seconds
pub const DEFAULT_TTL: u32 = 300;

/// Opaque host identifier assigned by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HostId(pub u64);

impl fmt::Display for HostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// DNS record type managed for a host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RecordType {
    /// IPv4 address record
    #[default]
    A,
    /// IPv6 address record
    #[serde(rename = "AAAA")]
    Aaaa,
    /// Canonical name record
    #[serde(rename = "CNAME")]
    Cname,
}

impl RecordType {
    /// Wire name used by DNS providers
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RecordType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "A" => Ok(RecordType::A),
            "AAAA" => Ok(RecordType::Aaaa),
            "CNAME" => Ok(RecordType::Cname),
            other => Err(Error::validation(format!(
                "unsupported record type '{other}' (supported: A, AAAA, CNAME)"
            ))),
        }
    }
}

/// Per-host secret used to authenticate update requests
///
/// The `Debug` implementation never prints the token. Comparison is
/// constant-time over SHA-256 digests, so neither content nor length leaks
/// through timing.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthToken(String);

impl AuthToken {
    /// Generate a fresh token from the OS random source
    pub fn generate() -> Self {
        let mut bytes = [0u8; AUTH_TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Wrap an existing token value (tests, imports)
    pub fn from_value(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Check a candidate token without early exit
    pub fn verify(&self, candidate: &str) -> bool {
        constant_time_eq(self.0.as_bytes(), candidate.as_bytes())
    }

    /// Reveal the token (admin responses only)
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<REDACTED>)")
    }
}

/// Constant-time equality for secrets of arbitrary length
///
/// Both inputs are hashed first so the comparison always runs over 32 bytes.
pub fn constant_time_eq(expected: &[u8], candidate: &[u8]) -> bool {
    let a = Sha256::digest(expected);
    let b = Sha256::digest(candidate);
    a.iter()
        .zip(b.iter())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// A registered dynamic-DNS target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Host {
    /// Store-assigned identifier
    pub id: HostId,
    /// Normalized FQDN, unique within the registry
    pub hostname: String,
    /// Record type pushed to the provider
    #[serde(default)]
    pub record_type: RecordType,
    /// Record TTL in seconds
    pub ttl: u32,
    /// Secret for the public update endpoint
    pub auth_token: AuthToken,
    /// Last content successfully pushed to the provider
    pub current_ip: Option<String>,
    /// Time of the last successful reconciliation
    pub last_updated: Option<DateTime<Utc>>,
}

/// Administrator input for creating a host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHost {
    pub hostname: String,
    pub record_type: RecordType,
    pub ttl: u32,
}

impl NewHost {
    /// A host with the default record type and TTL
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            record_type: RecordType::default(),
            ttl: DEFAULT_TTL,
        }
    }

    pub fn with_record_type(mut self, record_type: RecordType) -> Self {
        self.record_type = record_type;
        self
    }

    pub fn with_ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Administrator edit of a host; the auth token is never editable
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostChanges {
    pub hostname: String,
    pub record_type: RecordType,
    pub ttl: u32,
}

/// Singleton provider configuration as persisted
///
/// `api_token` holds ciphertext produced by
/// [`SecretStore::encrypt`](crate::secrets::SecretStore::encrypt).
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSettings {
    pub zone_id: Option<String>,
    pub api_token: Option<String>,
}

impl ProviderSettings {
    /// Whether an API token has been stored
    pub fn has_api_token(&self) -> bool {
        self.api_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("zone_id", &self.zone_id)
            .field("api_token", &self.has_api_token().then_some("<ENCRYPTED>"))
            .finish()
    }
}
