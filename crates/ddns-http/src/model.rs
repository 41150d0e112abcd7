use ddns_core::{Host, HostId, ProviderSettings, RecordType};
use serde::{Deserialize, Serialize};

/// `{"status": "success" | "error", "message": ...}`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MessageBody {
    pub status: String,
    pub message: String,
}

impl MessageBody {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: "success".to_string(),
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            message: message.into(),
        }
    }
}

/// Body of `POST /update`
///
/// Fields are optional so that a missing field is reported as a 400 with a
/// readable message rather than a deserialization rejection.
#[derive(Deserialize, Default, Clone)]
pub(crate) struct UpdatePayload {
    pub hostname: Option<String>,
    pub token: Option<String>,
    pub ip: Option<String>,
}

/// One entry of `GET /status`
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct StatusEntry {
    pub hostname: String,
    pub current_ip: Option<String>,
    /// RFC 3339, or null if never reconciled
    pub last_updated: Option<String>,
}

impl From<Host> for StatusEntry {
    fn from(host: Host) -> Self {
        Self {
            hostname: host.hostname,
            current_ip: host.current_ip,
            last_updated: host.last_updated.map(|t| t.to_rfc3339()),
        }
    }
}

/// Host as shown to administrators, including its auth token
#[derive(Serialize, Debug, Clone)]
pub(crate) struct HostView {
    pub id: HostId,
    pub hostname: String,
    pub record_type: RecordType,
    pub ttl: u32,
    pub auth_token: String,
    pub current_ip: Option<String>,
    pub last_updated: Option<String>,
}

impl From<Host> for HostView {
    fn from(host: Host) -> Self {
        Self {
            id: host.id,
            hostname: host.hostname,
            record_type: host.record_type,
            ttl: host.ttl,
            auth_token: host.auth_token.expose().to_string(),
            current_ip: host.current_ip,
            last_updated: host.last_updated.map(|t| t.to_rfc3339()),
        }
    }
}

/// Body of `POST /api/hosts`
#[derive(Deserialize, Debug, Clone)]
pub(crate) struct CreateHostPayload {
    pub hostname: String,
    #[serde(default)]
    pub record_type: Option<RecordType>,
    #[serde(default)]
    pub ttl: Option<u32>,
}

/// Body of `PUT /api/hosts/{id}`
#[derive(Deserialize, Debug, Clone)]
pub(crate) struct UpdateHostPayload {
    pub hostname: String,
    pub record_type: RecordType,
    pub ttl: u32,
}

/// `GET /api/settings`; the token itself is never returned
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub(crate) struct SettingsView {
    pub zone_id: Option<String>,
    pub api_token_configured: bool,
}

impl From<ProviderSettings> for SettingsView {
    fn from(settings: ProviderSettings) -> Self {
        Self {
            api_token_configured: settings.has_api_token(),
            zone_id: settings.zone_id,
        }
    }
}

/// Body of `PUT /api/settings`
#[derive(Deserialize, Default, Clone)]
pub(crate) struct SettingsPayload {
    #[serde(default)]
    pub zone_id: Option<String>,
    /// Plaintext; empty or missing leaves the stored token untouched
    #[serde(default)]
    pub api_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddns_core::AuthToken;

    fn host() -> Host {
        Host {
            id: HostId(3),
            hostname: "home.example.org".to_string(),
            record_type: RecordType::Aaaa,
            ttl: 120,
            auth_token: AuthToken::from_value("0123abcd"),
            current_ip: None,
            last_updated: None,
        }
    }

    #[test]
    fn test_status_entry_serializes_nulls() {
        let value = serde_json::to_value(StatusEntry::from(host())).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "hostname": "home.example.org",
                "current_ip": null,
                "last_updated": null
            })
        );
    }

    #[test]
    fn test_host_view_uses_wire_record_type() {
        let value = serde_json::to_value(HostView::from(host())).unwrap();
        assert_eq!(value["record_type"], "AAAA");
        assert_eq!(value["id"], 3);
        assert_eq!(value["auth_token"], "0123abcd");
    }

    #[test]
    fn test_settings_view_hides_token() {
        let view = SettingsView::from(ProviderSettings {
            zone_id: Some("zone".to_string()),
            api_token: Some("ciphertext".to_string()),
        });
        let value = serde_json::to_value(view).unwrap();
        assert_eq!(value["api_token_configured"], true);
        assert!(!value.to_string().contains("ciphertext"));
    }
}
