//! Input validation shared by the engine and the admin surface
//!
//! Hostnames are normalized before they are stored or looked up so that the
//! registry index, the per-host lock and the provider query all agree on one
//! spelling of a name.

use crate::error::{Error, Result};
use crate::model::RecordType;
use std::net::IpAddr;

/// Maximum total length of a domain name (RFC 1035)
const MAX_DOMAIN_LEN: usize = 253;

/// Maximum length of a single label (RFC 1035)
const MAX_LABEL_LEN: usize = 63;

/// Largest TTL accepted by the provider (one day)
pub const MAX_TTL: u32 = 86_400;

/// Normalize and validate a fully-qualified hostname
///
/// Trims whitespace, lowercases ASCII letters and drops a single trailing
/// dot, then checks RFC 1035 length limits and label syntax. Wildcard
/// (`*`) and underscore-prefixed labels are accepted since providers allow
/// them as record names.
pub fn normalize_hostname(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    let name = trimmed.strip_suffix('.').unwrap_or(trimmed).to_ascii_lowercase();

    if name.is_empty() {
        return Err(Error::validation("hostname cannot be empty"));
    }

    if name.len() > MAX_DOMAIN_LEN {
        return Err(Error::validation(format!(
            "hostname too long: {} chars (max {MAX_DOMAIN_LEN})",
            name.len()
        )));
    }

    if !name.contains('.') {
        return Err(Error::validation(format!(
            "hostname must be fully qualified: '{name}'"
        )));
    }

    for (index, label) in name.split('.').enumerate() {
        if label.is_empty() {
            return Err(Error::validation(format!("hostname has empty label: '{name}'")));
        }

        if label.len() > MAX_LABEL_LEN {
            return Err(Error::validation(format!(
                "hostname label too long: {} chars (max {MAX_LABEL_LEN}). Label: '{label}'",
                label.len()
            )));
        }

        if index == 0 && label == "*" {
            continue;
        }

        if !label
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(Error::validation(format!(
                "hostname label contains invalid characters: '{label}'"
            )));
        }

        if label.starts_with('-') || label.ends_with('-') {
            return Err(Error::validation(format!(
                "hostname label cannot start or end with hyphen: '{label}'"
            )));
        }
    }

    Ok(name)
}

/// Validate a record TTL in seconds
///
/// `1` is allowed: Cloudflare treats it as "automatic".
pub fn validate_ttl(ttl: u32) -> Result<u32> {
    if ttl == 0 || ttl > MAX_TTL {
        return Err(Error::validation(format!(
            "ttl must be between 1 and {MAX_TTL} seconds, got {ttl}"
        )));
    }
    Ok(ttl)
}

/// Validate that `content` is usable as the content of a `record_type` record
///
/// Returns the canonical content string: IP addresses are re-rendered from
/// their parsed form (so `::FFFF:1.2.3.4` and `1.2.3.4` compare equal with the
/// provider's answer), CNAME targets are normalized like hostnames.
pub fn validate_content(record_type: RecordType, content: &str) -> Result<String> {
    let content = content.trim();
    match record_type {
        RecordType::A | RecordType::Aaaa => {
            let ip: IpAddr = content.parse().map_err(|_| {
                Error::validation(format!("'{content}' is not a valid IP address"))
            })?;
            canonical_ip_for(record_type, ip)
        }
        RecordType::Cname => normalize_hostname(content),
    }
}

/// Check an address against the record type and render it canonically
pub fn canonical_ip_for(record_type: RecordType, ip: IpAddr) -> Result<String> {
    let ip = ip.to_canonical();
    match (record_type, ip) {
        (RecordType::A, IpAddr::V4(v4)) => Ok(v4.to_string()),
        (RecordType::Aaaa, IpAddr::V6(v6)) => Ok(v6.to_string()),
        (RecordType::A, IpAddr::V6(_)) => Err(Error::validation(format!(
            "A records require an IPv4 address, got {ip}"
        ))),
        (RecordType::Aaaa, IpAddr::V4(_)) => Err(Error::validation(format!(
            "AAAA records require an IPv6 address, got {ip}"
        ))),
        (RecordType::Cname, _) => Err(Error::validation(
            "CNAME records require an explicit target hostname",
        )),
    }
}
