//! Caller address resolution
//!
//! Behind one reverse proxy the TCP peer is the proxy itself; the client is
//! the last entry the proxy appended to `X-Forwarded-For`. Earlier entries
//! are client-controlled and ignored.

use axum::http::HeaderMap;
use std::net::IpAddr;

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Address used as the update target when the request carries no `ip`
pub(crate) fn client_ip(peer: IpAddr, headers: &HeaderMap, trust_forwarded_for: bool) -> IpAddr {
    if !trust_forwarded_for {
        return peer;
    }

    let last = headers
        .get_all(X_FORWARDED_FOR)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .last();

    match last.map(|entry| (entry, entry.parse::<IpAddr>())) {
        Some((_, Ok(ip))) => ip,
        Some((entry, Err(_))) => {
            tracing::debug!("Ignoring unparseable X-Forwarded-For entry '{}'", entry);
            peer
        }
        None => peer,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn peer() -> IpAddr {
        IpAddr::from([10, 0, 0, 1])
    }

    #[test]
    fn test_untrusted_header_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static("203.0.113.7"));
        assert_eq!(client_ip(peer(), &headers, false), peer());
    }

    #[test]
    fn test_last_entry_wins() {
        let mut headers = HeaderMap::new();
        headers.insert(
            X_FORWARDED_FOR,
            HeaderValue::from_static("1.1.1.1, 203.0.113.7"),
        );
        assert_eq!(
            client_ip(peer(), &headers, true),
            IpAddr::from([203, 0, 113, 7])
        );

        headers.append(X_FORWARDED_FOR, HeaderValue::from_static("2001:db8::5"));
        assert_eq!(
            client_ip(peer(), &headers, true),
            "2001:db8::5".parse::<IpAddr>().unwrap()
        );
    }

    #[test]
    fn test_missing_or_garbage_falls_back_to_peer() {
        let headers = HeaderMap::new();
        assert_eq!(client_ip(peer(), &headers, true), peer());

        let mut headers = HeaderMap::new();
        headers.insert(X_FORWARDED_FOR, HeaderValue::from_static("unknown"));
        assert_eq!(client_ip(peer(), &headers, true), peer());
    }
}
