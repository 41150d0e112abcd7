//! Contract Test: Cloudflare API usage
//!
//! Constraints verified:
//! - Lookup queries by exact name and takes the first result
//! - Create and update send the full record with `proxied: false`
//! - Every request carries the bearer token
//! - Non-2xx statuses, `success: false` envelopes and timeouts surface as
//!   provider errors with the upstream detail
//!
//! Runs against a local wiremock server, never the real API.

use ddns_core::traits::{DnsProvider, ProviderCredential, RecordSpec};
use ddns_core::{Error, RecordType};
use ddns_provider_cloudflare::CloudflareProvider;
use std::time::Duration;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ZONE: &str = "023e105f4ecef8ad9ca31a8372d0c353";
const TOKEN: &str = "test_token_12345";

fn credential() -> ProviderCredential {
    ProviderCredential::new(ZONE, TOKEN)
}

fn provider(server: &MockServer) -> CloudflareProvider {
    CloudflareProvider::with_base_url(Duration::from_secs(5), server.uri()).unwrap()
}

fn spec(content: &str) -> RecordSpec {
    RecordSpec {
        hostname: "home.example.org".to_string(),
        content: content.to_string(),
        record_type: RecordType::A,
        ttl: 300,
    }
}

fn record_json(id: &str, content: &str, record_type: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "zone_id": ZONE,
        "name": "home.example.org",
        "type": record_type,
        "content": content,
        "proxied": false,
        "ttl": 300
    })
}

fn envelope(result: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "success": true,
        "errors": [],
        "messages": [],
        "result": result
    })
}

#[tokio::test]
async fn lookup_returns_first_matching_record() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/zones/{}/dns_records", ZONE)))
        .and(query_param("name", "home.example.org"))
        .and(header("Authorization", format!("Bearer {}", TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(serde_json::json!([
            record_json("rec-a", "1.2.3.4", "A"),
            record_json("rec-aaaa", "2001:db8::1", "AAAA"),
        ]))))
        .expect(1)
        .mount(&server)
        .await;

    let record = provider(&server)
        .lookup("home.example.org", &credential())
        .await
        .unwrap()
        .expect("record should be found");

    assert_eq!(record.id, "rec-a");
    assert_eq!(record.content, "1.2.3.4");
    assert_eq!(record.record_type, "A");
    assert_eq!(record.ttl, 300);
}

#[tokio::test]
async fn lookup_with_no_results_is_none() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/zones/{}/dns_records", ZONE)))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(serde_json::json!([]))))
        .mount(&server)
        .await;

    let record = provider(&server)
        .lookup("home.example.org", &credential())
        .await
        .unwrap();
    assert!(record.is_none());
}

#[tokio::test]
async fn create_posts_unproxied_record() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/zones/{}/dns_records", ZONE)))
        .and(header("Authorization", format!("Bearer {}", TOKEN).as_str()))
        .and(body_json(serde_json::json!({
            "type": "A",
            "name": "home.example.org",
            "content": "1.2.3.4",
            "ttl": 300,
            "proxied": false
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(envelope(record_json("rec-new", "1.2.3.4", "A"))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let created = provider(&server)
        .create(&spec("1.2.3.4"), &credential())
        .await
        .unwrap();
    assert_eq!(created.id, "rec-new");
    assert_eq!(created.content, "1.2.3.4");
}

#[tokio::test]
async fn update_puts_to_record_id() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path(format!("/zones/{}/dns_records/rec-a", ZONE)))
        .and(body_json(serde_json::json!({
            "type": "A",
            "name": "home.example.org",
            "content": "5.6.7.8",
            "ttl": 300,
            "proxied": false
        })))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(envelope(record_json("rec-a", "5.6.7.8", "A"))),
        )
        .expect(1)
        .mount(&server)
        .await;

    let updated = provider(&server)
        .update("rec-a", &spec("5.6.7.8"), &credential())
        .await
        .unwrap();
    assert_eq!(updated.id, "rec-a");
    assert_eq!(updated.content, "5.6.7.8");
}

#[tokio::test]
async fn error_status_carries_upstream_detail() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/zones/{}/dns_records", ZONE)))
        .respond_with(ResponseTemplate::new(403).set_body_json(serde_json::json!({
            "success": false,
            "errors": [{"code": 10000, "message": "Authentication error"}],
            "messages": [],
            "result": null
        })))
        .mount(&server)
        .await;

    let err = provider(&server)
        .lookup("home.example.org", &credential())
        .await
        .unwrap_err();

    match &err {
        Error::Provider {
            provider,
            status,
            message,
        } => {
            assert_eq!(provider, "cloudflare");
            assert_eq!(*status, Some(403));
            assert!(message.contains("Authentication error (10000)"), "{}", message);
        }
        other => panic!("expected provider error, got {:?}", other),
    }
    assert!(!err.to_string().contains(TOKEN));
}

#[tokio::test]
async fn non_json_error_body_is_excerpted() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/zones/{}/dns_records", ZONE)))
        .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
        .mount(&server)
        .await;

    let err = provider(&server)
        .create(&spec("1.2.3.4"), &credential())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Provider { status: Some(502), .. }));
    assert!(err.to_string().contains("Bad Gateway"));
}

#[tokio::test]
async fn unsuccessful_envelope_is_an_error() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path(format!("/zones/{}/dns_records/rec-a", ZONE)))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "success": false,
            "errors": [{"code": 81057, "message": "Record already exists."}],
            "messages": [],
            "result": null
        })))
        .mount(&server)
        .await;

    let err = provider(&server)
        .update("rec-a", &spec("5.6.7.8"), &credential())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Provider { .. }));
    assert!(err.to_string().contains("Record already exists."));
}

#[tokio::test]
async fn timeout_is_a_provider_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/zones/{}/dns_records", ZONE)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(envelope(serde_json::json!([])))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let provider =
        CloudflareProvider::with_base_url(Duration::from_millis(200), server.uri()).unwrap();
    let err = provider
        .lookup("home.example.org", &credential())
        .await
        .unwrap_err();

    match err {
        Error::Provider { status, message, .. } => {
            assert_eq!(status, None);
            assert!(message.contains("timed out"), "{}", message);
        }
        other => panic!("expected provider error, got {:?}", other),
    }
}
