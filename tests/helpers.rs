// Shared test helpers for mock service setup and test data creation.
//
// This module provides common utilities used across multiple test files to reduce duplication.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use requestrepo::{ClientConfig, RetryPolicy, Scheme};
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Environment variable no test ever sets.
pub const UNSET_TOKEN_VAR: &str = "REQUESTREPO_TEST_TOKEN_NEVER_SET";

/// Builds an unsigned JWT whose payload names `subdomain`.
#[allow(dead_code)] // Used by other test files
pub fn jwt(subdomain: &str) -> String {
    format!(
        "{}.{}.c2lnbmF0dXJl",
        URL_SAFE_NO_PAD.encode(r#"{"alg":"HS256","typ":"JWT"}"#),
        URL_SAFE_NO_PAD.encode(
            json!({"iat": 1_700_000_000u64, "exp": 1_900_000_000u64, "subdomain": subdomain})
                .to_string()
        )
    )
}

/// Client configuration pointing at a plain-HTTP service on `host:port`.
///
/// Short poll interval and retry delays keep tests fast; the capture domain
/// stays `requestrepo.com` so domains read like production ones.
#[allow(dead_code)]
pub fn config_for_address(host: &str, port: u16) -> ClientConfig {
    ClientConfig {
        token: None,
        token_env_var: UNSET_TOKEN_VAR.to_string(),
        host: host.to_string(),
        capture_domain: Some("requestrepo.com".to_string()),
        port,
        scheme: Scheme::Http,
        timeout_seconds: 5,
        poll_interval: Duration::from_millis(50),
        retry: RetryPolicy {
            base_ms: 2,
            factor: 5,
            max_delay: Duration::from_millis(50),
            max_attempts: 2,
        },
        ..Default::default()
    }
}

/// Client configuration for a wiremock server.
#[allow(dead_code)]
pub fn config_for(server: &MockServer) -> ClientConfig {
    let address = server.address();
    config_for_address(&address.ip().to_string(), address.port())
}

/// A captured HTTP request as the service stores it.
#[allow(dead_code)]
pub fn http_record(id: &str, path: &str) -> Value {
    let raw = format!("GET {} HTTP/1.1\r\nHost: abcd1234.requestrepo.com\r\n\r\n", path);
    json!({
        "_id": id,
        "type": "http",
        "raw": STANDARD.encode(raw),
        "uid": "abcd1234",
        "method": "GET",
        "path": path,
        "headers": {"Host": "abcd1234.requestrepo.com", "User-Agent": "curl/8.5.0"},
        "ip": "203.0.113.7",
        "port": 51234,
        "date": 1_700_000_100u64,
    })
}

/// A captured DNS query as the service stores it.
#[allow(dead_code)]
pub fn dns_record(id: &str, name: &str) -> Value {
    json!({
        "_id": id,
        "type": "dns",
        "raw": STANDARD.encode(b"\x12\x34\x01\x00"),
        "uid": "abcd1234",
        "name": name,
        "dtype": "A",
        "ip": "198.51.100.53",
        "date": 1_700_000_200u64,
    })
}

/// Serves a growing history: call `n` (0-based) sees the first `n + 1` records.
///
/// Consecutive polls therefore overlap, the way a real history does.
#[allow(dead_code)]
pub struct GrowingHistory {
    records: Vec<Value>,
    calls: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl GrowingHistory {
    pub fn new(records: Vec<Value>) -> (Self, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Self {
                records,
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }
}

impl Respond for GrowingHistory {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let visible = (n + 1).min(self.records.len());
        ResponseTemplate::new(200).set_body_json(&self.records[..visible])
    }
}

/// Serves an empty history until `ready_at`, then `records`.
#[allow(dead_code)]
pub struct ArrivesAt {
    ready_at: Instant,
    records: Vec<Value>,
}

#[allow(dead_code)]
impl ArrivesAt {
    pub fn new(delay: Duration, records: Vec<Value>) -> Self {
        Self {
            ready_at: Instant::now() + delay,
            records,
        }
    }
}

impl Respond for ArrivesAt {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        if Instant::now() >= self.ready_at {
            ResponseTemplate::new(200).set_body_json(&self.records)
        } else {
            ResponseTemplate::new(200).set_body_json(json!([]))
        }
    }
}

/// Answers the whoami check every configured token goes through.
#[allow(dead_code)]
pub async fn mount_whoami(server: &MockServer, subdomain: &str) {
    Mock::given(method("GET"))
        .and(path("/api/whoami"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"subdomain": subdomain})))
        .mount(server)
        .await;
}
