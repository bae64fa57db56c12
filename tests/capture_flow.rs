//! Fetching and deleting captured requests against a mock service.

mod helpers;

use helpers::{config_for, dns_record, http_record, jwt, mount_whoami};
use requestrepo::{Error, RequestKind, Requestrepo};
use serde_json::json;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn client_with_token(server: &MockServer, token: &str) -> Requestrepo {
    mount_whoami(server, "abcd1234").await;
    let mut config = config_for(server);
    config.token = Some(token.to_string());
    Requestrepo::new(config).await.expect("client should start")
}

/// tok-123 resolves to abcd1234, lists three records in order, deletes them
/// with a single call and then sees an empty history.
#[tokio::test]
async fn test_list_delete_list_scenario() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/whoami"))
        .and(query_param("token", "tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"subdomain": "abcd1234"})))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/get_requests"))
        .and(query_param("token", "tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            http_record("r1", "/first"),
            dns_record("r2", "abcd1234.requestrepo.com."),
            http_record("r3", "/third"),
        ])))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/get_requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/delete_all_requests"))
        .and(query_param("token", "tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with_token(&server, "tok-123").await;
    assert_eq!(client.subdomain(), "abcd1234");
    assert_eq!(client.domain(), "abcd1234.requestrepo.com");

    let requests = client.get_old_requests().await.unwrap();
    let ids: Vec<&str> = requests.iter().map(|r| r.id()).collect();
    assert_eq!(ids, vec!["r1", "r2", "r3"]);
    assert_eq!(requests[0].kind(), &RequestKind::Http);
    assert_eq!(requests[0].path(), Some("/first"));
    assert!(requests[0].raw().starts_with(b"GET /first HTTP/1.1"));
    assert!(requests[1].is_dns());
    assert_eq!(requests[1].name(), Some("abcd1234.requestrepo.com."));

    client.delete_all_requests().await.unwrap();

    assert!(client.get_old_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_wrapped_listing_is_accepted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/get_requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [http_record("w1", "/a"), http_record("w2", "/b")]
        })))
        .mount(&server)
        .await;

    let client = client_with_token(&server, &jwt("abcd1234")).await;
    let ids: Vec<String> = client
        .get_old_requests()
        .await
        .unwrap()
        .iter()
        .map(|r| r.id().to_string())
        .collect();
    assert_eq!(ids, vec!["w1", "w2"]);
}

#[tokio::test]
async fn test_get_old_requests_refetches_every_call() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/get_requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([http_record("r1", "/")])))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_with_token(&server, &jwt("abcd1234")).await;
    assert_eq!(client.get_old_requests().await.unwrap().len(), 1);
    assert_eq!(client.get_old_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_delete_all_is_idempotent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/delete_all_requests"))
        .respond_with(ResponseTemplate::new(200))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/delete_all_requests"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Nothing to delete"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with_token(&server, &jwt("abcd1234")).await;
    client.delete_all_requests().await.unwrap();
    client.delete_all_requests().await.unwrap();
}

#[tokio::test]
async fn test_delete_single_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/delete_request"))
        .and(body_json(json!({"id": "r1"})))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/delete_request"))
        .and(body_json(json!({"id": "missing"})))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with_token(&server, &jwt("abcd1234")).await;
    assert!(client.delete_request("r1").await.unwrap());
    assert!(!client.delete_request("missing").await.unwrap());
    assert!(matches!(
        client.delete_request("").await,
        Err(Error::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn test_list_requests_sends_paging() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/get_requests"))
        .and(query_param("limit", "2"))
        .and(query_param("offset", "4"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            http_record("r5", "/5"),
            http_record("r6", "/6"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with_token(&server, &jwt("abcd1234")).await;
    let page = client.list_requests(Some(2), Some(4)).await.unwrap();
    assert_eq!(page.len(), 2);
    assert_eq!(page[0].id(), "r5");
}

#[tokio::test]
async fn test_listing_errors_map_to_taxonomy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/get_requests"))
        .respond_with(ResponseTemplate::new(403))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/get_requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"unexpected": true})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/get_requests"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with_token(&server, &jwt("abcd1234")).await;
    assert!(matches!(
        client.get_old_requests().await,
        Err(Error::Authentication(_))
    ));
    assert!(matches!(
        client.get_old_requests().await,
        Err(Error::MalformedResponse(_))
    ));
    // One-shot calls are not retried.
    assert!(matches!(
        client.get_old_requests().await,
        Err(Error::Network(_))
    ));
}

#[tokio::test]
async fn test_requests_serialize_back_unchanged() {
    let server = MockServer::start().await;
    let record = http_record("r1", "/echo");
    Mock::given(method("GET"))
        .and(path("/api/get_requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([record.clone()])))
        .mount(&server)
        .await;

    let client = client_with_token(&server, &jwt("abcd1234")).await;
    let requests = client.get_old_requests().await.unwrap();
    assert_eq!(serde_json::to_value(&requests[0]).unwrap(), record);
}
