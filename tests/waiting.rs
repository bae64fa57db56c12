//! Waiting for new requests by polling a mock service.
//!
//! Covers at-most-once delivery across overlapping polls, arrival ordering,
//! blocking until a request arrives, retry budgets and cancellation.

mod helpers;

use std::time::{Duration, Instant};

use helpers::{
    config_for, dns_record, http_record, jwt, mount_whoami, ArrivesAt, GrowingHistory,
};
use requestrepo::{Backlog, CancellationToken, ClientConfig, Error, NetworkError, Requestrepo};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn polling_config(server: &MockServer) -> ClientConfig {
    mount_whoami(server, "abcd1234").await;
    let mut config = config_for(server);
    config.token = Some(jwt("abcd1234"));
    config
}

/// Cancels `cancel` after `delay`.
fn cancel_after(cancel: &CancellationToken, delay: Duration) {
    let cancel = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        cancel.cancel();
    });
}

#[tokio::test]
async fn test_each_request_delivered_once_in_order() {
    let server = MockServer::start().await;
    let (history, polls) = GrowingHistory::new(vec![
        http_record("r1", "/1"),
        dns_record("r2", "x.abcd1234.requestrepo.com."),
        http_record("r3", "/3"),
    ]);
    Mock::given(method("GET"))
        .and(path("/api/get_requests"))
        .respond_with(history)
        .mount(&server)
        .await;

    let mut client = Requestrepo::new(polling_config(&server).await).await.unwrap();
    let cancel = CancellationToken::new();
    cancel_after(&cancel, Duration::from_millis(600));

    let mut delivered = Vec::new();
    client
        .await_requests(&cancel, |request| {
            delivered.push(request.id().to_string());
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(delivered, vec!["r1", "r2", "r3"]);
    // Many more polls than requests: every request was visible in several of them.
    assert!(polls.load(std::sync::atomic::Ordering::SeqCst) >= 5);
}

#[tokio::test]
async fn test_get_request_returns_earliest_unseen() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/get_requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            http_record("r1", "/1"),
            http_record("r2", "/2"),
            http_record("r3", "/3"),
        ])))
        .mount(&server)
        .await;

    let mut client = Requestrepo::new(polling_config(&server).await).await.unwrap();
    assert_eq!(client.get_request().await.unwrap().id(), "r1");
    assert_eq!(client.get_request().await.unwrap().id(), "r2");
    assert_eq!(client.get_request().await.unwrap().id(), "r3");

    // Nothing new: the next call keeps waiting.
    let waited = tokio::time::timeout(Duration::from_millis(200), client.get_request()).await;
    assert!(waited.is_err());
}

#[tokio::test]
async fn test_get_request_blocks_until_arrival() {
    let server = MockServer::start().await;
    let started = Instant::now();
    Mock::given(method("GET"))
        .and(path("/api/get_requests"))
        .respond_with(ArrivesAt::new(
            Duration::from_millis(400),
            vec![http_record("late", "/late")],
        ))
        .mount(&server)
        .await;

    let mut client = Requestrepo::new(polling_config(&server).await).await.unwrap();

    let early = tokio::time::timeout(Duration::from_millis(150), client.get_request()).await;
    assert!(early.is_err(), "returned before anything was captured");

    let request = client.get_request().await.unwrap();
    assert_eq!(request.id(), "late");
    assert!(started.elapsed() >= Duration::from_millis(400));
}

#[tokio::test]
async fn test_skip_backlog_only_delivers_new_arrivals() {
    let server = MockServer::start().await;
    let (history, _polls) = GrowingHistory::new(vec![
        http_record("old", "/old"),
        http_record("new", "/new"),
    ]);
    Mock::given(method("GET"))
        .and(path("/api/get_requests"))
        .respond_with(history)
        .mount(&server)
        .await;

    let mut config = polling_config(&server).await;
    config.backlog = Backlog::Skip;
    let mut client = Requestrepo::new(config).await.unwrap();

    assert_eq!(client.get_request().await.unwrap().id(), "new");
}

#[tokio::test]
async fn test_filtered_requests_stay_queued() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/get_requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            dns_record("d1", "abcd1234.requestrepo.com."),
            http_record("h1", "/"),
        ])))
        .mount(&server)
        .await;

    let mut client = Requestrepo::new(polling_config(&server).await).await.unwrap();
    assert_eq!(client.get_http_request().await.unwrap().id(), "h1");
    assert_eq!(client.get_dns_request().await.unwrap().id(), "d1");

    let path_filter = client
        .get_request_matching(|r| r.path() == Some("/never"));
    assert!(tokio::time::timeout(Duration::from_millis(150), path_filter)
        .await
        .is_err());
}

#[tokio::test]
async fn test_callback_error_does_not_stop_delivery() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/get_requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            http_record("r1", "/1"),
            http_record("r2", "/2"),
            http_record("r3", "/3"),
        ])))
        .mount(&server)
        .await;

    let mut client = Requestrepo::new(polling_config(&server).await).await.unwrap();
    let cancel = CancellationToken::new();
    cancel_after(&cancel, Duration::from_millis(300));

    let mut seen = Vec::new();
    client
        .await_requests(&cancel, |request| {
            seen.push(request.id().to_string());
            if request.id() == "r1" {
                anyhow::bail!("handler failed on {}", request.id());
            }
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(seen, vec!["r1", "r2", "r3"]);
}

#[tokio::test]
async fn test_callback_panic_does_not_stop_delivery() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/get_requests"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!([http_record("r1", "/1"), http_record("r2", "/2")])),
        )
        .mount(&server)
        .await;

    let mut client = Requestrepo::new(polling_config(&server).await).await.unwrap();
    let cancel = CancellationToken::new();
    cancel_after(&cancel, Duration::from_millis(300));

    let mut seen = Vec::new();
    client
        .await_requests(&cancel, |request| {
            seen.push(request.id().to_string());
            if request.id() == "r1" {
                panic!("handler blew up on {}", request.id());
            }
            Ok(())
        })
        .await
        .unwrap();

    assert_eq!(seen, vec!["r1", "r2"]);
}

#[tokio::test]
async fn test_transient_failures_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/get_requests"))
        .respond_with(ResponseTemplate::new(502))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/get_requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([http_record("r1", "/")])))
        .mount(&server)
        .await;

    let mut client = Requestrepo::new(polling_config(&server).await).await.unwrap();
    assert_eq!(client.get_request().await.unwrap().id(), "r1");
}

#[tokio::test]
async fn test_retry_budget_exhaustion_is_a_network_error() {
    let server = MockServer::start().await;
    // max_attempts = 2: the first attempt and two retries.
    Mock::given(method("GET"))
        .and(path("/api/get_requests"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&server)
        .await;

    let mut client = Requestrepo::new(polling_config(&server).await).await.unwrap();
    let err = client.get_request().await.unwrap_err();
    match err {
        Error::Network(NetworkError::Status(status)) => assert_eq!(status.as_u16(), 503),
        other => panic!("expected a network error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_authentication_failure_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/get_requests"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&server)
        .await;

    let mut client = Requestrepo::new(polling_config(&server).await).await.unwrap();
    let cancel = CancellationToken::new();
    let result = client.await_requests(&cancel, |_| Ok(())).await;
    assert!(matches!(result, Err(Error::Authentication(_))));
}

#[tokio::test]
async fn test_cancellation_interrupts_the_poll_sleep() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/get_requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let mut config = polling_config(&server).await;
    config.poll_interval = Duration::from_secs(3);
    let mut client = Requestrepo::new(config).await.unwrap();

    let cancel = CancellationToken::new();
    cancel_after(&cancel, Duration::from_millis(100));
    let started = Instant::now();
    client.await_requests(&cancel, |_| Ok(())).await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));

    let cancel = CancellationToken::new();
    cancel_after(&cancel, Duration::from_millis(100));
    let started = Instant::now();
    assert!(matches!(
        client.get_request_with_cancel(&cancel).await,
        Err(Error::Cancelled)
    ));
    assert!(started.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn test_client_cancellation_token_stops_get_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/get_requests"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let mut client = Requestrepo::new(polling_config(&server).await).await.unwrap();
    cancel_after(&client.cancellation_token(), Duration::from_millis(100));

    assert!(matches!(client.get_request().await, Err(Error::Cancelled)));
}
