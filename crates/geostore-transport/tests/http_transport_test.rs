//! Integration tests for the HTTP transport and retry policy against live mock servers
//!
//! Each test starts a primary and, where needed, a secondary `wiremock` server
//! and points the secondary host at the second server's port.

use bytes::Bytes;
use geostore_core::retry::RetryOptions;
use geostore_transport::{HttpRequest, HttpTransport, RetryPolicy, Transport, TransportError};
use http::Method;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const BLOB_PATH: &str = "/container/blob.txt";

fn secondary_host(server: &MockServer) -> String {
    format!("127.0.0.1:{}", server.address().port())
}

fn fast_options() -> geostore_core::retry::RetryOptionsBuilder {
    RetryOptions::builder()
        .retry_delay(Duration::from_millis(10))
        .max_retry_delay(Duration::from_millis(100))
}

fn blob_request(server: &MockServer, verb: Method) -> HttpRequest {
    HttpRequest::parse(verb, &format!("{}{}", server.uri(), BLOB_PATH)).unwrap()
}

#[tokio::test]
async fn test_http_transport_single_exchange() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(BLOB_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("x-ms-blob-type", "BlockBlob")
                .set_body_string("hello"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new().unwrap();
    let response = transport
        .send(blob_request(&server, Method::GET))
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.get_header("x-ms-blob-type"), Some("BlockBlob"));
    assert_eq!(response.text().unwrap(), "hello");
}

#[tokio::test]
async fn test_http_transport_returns_error_statuses() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let transport = HttpTransport::new().unwrap();
    let response = transport
        .send(blob_request(&server, Method::GET))
        .await
        .unwrap();

    assert_eq!(response.status, 503);
    assert!(response.is_error());
}

#[tokio::test]
async fn test_http_transport_connection_refused() {
    // bind then drop to get a port with nothing listening
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };

    let transport = HttpTransport::new().unwrap();
    let request =
        HttpRequest::parse(Method::GET, &format!("http://127.0.0.1:{}/c/b", port)).unwrap();
    let err = transport.send(request).await.unwrap_err();

    assert!(err.is_transient(), "expected transient error, got {:?}", err);
}

#[tokio::test]
async fn test_retry_recovers_from_server_busy() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(BLOB_PATH))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(3)
        .with_priority(1)
        .expect(3)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(BLOB_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("data"))
        .expect(1)
        .mount(&server)
        .await;

    let policy = RetryPolicy::new(
        HttpTransport::new().unwrap(),
        fast_options().max_tries(4).build().unwrap(),
    );
    let response = policy
        .send(blob_request(&server, Method::GET))
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.text().unwrap(), "data");
}

#[tokio::test]
async fn test_secondary_404_fails_back_to_primary() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(BLOB_PATH))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&primary)
        .await;
    Mock::given(method("GET"))
        .and(path(BLOB_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("replicated"))
        .expect(1)
        .mount(&primary)
        .await;
    Mock::given(method("GET"))
        .and(path(BLOB_PATH))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&secondary)
        .await;

    let options = fast_options()
        .max_tries(4)
        .secondary_host(secondary_host(&secondary))
        .build()
        .unwrap();
    let policy = RetryPolicy::new(HttpTransport::new().unwrap(), options);

    let response = policy
        .send(blob_request(&primary, Method::GET))
        .await
        .unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.text().unwrap(), "replicated");
}

#[tokio::test]
async fn test_secondary_serves_read_when_primary_down() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;

    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&primary)
        .await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&secondary)
        .await;

    let options = fast_options()
        .max_tries(4)
        .secondary_host(secondary_host(&secondary))
        .build()
        .unwrap();
    let policy = RetryPolicy::new(HttpTransport::new().unwrap(), options);

    let response = policy
        .send(blob_request(&primary, Method::HEAD))
        .await
        .unwrap();

    assert_eq!(response.status, 200);
}

#[tokio::test]
async fn test_write_replays_identical_body_on_primary_only() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .with_priority(1)
        .mount(&primary)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(201))
        .mount(&primary)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&secondary)
        .await;

    let options = fast_options()
        .max_tries(4)
        .secondary_host(secondary_host(&secondary))
        .build()
        .unwrap();
    let policy = RetryPolicy::new(HttpTransport::new().unwrap(), options);

    let body = Bytes::from_static(b"block-0001:0123456789");
    let request = blob_request(&primary, Method::PUT)
        .with_header("x-ms-blob-type", "BlockBlob")
        .with_body(body.clone());
    let response = policy.send(request).await.unwrap();

    assert_eq!(response.status, 201);

    let received = primary.received_requests().await.unwrap();
    assert_eq!(received.len(), 3);
    for request in &received {
        assert_eq!(request.body, body.to_vec());
    }
}

#[tokio::test]
async fn test_forbidden_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .expect(1)
        .mount(&server)
        .await;

    let policy = RetryPolicy::new(
        HttpTransport::new().unwrap(),
        fast_options().max_tries(4).build().unwrap(),
    );
    let response = policy
        .send(blob_request(&server, Method::GET))
        .await
        .unwrap();

    assert_eq!(response.status, 403);
}

#[tokio::test]
async fn test_slow_attempt_hits_try_timeout_then_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("fast"))
        .mount(&server)
        .await;

    let options = fast_options()
        .max_tries(2)
        .try_timeout(Duration::from_secs(1))
        .build()
        .unwrap();
    let policy = RetryPolicy::new(HttpTransport::new().unwrap(), options);

    let response = policy
        .send(blob_request(&server, Method::GET))
        .await
        .unwrap();

    assert_eq!(response.text().unwrap(), "fast");
}

#[tokio::test]
async fn test_budget_exhaustion_returns_last_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("server busy"))
        .expect(3)
        .mount(&server)
        .await;

    let policy = RetryPolicy::new(
        HttpTransport::new().unwrap(),
        fast_options().max_tries(3).build().unwrap(),
    );
    let response = policy
        .send(blob_request(&server, Method::GET))
        .await
        .unwrap();

    assert_eq!(response.status, 503);
    assert_eq!(response.text().unwrap(), "server busy");
}

#[tokio::test]
async fn test_cancellation_stops_retries() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let options = RetryOptions::builder()
        .max_tries(10)
        .retry_delay(Duration::from_secs(5))
        .max_retry_delay(Duration::from_secs(60))
        .build()
        .unwrap();
    let policy = RetryPolicy::new(HttpTransport::new().unwrap(), options);

    let err = policy
        .send_with_cancel(
            blob_request(&server, Method::GET),
            tokio::time::sleep(Duration::from_millis(500)),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, TransportError::Cancelled));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}
