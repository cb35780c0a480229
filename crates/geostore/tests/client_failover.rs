//! End-to-end client tests against primary and secondary mock servers

use assert_matches::assert_matches;
use geostore::http::CLIENT_REQUEST_ID_HEADER;
use geostore::{Client, ClientConfig, Error, TransportError};
use pretty_assertions::assert_eq;
use std::time::Duration;
use wiremock::matchers::{body_bytes, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(primary: &MockServer, secondary: Option<&MockServer>) -> ClientConfig {
    let mut builder = ClientConfig::builder()
        .endpoint(format!("{}/devstoreaccount1", primary.uri()))
        .retry_delays(Duration::from_millis(10), Duration::from_millis(100))
        .token("test-token");
    if let Some(secondary) = secondary {
        builder = builder.secondary_host(format!("127.0.0.1:{}", secondary.address().port()));
    }
    builder.build().unwrap()
}

#[tokio::test]
async fn test_get_fails_over_to_secondary() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/devstoreaccount1/photos/cat.jpg"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&primary)
        .await;
    Mock::given(method("GET"))
        .and(path("/devstoreaccount1/photos/cat.jpg"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_string("meow"))
        .expect(1)
        .mount(&secondary)
        .await;

    let client = Client::new(config_for(&primary, Some(&secondary))).unwrap();
    let response = client.get("photos/cat.jpg").await.unwrap();

    assert_eq!(response.text().unwrap(), "meow");

    let first = &primary.received_requests().await.unwrap()[0];
    let second = &secondary.received_requests().await.unwrap()[0];
    assert!(first.headers.get(CLIENT_REQUEST_ID_HEADER).is_some());
    assert_eq!(
        first.headers.get(CLIENT_REQUEST_ID_HEADER),
        second.headers.get(CLIENT_REQUEST_ID_HEADER)
    );
}

#[tokio::test]
async fn test_missing_replica_falls_back_to_primary() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&primary)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("fresh"))
        .mount(&primary)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&secondary)
        .await;

    let client = Client::new(config_for(&primary, Some(&secondary))).unwrap();
    let response = client.get("container/new-blob").await.unwrap();

    assert_eq!(response.text().unwrap(), "fresh");
    assert_eq!(primary.received_requests().await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_put_retries_on_primary_with_same_body() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(body_bytes(b"payload".to_vec()))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&primary)
        .await;
    Mock::given(method("PUT"))
        .and(body_bytes(b"payload".to_vec()))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&primary)
        .await;
    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(201))
        .expect(0)
        .mount(&secondary)
        .await;

    let client = Client::new(config_for(&primary, Some(&secondary))).unwrap();
    let response = client.put("container/blob", "payload").await.unwrap();

    assert_eq!(response.status, 201);
}

#[tokio::test]
async fn test_terminal_statuses_become_errors() {
    let primary = MockServer::start().await;

    Mock::given(method("DELETE"))
        .respond_with(
            ResponseTemplate::new(403).insert_header("x-ms-error-code", "AuthorizationFailure"),
        )
        .expect(1)
        .mount(&primary)
        .await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&primary)
        .await;

    let client = Client::new(config_for(&primary, None)).unwrap();

    assert_matches!(
        client.delete("container/blob").await,
        Err(Error::PermissionDenied { status: 403, ref message }) if message == "AuthorizationFailure"
    );
    assert_matches!(client.head("container/missing").await, Err(Error::NotFound(_)));
}

#[tokio::test]
async fn test_exhausted_budget_reports_last_status() {
    let primary = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(503).insert_header("x-ms-request-id", "server-req-1"),
        )
        .expect(4)
        .mount(&primary)
        .await;

    let client = Client::new(config_for(&primary, None)).unwrap();

    assert_matches!(
        client.get("container/blob").await,
        Err(Error::Server { status: 503, request_id: Some(ref id), .. }) if id == "server-req-1"
    );
}

#[tokio::test]
async fn test_unreachable_endpoint_is_a_transport_error() {
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = ClientConfig::builder()
        .endpoint(format!("http://127.0.0.1:{}", port))
        .max_tries(2)
        .retry_delays(Duration::from_millis(10), Duration::from_millis(10))
        .build()
        .unwrap();

    let client = Client::new(config).unwrap();
    let err = client.get("container/blob").await.unwrap_err();

    assert_matches!(err, Error::Transport(ref e) if e.is_transient());
    assert!(!matches!(err, Error::Transport(TransportError::Cancelled)));
}
