//! Integration tests for the HTTP client session.

use std::time::Duration;

use netask_net::http::HttpClientBuilder;
use netask_net::{DataTask, Endpoint, HttpClient, Task, TransportError};
use wiremock::matchers::{header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn test_client_creation() {
    let client = HttpClient::new();
    assert!(client.config().timeout.is_some());
    assert!(client.config().cookies_enabled);
    assert_eq!(client.scratch_dir(), std::env::temp_dir());
}

#[tokio::test]
async fn test_client_builder() {
    let client = HttpClientBuilder::new()
        .timeout(Duration::from_secs(60))
        .no_cookies()
        .max_redirects(5)
        .scratch_dir("/var/tmp/netask")
        .build()
        .expect("Failed to build client");

    assert_eq!(client.config().timeout, Some(Duration::from_secs(60)));
    assert!(!client.config().cookies_enabled);
    assert_eq!(client.config().max_redirects, 5);
    assert_eq!(client.scratch_dir(), std::path::Path::new("/var/tmp/netask"));
}

#[test]
fn test_invalid_default_header() {
    let result = HttpClient::builder().default_header("bad header", "x");
    assert!(matches!(result, Err(TransportError::InvalidHeader(_))));
}

#[tokio::test]
async fn test_default_headers_and_user_agent_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("x-api-key", "secret"))
        .and(header("user-agent", "netask-tests/1.0"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = HttpClient::builder()
        .user_agent("netask-tests/1.0")
        .default_header("x-api-key", "secret")
        .unwrap()
        .build()
        .unwrap();

    DataTask::<()>::with_client(Endpoint::new(server.uri(), "/"), client)
        .execute()
        .await
        .unwrap();
}

#[tokio::test]
async fn test_timeout_is_a_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let client = HttpClient::builder()
        .timeout(Duration::from_millis(100))
        .build()
        .unwrap();
    let error = DataTask::<()>::with_client(Endpoint::new(server.uri(), "/"), client)
        .execute()
        .await
        .unwrap_err();

    assert!(matches!(error, netask_net::TaskError::Transport(TransportError::Timeout)));
}

#[test]
fn test_shared_client_is_reused() {
    let a = HttpClient::shared();
    let b = HttpClient::shared();
    assert_eq!(a.config().max_redirects, b.config().max_redirects);
}
