//! Control-plane HTTP adapter tests

use std::time::Duration;

use secrecy::SecretString;
use serde_json::json;
use tokio_test::{assert_err, assert_ok};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use deploywatch::errors::{MonitorError, PollError};
use deploywatch::http::client::HttpClient;
use deploywatch::models::deployment::DeploymentStatus;
use deploywatch::monitor::control_plane::ControlPlane;

fn client(server: &MockServer) -> HttpClient {
    HttpClient::new(
        &format!("{}/api/v1/", server.uri()),
        Some(SecretString::from("test-token".to_string())),
        Duration::from_secs(5),
    )
    .unwrap()
}

#[tokio::test]
async fn test_trigger_returns_operation_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/deploy"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_json(json!({"uuid": "app-1", "force": true})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "deployments": [{
                "message": "Application app-1 deployment queued.",
                "resource_uuid": "app-1",
                "deployment_uuid": "dep-42"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let receipt = assert_ok!(client(&server).trigger("app-1", true).await);
    assert_eq!(receipt.operation_id, "dep-42");
    assert_eq!(receipt.status, None);
}

#[tokio::test]
async fn test_trigger_without_operation_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/deploy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"deployments": []})))
        .mount(&server)
        .await;

    let result = client(&server).trigger("app-1", false).await;
    assert!(matches!(result, Err(MonitorError::MissingOperationId)));
}

#[tokio::test]
async fn test_trigger_with_unreadable_operation_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/deploy"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"deployment_uuid": 42})))
        .mount(&server)
        .await;

    let result = client(&server).trigger("app-1", false).await;
    assert!(matches!(result, Err(MonitorError::MissingOperationId)));
}

#[tokio::test]
async fn test_trigger_with_non_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/deploy"))
        .respond_with(ResponseTemplate::new(200).set_body_string("queued"))
        .mount(&server)
        .await;

    let result = client(&server).trigger("app-1", false).await;
    assert!(matches!(result, Err(MonitorError::MissingOperationId)));
}

#[tokio::test]
async fn test_trigger_http_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/deploy"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such application"))
        .mount(&server)
        .await;

    let result = client(&server).trigger("app-1", false).await;
    match result {
        Err(MonitorError::TriggerFailed(message)) => {
            assert!(message.contains("404"));
            assert!(message.contains("no such application"));
        }
        other => panic!("expected TriggerFailed, got {:?}", other),
    }
}

#[tokio::test]
async fn test_fetch_status_maps_vocabulary() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/deployments/dep-42"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "in_progress",
            "started_at": "2025-01-01T10:00:00Z",
            "commit": "abc123",
        })))
        .mount(&server)
        .await;

    let remote = assert_ok!(client(&server).fetch_status("dep-42").await);
    assert_eq!(remote.status, DeploymentStatus::Running);
    assert!(remote.started_at.is_some());
    assert_eq!(remote.finished_at, None);
    assert_eq!(remote.details["commit"], "abc123");
}

#[tokio::test]
async fn test_fetch_status_server_error_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/deployments/dep-42"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let result = client(&server).fetch_status("dep-42").await;
    assert!(matches!(result, Err(PollError::Transient(_))));
}

#[tokio::test]
async fn test_fetch_status_unreachable_is_transient() {
    let client = HttpClient::new("http://127.0.0.1:1/api/v1", None, Duration::from_secs(1)).unwrap();
    let result = client.fetch_status("dep-42").await;
    assert!(assert_err!(result).is_transient());
}

#[tokio::test]
async fn test_fetch_status_malformed_body_is_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/deployments/dep-42"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v1/deployments/dep-43"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "exploded"})))
        .mount(&server)
        .await;

    let client = client(&server);
    assert!(matches!(
        client.fetch_status("dep-42").await,
        Err(PollError::Fatal(_))
    ));
    assert!(matches!(
        client.fetch_status("dep-43").await,
        Err(PollError::Fatal(_))
    ));
}
