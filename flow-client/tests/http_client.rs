//! HTTP Client Integration Tests
//!
//! Runs the client against a mock backend:
//! - Config fetch with API key, caching and offline fallback
//! - Retry of transient failures, no retry of client errors
//! - Event batching and identify uploads

use flow_client::{
    ClientError, ConfigOrigin, OnboardingClient, RetryConfig, SdkConfig, API_KEY_HEADER,
};
use flow_core::{FlowAction, TelemetryEvent, TelemetryEventType, TelemetrySink, Viewport};
use serde_json::{json, Map, Value};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn flow_json(version: &str) -> Value {
    json!({
        "version": version,
        "screens": [
            { "id": "welcome", "type": "welcome", "content": { "useBlocks": true, "blocks": [
                { "id": "title", "type": "text", "content": { "text": "Hi" }, "position": { "x": 24, "y": 150 } }
            ] } },
            { "id": "done", "type": "celebration" }
        ]
    })
}

fn sdk(server: &MockServer) -> SdkConfig {
    SdkConfig::new("test-key")
        .with_base_url(server.uri())
        .with_retry(RetryConfig::new(3, 1, 5, 2))
}

// ============================================================================
// Config fetch
// ============================================================================

#[tokio::test]
#[cfg_attr(
    target_os = "macos",
    ignore = "wiremock/reqwest system-configuration issue on macOS"
)]
async fn test_fetch_sends_api_key_and_caches() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/flow"))
        .and(header(API_KEY_HEADER, "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(flow_json("4")))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().expect("tempdir");
    let client = OnboardingClient::new(sdk(&server).with_data_dir(dir.path())).expect("client");

    let loaded = client.load_config().await.expect("load");
    assert_eq!(loaded.origin, ConfigOrigin::Remote);
    assert_eq!(loaded.config.version, "4");
    assert_eq!(loaded.config.screens.len(), 2);

    // A fresh client over the same directory sees the cached copy offline.
    let offline = OnboardingClient::new(
        SdkConfig::new("test-key")
            .with_base_url("http://127.0.0.1:9")
            .with_data_dir(dir.path())
            .with_retry(RetryConfig::none()),
    )
    .expect("client");
    let cached = offline.load_config().await.expect("cached");
    assert_eq!(cached.origin, ConfigOrigin::Cache { stale: false });
    assert_eq!(cached.config.version, "4");
}

#[tokio::test]
#[cfg_attr(
    target_os = "macos",
    ignore = "wiremock/reqwest system-configuration issue on macOS"
)]
async fn test_server_errors_are_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/flow"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/flow"))
        .respond_with(ResponseTemplate::new(200).set_body_json(flow_json("5")))
        .expect(1)
        .mount(&server)
        .await;

    let client = OnboardingClient::new(sdk(&server)).expect("client");
    let loaded = client.load_config().await.expect("load after retries");
    assert_eq!(loaded.config.version, "5");
}

#[tokio::test]
#[cfg_attr(
    target_os = "macos",
    ignore = "wiremock/reqwest system-configuration issue on macOS"
)]
async fn test_unauthorized_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/flow"))
        .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
        .expect(1)
        .mount(&server)
        .await;

    let client = OnboardingClient::new(sdk(&server)).expect("client");
    let result = client.load_config().await;
    match result {
        Err(ClientError::Api { status, message }) => {
            assert_eq!(status, 401);
            assert_eq!(message, "bad key");
        }
        other => panic!("expected API error, got {other:?}"),
    }
}

#[tokio::test]
#[cfg_attr(
    target_os = "macos",
    ignore = "wiremock/reqwest system-configuration issue on macOS"
)]
async fn test_malformed_config_is_rejected() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/flow"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{ not json"))
        .mount(&server)
        .await;

    let client = OnboardingClient::new(sdk(&server)).expect("client");
    let result = client.load_config().await;
    assert!(matches!(result, Err(ClientError::Flow(_))));
}

// ============================================================================
// Telemetry and identity
// ============================================================================

#[tokio::test]
#[cfg_attr(
    target_os = "macos",
    ignore = "wiremock/reqwest system-configuration issue on macOS"
)]
async fn test_events_are_uploaded_in_batches() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/events"))
        .and(header(API_KEY_HEADER, "test-key"))
        .respond_with(ResponseTemplate::new(202))
        .expect(2)
        .mount(&server)
        .await;

    let client = OnboardingClient::new(sdk(&server).with_batch_size(2)).expect("client");
    let sink = client.telemetry();
    for screen in ["a", "b", "c"] {
        sink.track(TelemetryEvent::new(
            TelemetryEventType::ScreenViewed,
            Some(screen),
        ));
    }

    let report = client.flush().await.expect("flush");
    assert_eq!(report.sent, 3);
    assert_eq!(report.batches, 2);

    let requests = server.received_requests().await.expect("recording enabled");
    let first: Value = serde_json::from_slice(&requests[0].body).expect("json body");
    let events = first["events"].as_array().expect("events array");
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["eventType"], "screen_viewed");
    assert_eq!(events[0]["screenId"], "a");
    assert_eq!(events[0]["deviceId"], client.device_id().to_string());
}

#[tokio::test]
#[cfg_attr(
    target_os = "macos",
    ignore = "wiremock/reqwest system-configuration issue on macOS"
)]
async fn test_failed_upload_keeps_events_queued() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/events"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let client = OnboardingClient::new(sdk(&server)).expect("client");
    let mut controller = client.controller(
        flow_core::FlowConfig::from_json(&flow_json("6").to_string()).expect("flow"),
        Viewport::default(),
        None,
    );
    controller.handle_action(&FlowAction::Next);
    let queued = client.batcher().len();
    assert!(queued > 0);

    assert!(client.flush().await.is_err());
    assert_eq!(client.batcher().len(), queued);
}

#[tokio::test]
#[cfg_attr(
    target_os = "macos",
    ignore = "wiremock/reqwest system-configuration issue on macOS"
)]
async fn test_identify_posts_device_and_user() {
    let server = MockServer::start().await;
    let client = OnboardingClient::new(sdk(&server)).expect("client");

    Mock::given(method("POST"))
        .and(path("/v1/identify"))
        .and(body_partial_json(json!({
            "deviceId": client.device_id().to_string(),
            "userId": "user-1",
            "traits": { "plan": "pro" }
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let mut traits = Map::new();
    traits.insert("plan".into(), json!("pro"));
    client.identify("user-1", traits).await.expect("identify");
    assert_eq!(client.identity().user_id().as_deref(), Some("user-1"));
}
