//! Shared test harness: router wired to a fake node and mock upstream
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::Request;
use axum::response::Response;

use mdk_core::{FakeNodeFactory, MemoryPaymentStateStore};
use mdk_payments::{CheckoutUrls, MockMdkApi, RelayConfig, WebhookRelay, WEBHOOK_SECRET_HEADER};
use mdk_server::router;
use mdk_server::state::AppState;

pub const SECRET: &str = "mdk_test_secret";

pub struct TestApp {
    pub app: axum::Router,
    pub nodes: FakeNodeFactory,
    pub store: Arc<MemoryPaymentStateStore>,
    pub upstream: MockMdkApi,
}

pub fn test_app_with_secret(secret: Option<&str>) -> TestApp {
    let nodes = FakeNodeFactory::new();
    let store = Arc::new(MemoryPaymentStateStore::new());
    let upstream = MockMdkApi::new();

    // Millisecond-scale backoff keeps exhaustion tests fast
    let config = RelayConfig {
        max_attempts: 3,
        retry_delays: vec![Duration::from_millis(1); 3],
        ..RelayConfig::default()
    };

    let relay = WebhookRelay::new(
        secret.map(str::to_string),
        config,
        Arc::new(nodes.clone()),
        store.clone(),
        Arc::new(upstream.clone()),
    );

    let state = AppState {
        relay: Arc::new(relay),
        upstream: Arc::new(upstream.clone()),
        urls: CheckoutUrls::default(),
    };

    TestApp {
        app: router(state),
        nodes,
        store,
        upstream,
    }
}

pub fn test_app() -> TestApp {
    test_app_with_secret(Some(SECRET))
}

pub fn webhook_request(secret: Option<&str>, body: &serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/mdk")
        .header("content-type", "application/json");
    if let Some(value) = secret {
        builder = builder.header(WEBHOOK_SECRET_HEADER, value);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn json_request(uri: &str, body: &serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn body_text(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}
