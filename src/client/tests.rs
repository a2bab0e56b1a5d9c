// SPDX-License-Identifier: MIT OR Apache-2.0

use super::*;
use axum::routing::post;
use axum::{Form, Json, Router};
use std::collections::HashMap;
use tokio::net::TcpListener;

async fn mock_login(Form(form): Form<HashMap<String, String>>) -> Json<serde_json::Value> {
    if form.get("password").map(String::as_str) == Some("secret") {
        Json(serde_json::json!({
            "return": true,
            "results": "User login:admin in account:admin has been authorized successfully",
            "CID": "abc123"
        }))
    } else {
        Json(serde_json::json!({
            "return": false,
            "reason": "Invalid username or password"
        }))
    }
}

async fn spawn_mock() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().route("/v1/api", post(mock_login));
    tokio::spawn(async move { axum::serve(listener, app).await });
    addr.to_string()
}

#[test]
fn test_default_config() {
    let config = ControllerClientConfig::default();
    assert!(config.controller_ip.is_empty());
    assert_eq!(config.scheme, "https");
    assert!(config.insecure);
    assert_eq!(config.connect_timeout, Some(Duration::from_secs(10)));
    assert_eq!(config.request_timeout, None);
    assert_eq!(config.session_retry.max_attempts, 2);
    assert_eq!(config.transport_retry.max_tries, 5);
}

#[test]
fn test_config_builder() {
    let config = ControllerClientConfig::builder("10.1.0.5")
        .credentials("admin", "secret")
        .scheme("http")
        .verify_tls()
        .request_timeout(Duration::from_secs(30))
        .session_retry(SessionRetry::new(3, Duration::from_millis(10)))
        .transport_retry(TransportRetry::disabled())
        .build();

    assert_eq!(config.controller_ip, "10.1.0.5");
    assert_eq!(config.username, "admin");
    assert!(!config.insecure);
    assert_eq!(config.request_timeout, Some(Duration::from_secs(30)));
    assert_eq!(config.session_retry.max_attempts, 3);
    assert_eq!(config.transport_retry.max_tries, 1);
}

#[test]
fn test_config_debug_hides_password() {
    let config = ControllerClientConfig::builder("10.1.0.5")
        .credentials("admin", "hunter2")
        .build();
    let rendered = format!("{config:?}");
    assert!(rendered.contains("admin"));
    assert!(!rendered.contains("hunter2"));
}

#[test]
fn test_endpoints() {
    let endpoints = ControllerEndpoints::new("https", "10.1.0.5").unwrap();
    assert_eq!(endpoints.v1.as_str(), "https://10.1.0.5/v1/api");
    assert_eq!(endpoints.v2.as_str(), "https://10.1.0.5/v2/api");
    assert_eq!(endpoints.backend.as_str(), "https://10.1.0.5/v1/backend1");
    assert_eq!(
        endpoints.v25_endpoint("/app-domains/42").unwrap().as_str(),
        "https://10.1.0.5/v2.5/api/app-domains/42"
    );
}

#[test]
fn test_endpoints_require_controller_ip() {
    let err = ControllerEndpoints::new("https", " ").unwrap_err();
    assert!(matches!(err, ControllerError::Config(_)));
}

#[test]
fn test_v1_with_query() {
    let endpoints = ControllerEndpoints::new("https", "10.1.0.5").unwrap();
    let params = FormParams::action("list_accounts").with("CID", "abc");
    let url = endpoints.v1_with_query(&params);
    assert_eq!(url.as_str(), "https://10.1.0.5/v1/api?CID=abc&action=list_accounts");
}

#[test]
fn test_set_query_token_adds_missing_token() {
    let mut url = Url::parse("https://10.1.0.5/v1/api?action=list_accounts").unwrap();
    set_query_token(&mut url, "def456");
    assert_eq!(
        url.as_str(),
        "https://10.1.0.5/v1/api?action=list_accounts&CID=def456"
    );
}

#[tokio::test]
async fn test_new_client_without_ip() {
    let result = ControllerClient::new(ControllerClientConfig::default()).await;
    match result {
        Err(ControllerError::Config(msg)) => assert!(msg.contains("Controller IP")),
        other => panic!("expected Config error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_new_client_unreachable() {
    let config = ControllerClientConfig::builder("127.0.0.1:1")
        .credentials("admin", "secret")
        .scheme("http")
        .connect_timeout(Duration::from_secs(1))
        .build();

    let result = ControllerClient::new(config).await;
    assert!(matches!(result, Err(ControllerError::Transport { .. })));
}

#[tokio::test]
async fn test_login() {
    let addr = spawn_mock().await;
    let config = ControllerClientConfig::builder(addr)
        .credentials("admin", "secret")
        .scheme("http")
        .build();

    let client = ControllerClient::new(config).await.expect("login failed");
    assert_eq!(client.cid(), "abc123");
    assert_eq!(client.login_count(), 1);

    let form = client.form("list_accounts");
    assert_eq!(form.get("CID"), Some("abc123"));
    assert_eq!(form.get("action"), Some("list_accounts"));
}

#[tokio::test]
async fn test_login_rejected() {
    let addr = spawn_mock().await;
    let config = ControllerClientConfig::builder(addr)
        .credentials("admin", "wrong")
        .scheme("http")
        .build();

    match ControllerClient::new(config).await {
        Err(ControllerError::Auth(reason)) => assert_eq!(reason, "Invalid username or password"),
        other => panic!("expected Auth error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_cancelled_login() {
    let addr = spawn_mock().await;
    let config = ControllerClientConfig::builder(addr)
        .credentials("admin", "secret")
        .scheme("http")
        .build();
    let client = ControllerClient::new(config).await.unwrap();

    let token = CancellationToken::new();
    token.cancel();
    let scoped = client.with_cancellation(token);
    assert!(matches!(scoped.login().await, Err(ControllerError::Cancelled)));
    assert_eq!(client.login_count(), 1);
}
