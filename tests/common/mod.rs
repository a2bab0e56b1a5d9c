// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted controller double for the integration tests.
//!
//! One fallback handler serves every surface: `/v1/api` (form, query and
//! multipart), `/v2/api` (JSON), `/v1/backend1` (task polling) and
//! `/v2.5/api/...` (REST with an `Authorization: cid <token>` header).
//! Logins hand out `cid-1`, `cid-2`, ... and only the newest token is valid.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use aviatrix_api_rs::client::AsyncPollConfig;
use aviatrix_api_rs::runtime::SessionRetry;
use aviatrix_api_rs::{ControllerClient, ControllerClientConfig};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

pub const PASSWORD: &str = "secret";

/// A canned reply for one action or endpoint.
#[derive(Debug, Clone)]
pub enum Canned {
    Json(Value),
    Status(StatusCode, Value),
    File(&'static str, Vec<u8>),
}

/// A request the double accepted (logins excluded).
#[derive(Debug, Clone)]
pub struct Seen {
    pub method: String,
    pub path: String,
    pub action: String,
    pub cid: String,
    pub params: BTreeMap<String, String>,
}

#[derive(Default)]
pub struct MockState {
    logins: AtomicU64,
    valid_cid: Mutex<String>,
    always_expired: AtomicBool,
    legacy_expiry: AtomicBool,
    replies: Mutex<HashMap<String, Canned>>,
    seen: Mutex<Vec<Seen>>,
    polls: AtomicU32,
    polls_until_done: AtomicU32,
    task_outcome: Mutex<(bool, String)>,
    login_delay_ms: AtomicU64,
}

impl MockState {
    pub fn logins(&self) -> u64 {
        self.logins.load(Ordering::SeqCst)
    }

    pub fn valid_cid(&self) -> String {
        self.valid_cid.lock().unwrap().clone()
    }

    /// Make the token the client holds stale.
    pub fn invalidate(&self) {
        *self.valid_cid.lock().unwrap() = "revoked".to_string();
    }

    /// Every request reports an expired session, even with a fresh token.
    pub fn expire_always(&self) {
        self.always_expired.store(true, Ordering::SeqCst);
    }

    /// Use the older "CID is invalid" phrasing for expiry replies.
    pub fn use_legacy_expiry(&self) {
        self.legacy_expiry.store(true, Ordering::SeqCst);
    }

    pub fn slow_logins(&self, delay: Duration) {
        self.login_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn reply(&self, key: &str, canned: Canned) {
        self.replies.lock().unwrap().insert(key.to_string(), canned);
    }

    pub fn task(&self, polls_until_done: u32, status: bool, result: &str) {
        self.polls_until_done
            .store(polls_until_done, Ordering::SeqCst);
        *self.task_outcome.lock().unwrap() = (status, result.to_string());
    }

    pub fn polls(&self) -> u32 {
        self.polls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }

    pub fn seen_for(&self, action: &str) -> Vec<Seen> {
        self.seen()
            .into_iter()
            .filter(|s| s.action == action)
            .collect()
    }

    fn is_expired(&self, cid: &str) -> bool {
        self.always_expired.load(Ordering::SeqCst) || cid != self.valid_cid()
    }

    fn expiry_reason(&self, cid: &str) -> String {
        if self.legacy_expiry.load(Ordering::SeqCst) || cid.is_empty() {
            "CID is invalid or expired.".to_string()
        } else {
            format!("Session {cid} expired. Please login again.")
        }
    }

    fn canned(&self, key: &str) -> Option<Canned> {
        self.replies.lock().unwrap().get(key).cloned()
    }

    fn record(&self, method: &Method, path: &str, action: &str, cid: &str, params: BTreeMap<String, String>) {
        self.seen.lock().unwrap().push(Seen {
            method: method.to_string(),
            path: path.to_string(),
            action: action.to_string(),
            cid: cid.to_string(),
            params,
        });
    }
}

pub struct MockController {
    pub addr: String,
    pub state: Arc<MockState>,
}

impl MockController {
    pub async fn start() -> Self {
        let state = Arc::new(MockState::default());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        let app = Router::new().fallback(handle).with_state(Arc::clone(&state));
        tokio::spawn(async move { axum::serve(listener, app).await });
        Self { addr, state }
    }

    pub fn config(&self) -> ControllerClientConfig {
        ControllerClientConfig::builder(&self.addr)
            .credentials("admin", PASSWORD)
            .scheme("http")
            .session_retry(SessionRetry::new(2, Duration::from_millis(5)))
            .async_poll(AsyncPollConfig::new(Duration::from_millis(5), 5))
            .build()
    }

    pub async fn client(&self) -> ControllerClient {
        ControllerClient::new(self.config()).await.unwrap()
    }
}

fn form_fields(raw: &[u8]) -> BTreeMap<String, String> {
    url::form_urlencoded::parse(raw).into_owned().collect()
}

fn json_fields(raw: &[u8]) -> BTreeMap<String, String> {
    match serde_json::from_slice::<Value>(raw) {
        Ok(Value::Object(map)) => map
            .into_iter()
            .map(|(k, v)| match v {
                Value::String(s) => (k, s),
                other => (k, other.to_string()),
            })
            .collect(),
        _ => BTreeMap::new(),
    }
}

fn multipart_fields(raw: &[u8]) -> BTreeMap<String, String> {
    let body = String::from_utf8_lossy(raw)
        .replace("content-disposition: form-data; ", "Content-Disposition: form-data; ");
    let mut fields = BTreeMap::new();
    for part in body.split("Content-Disposition: form-data; ").skip(1) {
        let Some(rest) = part.strip_prefix("name=\"") else {
            continue;
        };
        let Some((name, rest)) = rest.split_once('"') else {
            continue;
        };
        let Some((_, value)) = rest.split_once("\r\n\r\n") else {
            continue;
        };
        let value = value.split("\r\n--").next().unwrap_or_default();
        fields.insert(name.to_string(), value.to_string());
    }
    fields
}

fn body_fields(headers: &HeaderMap, uri: &Uri, body: &[u8]) -> BTreeMap<String, String> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let mut fields = uri
        .query()
        .map(|q| form_fields(q.as_bytes()))
        .unwrap_or_default();
    if content_type.starts_with("multipart/form-data") {
        fields.extend(multipart_fields(body));
    } else if content_type.contains("json") {
        fields.extend(json_fields(body));
    } else if !body.is_empty() {
        fields.extend(form_fields(body));
    }
    fields
}

fn render(canned: Canned) -> Response {
    match canned {
        Canned::Json(value) => Json(value).into_response(),
        Canned::Status(status, value) => (status, Json(value)).into_response(),
        Canned::File(content_type, bytes) => {
            ([(CONTENT_TYPE, content_type)], bytes).into_response()
        }
    }
}

async fn handle(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = uri.path().to_string();
    if let Some(endpoint) = path.strip_prefix("/v2.5/api/") {
        return handle_rest(&state, &method, endpoint, &headers, &body);
    }

    let params = body_fields(&headers, &uri, &body);
    let action = params.get("action").cloned().unwrap_or_default();
    if action == "login" {
        return login(&state, &params).await;
    }

    let cid = params.get("CID").cloned().unwrap_or_default();
    state.record(&method, &path, &action, &cid, params);
    if state.is_expired(&cid) {
        return Json(json!({"return": false, "reason": state.expiry_reason(&cid)})).into_response();
    }

    if path == "/v1/backend1" && action == "check_task_status" {
        let polls = state.polls.fetch_add(1, Ordering::SeqCst) + 1;
        if polls >= state.polls_until_done.load(Ordering::SeqCst) {
            let (status, result) = state.task_outcome.lock().unwrap().clone();
            return Json(json!({"pos": polls, "done": true, "status": status, "result": result}))
                .into_response();
        }
        return Json(json!({"pos": polls, "done": false})).into_response();
    }

    match state.canned(&action) {
        Some(canned) => render(canned),
        None => Json(json!({"return": true, "results": "ok"})).into_response(),
    }
}

async fn login(state: &MockState, params: &BTreeMap<String, String>) -> Response {
    let delay = state.login_delay_ms.load(Ordering::SeqCst);
    if delay > 0 {
        tokio::time::sleep(Duration::from_millis(delay)).await;
    }
    if params.get("password").map(String::as_str) != Some(PASSWORD) {
        return Json(json!({"return": false, "reason": "Invalid username or password"}))
            .into_response();
    }
    let n = state.logins.fetch_add(1, Ordering::SeqCst) + 1;
    let cid = format!("cid-{n}");
    *state.valid_cid.lock().unwrap() = cid.clone();
    Json(json!({"return": true, "results": "authorized", "CID": cid})).into_response()
}

fn handle_rest(
    state: &MockState,
    method: &Method,
    endpoint: &str,
    headers: &HeaderMap,
    body: &[u8],
) -> Response {
    let cid = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("cid "))
        .unwrap_or_default()
        .to_string();
    state.record(method, &format!("/v2.5/api/{endpoint}"), endpoint, &cid, json_fields(body));
    if state.is_expired(&cid) {
        return (
            StatusCode::FORBIDDEN,
            Json(json!({"message": "Invalid CID, please login again"})),
        )
            .into_response();
    }

    match state.canned(&format!("{method} {endpoint}")) {
        Some(canned) => render(canned),
        None if *method == Method::DELETE => StatusCode::NO_CONTENT.into_response(),
        None => Json(json!({})).into_response(),
    }
}
