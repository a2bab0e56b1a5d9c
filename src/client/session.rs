// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session token ownership and re-authentication.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, trace};

use crate::api::{FormParams, LoginResponse};
use crate::client::ControllerEndpoints;
use crate::error::{ControllerError, Result};

/// Reasons the controller uses for a stale token, besides `Session <cid> expired`.
const LEGACY_EXPIRY_MARKERS: [&str; 2] = ["CID is invalid", "Invalid session. Please login again."];

/// Whether `reason` reports that the session `cid` is no longer valid.
///
/// ```
/// use aviatrix_api_rs::client::is_session_expired;
///
/// assert!(is_session_expired("Session abc123 expired", "abc123"));
/// assert!(!is_session_expired("Session abc123 expired", "def456"));
/// assert!(!is_session_expired("Gateway gw1 does not exist", "abc123"));
/// ```
#[must_use]
pub fn is_session_expired(reason: &str, cid: &str) -> bool {
    let pattern = format!("session {} expired", cid.to_ascii_lowercase());
    reason.to_ascii_lowercase().contains(&pattern)
        || LEGACY_EXPIRY_MARKERS.iter().any(|m| reason.contains(m))
}

/// Obtains a fresh session token from the controller.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn login(&self, http: &reqwest::Client, endpoints: &ControllerEndpoints)
        -> Result<String>;
}

/// Username/password login through the `login` action.
#[derive(Clone)]
pub struct PasswordAuthenticator {
    username: String,
    password: String,
}

impl PasswordAuthenticator {
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for PasswordAuthenticator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordAuthenticator")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Authenticator for PasswordAuthenticator {
    async fn login(
        &self,
        http: &reqwest::Client,
        endpoints: &ControllerEndpoints,
    ) -> Result<String> {
        let form = FormParams::action("login")
            .with("username", &self.username)
            .with("password", &self.password);

        info!(target: "aviatrix_api::http", username = %self.username, "logging in to controller");

        let body = http
            .post(endpoints.v1.clone())
            .form(&form)
            .send()
            .await
            .map_err(|e| ControllerError::transport("POST login", e))?
            .text()
            .await
            .map_err(|e| ControllerError::transport("POST login", e))?;

        let data: LoginResponse =
            serde_json::from_str(&body).map_err(|e| ControllerError::decode("login", &e, &body))?;
        if !data.ret {
            return Err(ControllerError::Auth(data.reason));
        }
        if data.cid.is_empty() {
            return Err(ControllerError::Auth(
                "controller returned an empty CID".to_string(),
            ));
        }
        trace!(target: "aviatrix_api::http", "CID is '{}'", data.cid);
        Ok(data.cid)
    }
}

/// The session token shared by a client and all of its clones.
///
/// Logins are serialised: a caller that finds the token already replaced
/// since its failed attempt takes the new token instead of logging in again.
pub(crate) struct SessionState {
    cid: RwLock<String>,
    login_lock: Mutex<()>,
    logins: AtomicU64,
}

impl SessionState {
    pub(crate) fn new() -> Self {
        Self {
            cid: RwLock::new(String::new()),
            login_lock: Mutex::new(()),
            logins: AtomicU64::new(0),
        }
    }

    pub(crate) fn cid(&self) -> String {
        self.cid
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_cid(&self, cid: String) {
        *self.cid.write().unwrap_or_else(PoisonError::into_inner) = cid;
    }

    pub(crate) fn login_count(&self) -> u64 {
        self.logins.load(Ordering::Relaxed)
    }

    /// Log in unconditionally.
    pub(crate) async fn login(
        &self,
        authenticator: &dyn Authenticator,
        http: &reqwest::Client,
        endpoints: &ControllerEndpoints,
    ) -> Result<String> {
        let _guard = self.login_lock.lock().await;
        self.login_locked(authenticator, http, endpoints).await
    }

    /// Replace `stale` with a fresh token, logging in at most once per stale token.
    pub(crate) async fn renew(
        &self,
        stale: &str,
        authenticator: &dyn Authenticator,
        http: &reqwest::Client,
        endpoints: &ControllerEndpoints,
    ) -> Result<String> {
        let _guard = self.login_lock.lock().await;
        let current = self.cid();
        if current != stale {
            debug!(target: "aviatrix_api::http", "session already renewed by a concurrent call");
            return Ok(current);
        }
        self.login_locked(authenticator, http, endpoints).await
    }

    async fn login_locked(
        &self,
        authenticator: &dyn Authenticator,
        http: &reqwest::Client,
        endpoints: &ControllerEndpoints,
    ) -> Result<String> {
        let cid = authenticator.login(http, endpoints).await?;
        self.set_cid(cid.clone());
        self.logins.fetch_add(1, Ordering::Relaxed);
        Ok(cid)
    }
}
