// SPDX-License-Identifier: MIT OR Apache-2.0

//! The controller client.
//!
//! [`ControllerClient`] owns the HTTP connection pool and the session token.
//! Every call goes through the session-aware executor in `executor.rs`, which
//! logs in again and resends when the controller reports that the token has
//! expired.

mod async_task;
mod calls;
mod executor;
mod session;

pub use async_task::AsyncPollConfig;
pub use calls::Download;
pub use session::{is_session_expired, Authenticator, PasswordAuthenticator};

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use url::Url;

use crate::api::{FormParams, SESSION_TOKEN_FIELD};
use crate::error::{ControllerError, Result};
use crate::runtime::{LoggingConfig, RequestLogger, RequestMetrics, SessionRetry, TransportRetry};
use session::SessionState;

#[derive(Clone)]
pub struct ControllerClientConfig {
    /// Controller host or IP, optionally with a port.
    pub controller_ip: String,
    pub username: String,
    pub password: String,
    /// `https` unless talking to a plain-HTTP test double.
    pub scheme: String,
    /// If true, skips TLS verification. Controllers ship self-signed certificates.
    pub insecure: bool,
    pub connect_timeout: Option<Duration>,
    pub request_timeout: Option<Duration>,
    pub session_retry: SessionRetry,
    /// Resends of `get_api` reads whose HTTP round trip failed.
    pub transport_retry: TransportRetry,
    pub async_poll: AsyncPollConfig,
    pub logging: LoggingConfig,
}

impl Default for ControllerClientConfig {
    fn default() -> Self {
        Self {
            controller_ip: String::new(),
            username: String::new(),
            password: String::new(),
            scheme: "https".to_string(),
            insecure: true,
            connect_timeout: Some(Duration::from_secs(10)),
            request_timeout: None,
            session_retry: SessionRetry::default(),
            transport_retry: TransportRetry::default(),
            async_poll: AsyncPollConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl fmt::Debug for ControllerClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerClientConfig")
            .field("controller_ip", &self.controller_ip)
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("scheme", &self.scheme)
            .field("insecure", &self.insecure)
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("session_retry", &self.session_retry)
            .field("transport_retry", &self.transport_retry)
            .field("async_poll", &self.async_poll)
            .finish_non_exhaustive()
    }
}

impl ControllerClientConfig {
    /// Start building a configuration for the given controller host.
    #[must_use]
    pub fn builder(controller_ip: impl Into<String>) -> ControllerClientConfigBuilder {
        ControllerClientConfigBuilder {
            config: Self {
                controller_ip: controller_ip.into(),
                ..Self::default()
            },
        }
    }

    /// Resolve the API endpoints of the configured controller.
    #[allow(clippy::result_large_err)]
    pub fn endpoints(&self) -> Result<ControllerEndpoints> {
        ControllerEndpoints::new(&self.scheme, &self.controller_ip)
    }
}

/// Builder for `ControllerClientConfig`.
#[derive(Debug, Clone)]
pub struct ControllerClientConfigBuilder {
    config: ControllerClientConfig,
}

impl ControllerClientConfigBuilder {
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.config.username = username.into();
        self.config.password = password.into();
        self
    }

    #[must_use]
    pub fn scheme(mut self, scheme: impl Into<String>) -> Self {
        self.config.scheme = scheme.into();
        self
    }

    /// Verify the controller certificate against the system roots.
    #[must_use]
    pub fn verify_tls(mut self) -> Self {
        self.config.insecure = false;
        self
    }

    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn session_retry(mut self, retry: SessionRetry) -> Self {
        self.config.session_retry = retry;
        self
    }

    #[must_use]
    pub fn transport_retry(mut self, retry: TransportRetry) -> Self {
        self.config.transport_retry = retry;
        self
    }

    #[must_use]
    pub fn async_poll(mut self, poll: AsyncPollConfig) -> Self {
        self.config.async_poll = poll;
        self
    }

    #[must_use]
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.config.logging = logging;
        self
    }

    #[must_use]
    pub fn build(self) -> ControllerClientConfig {
        self.config
    }
}

/// URLs of the controller API surfaces.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerEndpoints {
    /// Form/query surface, also used for `login`.
    pub v1: Url,
    /// JSON-body surface.
    pub v2: Url,
    /// Base of the REST surface; endpoints are joined onto it.
    pub v25: Url,
    /// Task-status polling for asynchronous actions.
    pub backend: Url,
}

impl ControllerEndpoints {
    #[allow(clippy::result_large_err)]
    pub fn new(scheme: &str, controller_ip: &str) -> Result<Self> {
        if controller_ip.trim().is_empty() {
            return Err(ControllerError::Config(
                "Controller IP is not set".to_string(),
            ));
        }
        let parse = |path: &str| {
            Url::parse(&format!("{scheme}://{controller_ip}{path}"))
                .map_err(|e| ControllerError::Config(format!("Invalid controller URL: {e}")))
        };
        Ok(Self {
            v1: parse("/v1/api")?,
            v2: parse("/v2/api")?,
            v25: parse("/v2.5/api/")?,
            backend: parse("/v1/backend1")?,
        })
    }

    /// URL of a v2.5 REST endpoint such as `app-domains/123`.
    #[allow(clippy::result_large_err)]
    pub fn v25_endpoint(&self, endpoint: &str) -> Result<Url> {
        self.v25
            .join(endpoint.trim_start_matches('/'))
            .map_err(|e| ControllerError::Validation(format!("Invalid endpoint {endpoint}: {e}")))
    }

    /// The v1 URL with `params` in the query string.
    #[must_use]
    pub fn v1_with_query(&self, params: &FormParams) -> Url {
        let mut url = self.v1.clone();
        url.query_pairs_mut().extend_pairs(params.iter());
        url
    }
}

/// Replace the session token in a URL query, adding it when absent.
pub(crate) fn set_query_token(url: &mut Url, cid: &str) {
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != SESSION_TOKEN_FIELD)
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(pairs)
        .append_pair(SESSION_TOKEN_FIELD, cid);
}

pub(crate) struct ClientInner {
    pub(crate) config: ControllerClientConfig,
    pub(crate) endpoints: ControllerEndpoints,
    pub(crate) http: reqwest::Client,
    pub(crate) session: SessionState,
    pub(crate) authenticator: Arc<dyn Authenticator>,
    pub(crate) logger: RequestLogger,
}

/// Client for a single controller.
///
/// Cloning is cheap; clones share the connection pool and the session.
#[derive(Clone)]
pub struct ControllerClient {
    pub(crate) inner: Arc<ClientInner>,
    pub(crate) cancel: CancellationToken,
}

impl fmt::Debug for ControllerClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerClient")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

impl ControllerClient {
    /// Connect and log in with the configured username and password.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use aviatrix_api_rs::{ControllerClient, ControllerClientConfig};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let client = ControllerClient::new(
    ///     ControllerClientConfig::builder("10.1.0.5")
    ///         .credentials("admin", "secret")
    ///         .build(),
    /// )
    /// .await?;
    /// println!("session: {}", client.cid());
    /// # Ok(())
    /// # }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the login is rejected.
    pub async fn new(config: ControllerClientConfig) -> Result<Self> {
        let authenticator = PasswordAuthenticator::new(&config.username, &config.password);
        Self::with_authenticator(config, Arc::new(authenticator)).await
    }

    /// Connect using a custom login collaborator.
    pub async fn with_authenticator(
        config: ControllerClientConfig,
        authenticator: Arc<dyn Authenticator>,
    ) -> Result<Self> {
        let client = Self::unauthenticated(config, authenticator)?;
        client.login().await?;
        Ok(client)
    }

    #[allow(clippy::result_large_err)]
    fn unauthenticated(
        config: ControllerClientConfig,
        authenticator: Arc<dyn Authenticator>,
    ) -> Result<Self> {
        let endpoints = config.endpoints()?;

        let mut builder = reqwest::Client::builder().danger_accept_invalid_certs(config.insecure);
        if let Some(timeout) = config.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }
        if let Some(timeout) = config.request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| ControllerError::Config(format!("Failed to build HTTP client: {e}")))?;

        let logger = RequestLogger::with_config(config.logging.clone());

        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                endpoints,
                http,
                session: SessionState::new(),
                authenticator,
                logger,
            }),
            cancel: CancellationToken::new(),
        })
    }

    /// Log in unconditionally and store the new session token.
    pub async fn login(&self) -> Result<()> {
        let inner = &self.inner;
        tokio::select! {
            _ = self.cancel.cancelled() => Err(ControllerError::Cancelled),
            res = inner.session.login(inner.authenticator.as_ref(), &inner.http, &inner.endpoints) => res.map(|_| ()),
        }
    }

    /// The current session token.
    #[must_use]
    pub fn cid(&self) -> String {
        self.inner.session.cid()
    }

    /// Number of successful logins performed by this client and its clones.
    #[must_use]
    pub fn login_count(&self) -> u64 {
        self.inner.session.login_count()
    }

    #[must_use]
    pub fn endpoints(&self) -> &ControllerEndpoints {
        &self.inner.endpoints
    }

    #[must_use]
    pub fn config(&self) -> &ControllerClientConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn metrics(&self) -> &RequestMetrics {
        self.inner.logger.metrics()
    }

    /// A clone whose calls are aborted when `token` is cancelled.
    ///
    /// The clone shares the session with `self`; only cancellation is scoped.
    #[must_use]
    pub fn with_cancellation(&self, token: CancellationToken) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            cancel: token,
        }
    }

    /// The token that cancels calls made through this handle.
    #[must_use]
    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Form parameters for `action`, stamped with the current session token.
    #[must_use]
    pub fn form(&self, action: &str) -> FormParams {
        FormParams::action(action).with(SESSION_TOKEN_FIELD, self.cid())
    }
}

#[cfg(test)]
mod tests;
