// SPDX-License-Identifier: MIT OR Apache-2.0

//! Structured logging of controller requests.
//!
//! Every logical call (one action, all of its session retries) is logged once
//! when it finishes, under the `aviatrix_api::http` target. Outgoing bodies are
//! traced only when `log_bodies` is set and TRACE is enabled for that target.
//!
//! Request bodies carry the session token and, for `login`, the password.
//! [`LoggingConfig::redact_form`] and [`LoggingConfig::redact_json`] mask
//! those fields before anything reaches a subscriber.
//!
//! # Example
//!
//! ```
//! use aviatrix_api_rs::runtime::{LoggingConfig, RequestLogger};
//!
//! let logger = RequestLogger::with_config(LoggingConfig::default());
//! let span = logger.start("list_accounts");
//! logger.finish_success(span);
//! assert_eq!(logger.metrics().snapshot().calls, 1);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::Level;

const TARGET: &str = "aviatrix_api::http";
const MASK: &str = "[REDACTED]";

/// Fields that hold a session token or a credential.
const SENSITIVE_FIELDS: &[&str] = &[
    "CID",
    "password",
    "aws_secret_key",
    "aws_gateway_role_app",
    "arm_application_client_secret",
    "gcloud_project_credentials_contents",
    "oci_api_private_key",
    "private_key",
];

/// How requests are logged.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Level of the line logged for a completed call, `None` to skip it.
    pub success_level: Option<Level>,
    /// Level of the line logged for a failed call, `None` to skip it.
    pub failure_level: Option<Level>,
    /// Trace outgoing bodies.
    pub log_bodies: bool,
    /// Mask the values of [`sensitive_fields`](Self::sensitive_fields).
    pub redact: bool,
    /// Matched case-insensitively against form keys and JSON object keys.
    pub sensitive_fields: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            success_level: Some(Level::DEBUG),
            failure_level: Some(Level::WARN),
            log_bodies: true,
            redact: true,
            sensitive_fields: SENSITIVE_FIELDS.iter().map(|f| (*f).to_string()).collect(),
        }
    }
}

impl LoggingConfig {
    /// Only failures, no bodies.
    #[must_use]
    pub fn quiet() -> Self {
        Self {
            success_level: None,
            log_bodies: false,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_success_level(mut self, level: Option<Level>) -> Self {
        self.success_level = level;
        self
    }

    #[must_use]
    pub fn with_failure_level(mut self, level: Option<Level>) -> Self {
        self.failure_level = level;
        self
    }

    #[must_use]
    pub fn with_bodies(mut self, enabled: bool) -> Self {
        self.log_bodies = enabled;
        self
    }

    /// Turning redaction off logs session tokens and passwords in clear.
    #[must_use]
    pub fn with_redaction(mut self, enabled: bool) -> Self {
        self.redact = enabled;
        self
    }

    #[must_use]
    pub fn with_sensitive_field(mut self, field: impl Into<String>) -> Self {
        self.sensitive_fields.push(field.into());
        self
    }

    fn hides(&self, key: &str) -> bool {
        self.redact
            && self
                .sensitive_fields
                .iter()
                .any(|f| f.eq_ignore_ascii_case(key))
    }

    /// Render `key=value` pairs joined by `&`, masking sensitive values.
    #[must_use]
    pub fn redact_form<'a, I>(&self, pairs: I) -> String
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut out = String::new();
        for (key, value) in pairs {
            if !out.is_empty() {
                out.push('&');
            }
            out.push_str(key);
            out.push('=');
            out.push_str(if self.hides(key) { MASK } else { value });
        }
        out
    }

    /// Render a JSON body, masking sensitive values at any depth.
    #[must_use]
    pub fn redact_json(&self, value: &Value) -> String {
        let mut value = value.clone();
        self.mask_in_place(&mut value);
        value.to_string()
    }

    fn mask_in_place(&self, value: &mut Value) {
        match value {
            Value::Object(map) => {
                for (key, inner) in map.iter_mut() {
                    if self.hides(key) {
                        *inner = Value::String(MASK.to_string());
                    } else {
                        self.mask_in_place(inner);
                    }
                }
            }
            Value::Array(items) => {
                for item in items {
                    self.mask_in_place(item);
                }
            }
            _ => {}
        }
    }
}

/// Call counters of one client.
#[derive(Debug, Default)]
pub struct RequestMetrics {
    calls: AtomicU64,
    failures: AtomicU64,
    session_renewals: AtomicU64,
}

/// Point-in-time copy of [`RequestMetrics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    /// Logical calls finished, successful or not.
    pub calls: u64,
    pub failures: u64,
    /// Replies that reported an expired session.
    pub session_renewals: u64,
}

impl RequestMetrics {
    fn record(&self, failed: bool) {
        self.calls.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_session_renewal(&self) {
        self.session_renewals.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn session_renewals(&self) -> u64 {
        self.session_renewals.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            calls: self.calls.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            session_renewals: self.session_renewals(),
        }
    }
}

/// Times calls, logs their outcome and keeps the counters.
#[derive(Debug, Default)]
pub struct RequestLogger {
    config: LoggingConfig,
    metrics: RequestMetrics,
}

impl RequestLogger {
    #[must_use]
    pub fn with_config(config: LoggingConfig) -> Self {
        Self {
            config,
            metrics: RequestMetrics::default(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &LoggingConfig {
        &self.config
    }

    #[must_use]
    pub fn metrics(&self) -> &RequestMetrics {
        &self.metrics
    }

    #[must_use]
    pub fn start(&self, action: &str) -> RequestSpan {
        RequestSpan {
            action: action.to_string(),
            started: Instant::now(),
        }
    }

    /// Trace an outgoing body that has already been redacted.
    pub fn log_body(&self, method: &str, url: &str, body: &str) {
        if self.config.log_bodies {
            tracing::trace!(target: TARGET, method, url, body, "request body");
        }
    }

    pub fn finish_success(&self, span: RequestSpan) {
        self.metrics.record(false);
        if let Some(level) = self.config.success_level {
            log_at(level, &span, None);
        }
    }

    pub fn finish_error(&self, span: RequestSpan, error: &str) {
        self.metrics.record(true);
        if let Some(level) = self.config.failure_level {
            log_at(level, &span, Some(error));
        }
    }
}

// `tracing` macros need the level as a constant.
fn log_at(level: Level, span: &RequestSpan, error: Option<&str>) {
    let action = span.action.as_str();
    let elapsed = span.elapsed();
    macro_rules! emit {
        ($mac:ident) => {
            match error {
                None => tracing::$mac!(target: TARGET, action, ?elapsed, "call completed"),
                Some(error) => tracing::$mac!(target: TARGET, action, ?elapsed, error, "call failed"),
            }
        };
    }
    match level {
        Level::TRACE => emit!(trace),
        Level::DEBUG => emit!(debug),
        Level::INFO => emit!(info),
        Level::WARN => emit!(warn),
        _ => emit!(error),
    }
}

/// An in-flight logical call.
#[derive(Debug)]
pub struct RequestSpan {
    action: String,
    started: Instant,
}

impl RequestSpan {
    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}
