// SPDX-License-Identifier: MIT OR Apache-2.0

//! Runtime utilities for resilience and observability.
//!
//! Retry policies for the session and transport retry loops, and request
//! logging with redaction of session tokens and credentials.

mod logging;
mod retry;

pub use logging::{LoggingConfig, MetricsSnapshot, RequestLogger, RequestMetrics, RequestSpan};
pub use retry::{BackoffStrategy, ExponentialBackoff, SessionRetry, TransportRetry};
