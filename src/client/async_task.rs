// SPDX-License-Identifier: MIT OR Apache-2.0

//! Long-running controller actions.
//!
//! Some actions (upgrades, backups, gateway image changes) answer with a task
//! id instead of a result. The client polls `check_task_status` on the backend
//! endpoint until the task reports `done`.

use std::time::Duration;

use reqwest::Method;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::api::{AsyncTaskStatus, CheckApiResponse, FormParams, SessionPayload};
use crate::client::executor::{Encoding, Exchange, Reply, Surface};
use crate::client::ControllerClient;
use crate::error::{ControllerError, Result};

/// Polling schedule for asynchronous actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AsyncPollConfig {
    pub interval: Duration,
    pub max_polls: u32,
}

impl Default for AsyncPollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            max_polls: 360,
        }
    }
}

impl AsyncPollConfig {
    #[must_use]
    pub fn new(interval: Duration, max_polls: u32) -> Self {
        Self {
            interval,
            max_polls,
        }
    }

    /// How long polling may take in total.
    #[must_use]
    pub fn deadline(&self) -> Duration {
        self.interval.saturating_mul(self.max_polls)
    }
}

#[derive(Debug, Deserialize)]
struct TaskStarted {
    #[serde(rename = "return", default)]
    ret: bool,
    #[serde(default)]
    results: serde_json::Value,
    #[serde(default)]
    reason: String,
}

async fn reply_body(action: &str, reply: Reply) -> Result<String> {
    match reply {
        Reply::Envelope { body, .. } | Reply::Rest { body, .. } => Ok(body),
        Reply::Raw(response) => response
            .text()
            .await
            .map_err(|e| ControllerError::transport(format!("read {action}"), e)),
    }
}

impl ControllerClient {
    /// Start an asynchronous action and wait for it to finish.
    ///
    /// The final `(result, status)` of the task is passed to `check`.
    /// Transport errors while polling are treated as transient.
    pub async fn post_async_api<P: SessionPayload>(
        &self,
        action: &str,
        payload: &mut P,
        check: impl CheckApiResponse,
    ) -> Result<()> {
        debug!(target: "aviatrix_api::http", action, "starting async action");
        let url = self.inner.endpoints.v1.clone();
        let reply = self
            .execute(Exchange::with_payload(
                action,
                Method::POST,
                url,
                payload,
                Encoding::Form,
                Surface::Envelope,
            ))
            .await?;
        let body = reply_body(action, reply).await?;
        let started: TaskStarted = serde_json::from_str(&body)
            .map_err(|e| ControllerError::decode(action, &e, &body))?;
        let task_id = match started.results.as_i64() {
            Some(id) if started.ret && id != 0 => id,
            _ => {
                return Err(ControllerError::Api(format!(
                    "rest API {action} POST failed to initiate async action: {}",
                    started.reason
                )))
            }
        };

        let poll = self.inner.config.async_poll;
        let mut form = poll_form(&self.cid(), task_id);
        let backend = self.inner.endpoints.backend.clone();

        for _ in 0..poll.max_polls {
            let reply = self
                .execute(Exchange::with_payload(
                    "check_task_status",
                    Method::POST,
                    backend.clone(),
                    &mut form,
                    Encoding::Form,
                    Surface::Envelope,
                ))
                .await;
            let status = match reply {
                Ok(reply) => {
                    let body = reply_body("check_task_status", reply).await?;
                    serde_json::from_str::<AsyncTaskStatus>(&body).map_err(|e| {
                        ControllerError::decode("check_task_status", &e, &body)
                    })?
                }
                Err(e @ ControllerError::Transport { .. }) => {
                    warn!(target: "aviatrix_api::http", action, err = %e, "polling async action failed");
                    self.pause(poll.interval).await?;
                    continue;
                }
                Err(e) => return Err(e),
            };

            if status.done {
                return check.check(action, "Post", &status.result, status.status);
            }
            debug!(target: "aviatrix_api::http", action, task_id, pos = status.pos, "async action still running");
            self.pause(poll.interval).await?;
        }

        Err(ControllerError::Api(format!(
            "waited {:?} but async action {action} never finished, please verify its status manually",
            poll.deadline()
        )))
    }

    async fn pause(&self, delay: Duration) -> Result<()> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(ControllerError::Cancelled),
            _ = tokio::time::sleep(delay) => Ok(()),
        }
    }
}

fn poll_form(cid: &str, task_id: i64) -> FormParams {
    FormParams::action("check_task_status")
        .with("CID", cid)
        .with("id", task_id.to_string())
        .with("pos", "0")
}
