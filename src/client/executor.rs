// SPDX-License-Identifier: MIT OR Apache-2.0

//! The session-aware request executor.
//!
//! Every controller call is one [`Exchange`]. The executor sends it, looks for
//! a session-expiry signal in the reply, logs in again and resends with the
//! fresh token. Anything that is not an expired session is handed back to the
//! caller untouched on the first attempt.

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::multipart::Form;
use reqwest::{Method, Response, StatusCode};
use serde_json::Value;
use tracing::{debug, warn, Level};
use url::Url;

use crate::api::{ApiEnvelope, ApiErrorBody, FormParams, SessionPayload, UploadFile};
use crate::client::session::is_session_expired;
use crate::client::{set_query_token, ControllerClient};
use crate::error::{ControllerError, Result};
use crate::runtime::BackoffStrategy;

const TARGET: &str = "aviatrix_api::http";

/// Marker in the `message` of a v2.5 403 reply when the token is stale.
const REST_EXPIRY_MARKER: &str = "Invalid CID";

/// How the payload is put on the wire.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Encoding<'a> {
    None,
    Form,
    Json,
    Multipart(&'a [UploadFile]),
}

/// Which reply convention the endpoint follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Surface {
    /// `{return, reason, results}` envelope; token in the payload or query.
    Envelope,
    /// Plain JSON with HTTP status; token in the `Authorization` header.
    Rest,
}

/// A single logical call.
pub(crate) struct Exchange<'a, P: SessionPayload> {
    pub(crate) action: &'a str,
    pub(crate) method: Method,
    pub(crate) url: Url,
    pub(crate) payload: Option<&'a mut P>,
    pub(crate) encoding: Encoding<'a>,
    pub(crate) surface: Surface,
}

impl<'a> Exchange<'a, FormParams> {
    /// A call without a body; any parameters are already in `url`.
    pub(crate) fn bare(action: &'a str, method: Method, url: Url, surface: Surface) -> Self {
        Self {
            action,
            method,
            url,
            payload: None,
            encoding: Encoding::None,
            surface,
        }
    }
}

impl<'a, P: SessionPayload> Exchange<'a, P> {
    pub(crate) fn with_payload(
        action: &'a str,
        method: Method,
        url: Url,
        payload: &'a mut P,
        encoding: Encoding<'a>,
        surface: Surface,
    ) -> Self {
        Self {
            action,
            method,
            url,
            payload: Some(payload),
            encoding,
            surface,
        }
    }

    fn label(&self) -> String {
        format!("{} {}", self.method, self.action)
    }

    /// Put the session token where this attempt will send it, so the token
    /// the controller sees is the one the reply is matched against.
    fn stamp_token(&mut self, cid: &str) {
        match (self.surface, self.payload.as_deref_mut()) {
            // The header is rebuilt from the session on every attempt.
            (Surface::Rest, _) => {}
            (Surface::Envelope, Some(payload)) => {
                if !payload.set_session_token(cid) {
                    debug!(target: TARGET, action = self.action, "payload has no session token field, sending as is");
                }
            }
            (Surface::Envelope, None) => set_query_token(&mut self.url, cid),
        }
    }
}

/// What the executor hands back once no further attempt is needed.
#[derive(Debug)]
pub(crate) enum Reply {
    /// Buffered JSON envelope together with the raw body.
    Envelope { envelope: ApiEnvelope, body: String },
    /// Buffered v2.5 reply.
    Rest { status: StatusCode, body: String },
    /// Non-JSON reply, body not read.
    Raw(Response),
}

impl Reply {
    fn body(&self) -> Option<&str> {
        match self {
            Reply::Envelope { body, .. } | Reply::Rest { body, .. } => Some(body),
            Reply::Raw(_) => None,
        }
    }
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("json"))
}

impl ControllerClient {
    /// Run `exchange` until it succeeds, fails for a reason other than an
    /// expired session, or runs out of attempts.
    pub(crate) async fn execute<P: SessionPayload>(
        &self,
        exchange: Exchange<'_, P>,
    ) -> Result<Reply> {
        let logger = &self.inner.logger;
        let span = logger.start(exchange.action);
        let result = self.run(exchange).await;
        match &result {
            Ok(_) => logger.finish_success(span),
            Err(e) => logger.finish_error(span, &e.to_string()),
        }
        result
    }

    async fn run<P: SessionPayload>(&self, mut ex: Exchange<'_, P>) -> Result<Reply> {
        let inner = &self.inner;
        let retry = inner.config.session_retry;
        let backoff = retry.backoff();
        let mut attempt: u32 = 0;

        loop {
            let cid = inner.session.cid();
            ex.stamp_token(&cid);
            let request = self.build_request(&ex, &cid).await?;

            let response = tokio::select! {
                _ = self.cancel.cancelled() => return Err(ControllerError::Cancelled),
                res = request.send() => res.map_err(|e| ControllerError::transport(ex.label(), e))?,
            };

            let (reply, expired) = tokio::select! {
                _ = self.cancel.cancelled() => return Err(ControllerError::Cancelled),
                res = Self::classify(&ex, &cid, response) => res?,
            };
            let Some(reason) = expired else {
                return Ok(reply);
            };

            inner.logger.metrics().record_session_renewal();
            let fresh = tokio::select! {
                _ = self.cancel.cancelled() => return Err(ControllerError::Cancelled),
                res = inner.session.renew(&cid, inner.authenticator.as_ref(), &inner.http, &inner.endpoints) => res?,
            };
            ex.stamp_token(&fresh);

            attempt += 1;
            if attempt >= retry.max_attempts {
                debug!(
                    target: TARGET,
                    action = ex.action,
                    body = reply.body().unwrap_or_default(),
                    "session retries exhausted, dropping last response"
                );
                return Err(ControllerError::SessionExpired {
                    action: ex.action.to_string(),
                    reason,
                });
            }

            let delay = backoff.delay(attempt - 1);
            warn!(
                target: TARGET,
                action = ex.action,
                attempt,
                ?delay,
                "session expired, retrying with a new session"
            );
            tokio::select! {
                _ = self.cancel.cancelled() => return Err(ControllerError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    async fn build_request<P: SessionPayload>(
        &self,
        ex: &Exchange<'_, P>,
        cid: &str,
    ) -> Result<reqwest::RequestBuilder> {
        let mut request = self
            .inner
            .http
            .request(ex.method.clone(), ex.url.clone());
        if ex.surface == Surface::Rest {
            request = request.header(AUTHORIZATION, format!("cid {cid}"));
        }

        let payload = ex.payload.as_deref();
        self.trace_body(ex, payload);

        Ok(match (ex.encoding, payload) {
            (Encoding::Form, Some(p)) => request.form(p),
            (Encoding::Json, Some(p)) => request.json(p),
            (Encoding::Multipart(files), p) => request.multipart(multipart_form(p, files).await?),
            _ => request,
        })
    }

    fn trace_body<P: SessionPayload>(&self, ex: &Exchange<'_, P>, payload: Option<&P>) {
        let config = self.inner.logger.config();
        if !config.log_bodies || !tracing::enabled!(target: TARGET, Level::TRACE) {
            return;
        }
        let body = match payload.map(serde_json::to_value) {
            Some(Ok(value)) => config.redact_json(&value),
            Some(Err(e)) => format!("<unserializable: {e}>"),
            None => String::new(),
        };
        let query: Vec<(String, String)> = ex
            .url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        let url = if query.is_empty() {
            ex.url.path().to_string()
        } else {
            let query = config.redact_form(query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
            format!("{}?{}", ex.url.path(), query)
        };
        self.inner
            .logger
            .log_body(ex.method.as_str(), &url, &body);
    }

    /// Read the reply and decide whether it reports an expired `cid`.
    async fn classify<P: SessionPayload>(
        ex: &Exchange<'_, P>,
        cid: &str,
        response: Response,
    ) -> Result<(Reply, Option<String>)> {
        match ex.surface {
            Surface::Envelope => {
                if !is_json(&response) {
                    return Ok((Reply::Raw(response), None));
                }
                let body = response
                    .text()
                    .await
                    .map_err(|e| ControllerError::transport(ex.label(), e))?;
                let envelope: ApiEnvelope = serde_json::from_str(&body)
                    .map_err(|e| ControllerError::decode("into standard format", &e, &body))?;
                let expired = (!envelope.ret && is_session_expired(&envelope.reason, cid))
                    .then(|| envelope.reason.clone());
                Ok((Reply::Envelope { envelope, body }, expired))
            }
            Surface::Rest => {
                let status = response.status();
                let body = response
                    .text()
                    .await
                    .map_err(|e| ControllerError::transport(ex.label(), e))?;
                let mut expired = None;
                if status == StatusCode::FORBIDDEN {
                    let error: ApiErrorBody = serde_json::from_str(&body)
                        .map_err(|e| ControllerError::decode("into error message", &e, &body))?;
                    if error.message.contains(REST_EXPIRY_MARKER) {
                        expired = Some(error.message);
                    }
                }
                Ok((Reply::Rest { status, body }, expired))
            }
        }
    }
}

/// Payload fields become text parts, followed by the file parts.
async fn multipart_form<P: SessionPayload>(
    payload: Option<&P>,
    files: &[UploadFile],
) -> Result<Form> {
    let mut form = Form::new();
    if let Some(payload) = payload {
        let value = serde_json::to_value(payload)
            .map_err(|e| ControllerError::Validation(format!("invalid multipart parameters: {e}")))?;
        let Value::Object(fields) = value else {
            return Err(ControllerError::Validation(
                "multipart parameters must be a map".to_string(),
            ));
        };
        for (key, value) in fields {
            let text = match value {
                Value::String(s) => s,
                Value::Null => continue,
                other => other.to_string(),
            };
            form = form.text(key, text);
        }
    }
    for file in files {
        if let Some(part) = file.to_part().await? {
            form = form.part(file.param_name.clone(), part);
        }
    }
    Ok(form)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stamp_token_in_payload() {
        let mut form = FormParams::action("list_accounts").with("CID", "old");
        let mut ex = Exchange::with_payload(
            "list_accounts",
            Method::POST,
            Url::parse("https://10.0.0.1/v1/api").unwrap(),
            &mut form,
            Encoding::Form,
            Surface::Envelope,
        );
        ex.stamp_token("new");
        drop(ex);
        assert_eq!(form.get("CID"), Some("new"));
    }

    #[test]
    fn test_stamp_token_in_query() {
        let url = Url::parse("https://10.0.0.1/v1/api?action=list_accounts&CID=old").unwrap();
        let mut ex = Exchange::bare("list_accounts", Method::GET, url, Surface::Envelope);
        ex.stamp_token("new");
        let pairs: Vec<_> = ex.url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("CID".to_string(), "new".to_string())));
        assert!(!pairs.contains(&("CID".to_string(), "old".to_string())));
        assert!(pairs.contains(&("action".to_string(), "list_accounts".to_string())));
    }

    #[test]
    fn test_stamp_token_rest_leaves_url() {
        let url = Url::parse("https://10.0.0.1/v2.5/api/app-domains").unwrap();
        let mut ex = Exchange::bare("app-domains", Method::GET, url.clone(), Surface::Rest);
        ex.stamp_token("new");
        assert_eq!(ex.url, url);
    }

    #[test]
    fn test_reply_body() {
        let reply = Reply::Rest {
            status: StatusCode::OK,
            body: "{}".to_string(),
        };
        assert_eq!(reply.body(), Some("{}"));
    }

    #[tokio::test]
    async fn test_multipart_form_rejects_non_map() {
        let payload = serde_json::json!(["a", "b"]);
        let files = [UploadFile::from_content("ca", "ca.pem", "pem")];
        let err = multipart_form(Some(&payload), &files)
            .await
            .unwrap_err();
        assert!(matches!(err, ControllerError::Validation(_)));
    }

    #[tokio::test]
    async fn test_multipart_form_accepts_map() {
        let params = FormParams::action("enable_remote_syslog_logging").with("port", "514");
        let files = [
            UploadFile::from_content("ca_certificate", "ca.pem", "pem"),
            UploadFile::from_path("public_certificate", ""),
        ];
        assert!(multipart_form(Some(&params), &files).await.is_ok());
    }
}
