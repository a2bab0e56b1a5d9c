// SPDX-License-Identifier: MIT OR Apache-2.0

//! High-level calls over the three controller surfaces.

use bytes::Bytes;
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::api::{
    ApiEnvelope, ApiErrorBody, ApiResponse, CheckApiResponse, FormParams, HaCreateResponse,
    SessionPayload, UploadFile,
};
use crate::client::executor::{Encoding, Exchange, Reply, Surface};
use crate::client::ControllerClient;
use crate::error::{ControllerError, Result};

/// A file streamed back by the controller.
///
/// The body has not been read when this is returned; it is consumed with
/// [`chunk`](Download::chunk), [`bytes`](Download::bytes) or
/// [`write_to`](Download::write_to).
#[derive(Debug)]
pub struct Download {
    action: String,
    response: Response,
}

impl Download {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.response.status()
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// The next chunk of the body, or `None` at the end.
    pub async fn chunk(&mut self) -> Result<Option<Bytes>> {
        self.response
            .chunk()
            .await
            .map_err(|e| ControllerError::transport(format!("read {}", self.action), e))
    }

    /// Read the remaining body into memory.
    pub async fn bytes(self) -> Result<Bytes> {
        let action = self.action;
        self.response
            .bytes()
            .await
            .map_err(|e| ControllerError::transport(format!("read {action}"), e))
    }

    /// Stream the body into `writer`, returning the number of bytes written.
    pub async fn write_to<W>(mut self, writer: &mut W) -> Result<u64>
    where
        W: AsyncWrite + Unpin,
    {
        let mut written = 0u64;
        while let Some(chunk) = self.chunk().await? {
            writer.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        writer.flush().await?;
        Ok(written)
    }

    #[must_use]
    pub fn into_response(self) -> Response {
        self.response
    }
}

/// Buffer a reply that is expected to carry the JSON envelope.
async fn into_envelope(action: &str, reply: Reply) -> Result<(ApiEnvelope, String)> {
    let body = match reply {
        Reply::Envelope { envelope, body } => return Ok((envelope, body)),
        Reply::Rest { body, .. } => body,
        Reply::Raw(response) => response
            .text()
            .await
            .map_err(|e| ControllerError::transport(format!("read {action}"), e))?,
    };
    let envelope = serde_json::from_str(&body)
        .map_err(|e| ControllerError::decode("into standard format", &e, &body))?;
    Ok((envelope, body))
}

fn decode_body<T: DeserializeOwned>(action: &str, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| ControllerError::decode(action, &e, body))
}

impl ControllerClient {
    /// POST `payload` as a form to the v1 surface and check the envelope.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use aviatrix_api_rs::ControllerClient;
    /// use aviatrix_api_rs::api::{BasicCheck, FormParams};
    ///
    /// # async fn example(client: ControllerClient) -> aviatrix_api_rs::error::Result<()> {
    /// let mut form = client
    ///     .form("enable_controller_backup")
    ///     .with("cloud_type", "1");
    /// client.post_api("enable_controller_backup", &mut form, BasicCheck).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn post_api<P: SessionPayload>(
        &self,
        action: &str,
        payload: &mut P,
        check: impl CheckApiResponse,
    ) -> Result<()> {
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
        let (envelope, _) = into_envelope(action, reply).await?;
        check.check(action, "Post", &envelope.reason, envelope.ret)
    }

    /// Like [`post_api`](Self::post_api), then decode the whole reply into `T`.
    pub async fn post_api_with_response<T, P>(
        &self,
        action: &str,
        payload: &mut P,
        check: impl CheckApiResponse,
    ) -> Result<T>
    where
        T: DeserializeOwned,
        P: SessionPayload,
    {
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
        let (envelope, body) = into_envelope(action, reply).await?;
        check.check(action, "POST", &envelope.reason, envelope.ret)?;
        decode_body(action, &body)
    }

    /// GET the v1 surface with `params` in the query and decode the reply into `T`.
    ///
    /// The HTTP round trip is resent on transport errors as configured by
    /// `transport_retry`. Controller failures are not retried.
    pub async fn get_api<T: DeserializeOwned>(
        &self,
        action: &str,
        params: &FormParams,
        check: impl CheckApiResponse,
    ) -> Result<T> {
        let url = self.inner.endpoints.v1_with_query(params);
        let reply = self
            .inner
            .config
            .transport_retry
            .execute(&self.cancel, |_| {
                let url = url.clone();
                async move {
                    self.execute(Exchange::bare(action, Method::GET, url, Surface::Envelope))
                        .await
                }
            })
            .await?;
        let (envelope, body) = into_envelope(action, reply).await?;
        check.check(action, "Get", &envelope.reason, envelope.ret)?;
        decode_body(action, &body)
    }

    /// POST a form whose reply is a file.
    ///
    /// A JSON reply is run through `check`; when the check lets it pass the
    /// call still fails with [`ControllerError::UnexpectedJson`].
    pub async fn post_api_download<P: SessionPayload>(
        &self,
        action: &str,
        payload: &mut P,
        check: impl CheckApiResponse,
    ) -> Result<Download> {
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
        match reply {
            Reply::Raw(response) => Ok(Download {
                action: action.to_string(),
                response,
            }),
            other => {
                let (envelope, _) = into_envelope(action, other).await?;
                check.check(action, "Post", &envelope.reason, envelope.ret)?;
                Err(ControllerError::UnexpectedJson(action.to_string()))
            }
        }
    }

    /// Upload `files` as a multipart form together with `params`.
    ///
    /// `params` must name the `action`.
    pub async fn post_file_api(
        &self,
        params: &mut FormParams,
        files: &[UploadFile],
        check: impl CheckApiResponse,
    ) -> Result<()> {
        let action = params.action_name().to_string();
        if action.is_empty() {
            return Err(ControllerError::Validation(
                "cannot post a file without an 'action' in params".to_string(),
            ));
        }
        let url = self.inner.endpoints.v1.clone();
        let reply = self
            .execute(Exchange::with_payload(
                &action,
                Method::POST,
                url,
                params,
                Encoding::Multipart(files),
                Surface::Envelope,
            ))
            .await?;
        let (envelope, _) = into_envelope(&action, reply).await?;
        check.check(&action, "Post", &envelope.reason, envelope.ret)
    }

    /// POST `payload` as JSON to the v2 surface.
    ///
    /// Returns the decoded `results`, or `None` when the check accepted a
    /// failure or the controller sent no results.
    pub async fn post_api_v2<T, P>(
        &self,
        action: &str,
        payload: &mut P,
        check: impl CheckApiResponse,
    ) -> Result<Option<T>>
    where
        T: DeserializeOwned,
        P: SessionPayload,
    {
        let url = self.inner.endpoints.v2.clone();
        let reply = self
            .execute(Exchange::with_payload(
                action,
                Method::POST,
                url,
                payload,
                Encoding::Json,
                Surface::Envelope,
            ))
            .await?;
        let (envelope, body) = into_envelope(action, reply).await?;
        check.check(action, "Post", &envelope.reason, envelope.ret)?;
        if !envelope.ret {
            return Ok(None);
        }
        let data: ApiResponse<T> = decode_body(action, &body)?;
        Ok(data.results)
    }

    /// POST `payload` as JSON to the v2 surface for an HA gateway creation.
    ///
    /// `ha_gw_name` of the reply names the gateway the controller created.
    pub async fn post_api_v2_ha_gw<P: SessionPayload>(
        &self,
        action: &str,
        payload: &mut P,
        check: impl CheckApiResponse,
    ) -> Result<HaCreateResponse> {
        let url = self.inner.endpoints.v2.clone();
        let reply = self
            .execute(Exchange::with_payload(
                action,
                Method::POST,
                url,
                payload,
                Encoding::Json,
                Surface::Envelope,
            ))
            .await?;
        let (envelope, body) = into_envelope(action, reply).await?;
        check.check(action, "Post", &envelope.reason, envelope.ret)?;
        decode_body(action, &body)
    }

    /// GET a v2.5 endpoint such as `app-domains/<uuid>`.
    pub async fn get_api_v25<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let url = self.inner.endpoints.v25_endpoint(endpoint)?;
        let reply = self
            .execute(Exchange::bare(endpoint, Method::GET, url, Surface::Rest))
            .await?;
        rest_result(Method::GET, endpoint, reply).await
    }

    /// POST a JSON body to a v2.5 endpoint.
    pub async fn post_api_v25<T, B>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + Sync + ?Sized,
    {
        self.rest_with_body(Method::POST, endpoint, body).await
    }

    /// PUT a JSON body to a v2.5 endpoint.
    pub async fn put_api_v25<T, B>(&self, endpoint: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + Sync + ?Sized,
    {
        self.rest_with_body(Method::PUT, endpoint, body).await
    }

    /// DELETE a v2.5 endpoint.
    pub async fn delete_api_v25(&self, endpoint: &str) -> Result<()> {
        let url = self.inner.endpoints.v25_endpoint(endpoint)?;
        let reply = self
            .execute(Exchange::bare(endpoint, Method::DELETE, url, Surface::Rest))
            .await?;
        rest_result::<serde_json::Value>(Method::DELETE, endpoint, reply)
            .await
            .map(|_| ())
    }

    async fn rest_with_body<T, B>(&self, method: Method, endpoint: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + Sync + ?Sized,
    {
        let url = self.inner.endpoints.v25_endpoint(endpoint)?;
        let mut payload = RestBody(serde_json::to_value(body).map_err(|e| {
            ControllerError::Validation(format!("invalid body for {endpoint}: {e}"))
        })?);
        let reply = self
            .execute(Exchange::with_payload(
                endpoint,
                method.clone(),
                url,
                &mut payload,
                Encoding::Json,
                Surface::Rest,
            ))
            .await?;
        rest_result(method, endpoint, reply).await
    }
}

/// v2.5 request body. The token travels in a header, never in the body.
#[derive(Serialize)]
#[serde(transparent)]
struct RestBody(serde_json::Value);

impl SessionPayload for RestBody {}

async fn rest_result<T: DeserializeOwned>(method: Method, endpoint: &str, reply: Reply) -> Result<T> {
    let (status, body) = match reply {
        Reply::Rest { status, body } => (status, body),
        Reply::Envelope { body, .. } => (StatusCode::OK, body),
        Reply::Raw(response) => {
            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| ControllerError::transport(format!("{method} {endpoint}"), e))?;
            (status, body)
        }
    };

    if !status.is_success() {
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|e| e.message)
            .unwrap_or(body);
        return Err(ControllerError::Api(format!(
            "HTTP {method} {endpoint:?} failed: {message}"
        )));
    }

    let body = if body.trim().is_empty() { "null" } else { body.as_str() };
    decode_body(endpoint, body)
}
