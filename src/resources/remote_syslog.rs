// SPDX-License-Identifier: MIT OR Apache-2.0

//! Remote syslog forwarding.
//!
//! Enabling a syslog profile is a multipart upload: TLS material is sent as
//! in-memory file parts next to the regular form fields.

use serde::{Deserialize, Deserializer};

use crate::api::{BasicCheck, UploadFile};
use crate::client::ControllerClient;
use crate::error::{ControllerError, Result};

/// A remote syslog profile (index 0 to 9).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemoteSyslog {
    pub index: u32,
    pub name: String,
    pub server: String,
    pub port: u16,
    /// `TCP` or `UDP`.
    pub protocol: String,
    pub template: String,
    pub ca_certificate: Option<String>,
    pub public_certificate: Option<String>,
    pub private_key: Option<String>,
    /// Gateways whose logs are not forwarded.
    pub excluded_gateways: Vec<String>,
}

impl RemoteSyslog {
    #[must_use]
    pub fn new(index: u32, server: impl Into<String>, port: u16) -> Self {
        Self {
            index,
            server: server.into(),
            port,
            protocol: "TCP".to_string(),
            ..Self::default()
        }
    }

    fn files(&self) -> Vec<UploadFile> {
        [
            ("ca_certificate", "ca.pem", &self.ca_certificate),
            ("public_certificate", "public.pem", &self.public_certificate),
            ("private_key", "private.pem", &self.private_key),
        ]
        .into_iter()
        .filter_map(|(param, file_name, content)| {
            content
                .as_deref()
                .filter(|c| !c.is_empty())
                .map(|c| UploadFile::from_content(param, file_name, c.as_bytes()))
        })
        .collect()
    }
}

/// A port the controller reports either as a number or as a string.
fn port_from_number_or_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u64),
        Text(String),
    }

    Ok(match Option::<Port>::deserialize(deserializer)? {
        Some(Port::Number(n)) => n.to_string(),
        Some(Port::Text(s)) => s,
        None => String::new(),
    })
}

/// Syslog profile as reported by `get_remote_syslog_logging_status`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RemoteSyslogStatus {
    pub server: String,
    #[serde(deserialize_with = "port_from_number_or_string")]
    pub port: String,
    pub protocol: String,
    pub index: String,
    pub name: String,
    pub template: String,
    #[serde(rename = "excluded_gateway")]
    pub excluded_gateways: Vec<String>,
    pub status: String,
    pub notls: bool,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    results: RemoteSyslogStatus,
}

impl ControllerClient {
    pub async fn enable_remote_syslog(&self, syslog: &RemoteSyslog) -> Result<()> {
        let mut params = self
            .form("enable_remote_syslog_logging")
            .with("index", syslog.index.to_string())
            .with("name", &syslog.name)
            .with("server", &syslog.server)
            .with("port", syslog.port.to_string())
            .with("protocol", &syslog.protocol)
            .with("template", &syslog.template)
            .with("exclude_gateway_list", syslog.excluded_gateways.join(","));
        self.post_file_api(&mut params, &syslog.files(), BasicCheck)
            .await
    }

    /// Status of the profile at `index`; [`ControllerError::NotFound`] when disabled.
    pub async fn get_remote_syslog_status(&self, index: u32) -> Result<RemoteSyslogStatus> {
        let params = self
            .form("get_remote_syslog_logging_status")
            .with("index", index.to_string());
        let data: StatusResponse = self
            .get_api("get_remote_syslog_logging_status", &params, BasicCheck)
            .await?;

        if data.results.status == "disabled" {
            return Err(ControllerError::NotFound);
        }
        Ok(data.results)
    }

    pub async fn disable_remote_syslog(&self, index: u32) -> Result<()> {
        tracing::info!(index, "disabling remote syslog");
        let mut form = self
            .form("disable_remote_syslog_logging")
            .with("index", index.to_string());
        self.post_api("disable_remote_syslog_logging", &mut form, BasicCheck)
            .await
    }
}
