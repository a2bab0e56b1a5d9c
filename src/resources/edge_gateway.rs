// SPDX-License-Identifier: MIT OR Apache-2.0

//! Edge gateways.
//!
//! Creating an edge gateway returns its zero-touch provisioning file (an ISO
//! image or a cloud-init document) instead of a JSON envelope. The file is
//! streamed to disk. The HA peer of an edge gateway is created over the v2
//! surface and its file comes back base64-encoded inside the envelope.

use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::{BasicCheck, NotFoundCheck, SessionPayload};
use crate::client::ControllerClient;
use crate::error::{ControllerError, Result};

fn is_false(v: &bool) -> bool {
    !*v
}

/// Zero-touch provisioning file format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ZtpFileType {
    Iso,
    #[default]
    CloudInit,
}

impl ZtpFileType {
    /// File name the provisioning file for `gateway_name` is written to.
    #[must_use]
    pub fn file_name(&self, gateway_name: &str) -> String {
        match self {
            ZtpFileType::Iso => format!("{gateway_name}.iso"),
            ZtpFileType::CloudInit => format!("{gateway_name}-cloud-init.txt"),
        }
    }

    /// File name the provisioning file of the HA peer of `primary` at `site_id` is written to.
    #[must_use]
    pub fn ha_file_name(&self, primary: &str, site_id: &str) -> String {
        self.file_name(&format!("{primary}-{site_id}-ha"))
    }
}

/// An edge gateway as sent to `create_edge_gateway`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EdgeGateway {
    #[serde(rename = "CID", skip_serializing_if = "String::is_empty")]
    pub cid: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub action: String,
    #[serde(rename = "type", skip_serializing_if = "String::is_empty")]
    pub gateway_type: String,
    #[serde(skip_serializing_if = "is_false")]
    pub caag: bool,
    #[serde(rename = "gateway_name")]
    pub name: String,
    #[serde(rename = "mgmt_egress_ip", skip_serializing_if = "String::is_empty")]
    pub management_egress_ip_prefix: String,
    #[serde(rename = "mgmt_over_private_network", skip_serializing_if = "is_false")]
    pub management_over_private_network: bool,
    #[serde(rename = "wan_ip", skip_serializing_if = "String::is_empty")]
    pub wan_interface_ip_prefix: String,
    #[serde(rename = "wan_default_gateway", skip_serializing_if = "String::is_empty")]
    pub wan_default_gateway_ip: String,
    #[serde(rename = "lan_ip", skip_serializing_if = "String::is_empty")]
    pub lan_interface_ip_prefix: String,
    #[serde(rename = "mgmt_ip", skip_serializing_if = "String::is_empty")]
    pub management_interface_ip_prefix: String,
    #[serde(rename = "mgmt_default_gateway", skip_serializing_if = "String::is_empty")]
    pub management_default_gateway_ip: String,
    #[serde(rename = "dns_server_ip", skip_serializing_if = "String::is_empty")]
    pub dns_server_ip: String,
    #[serde(rename = "dns_server_ip_secondary", skip_serializing_if = "String::is_empty")]
    pub secondary_dns_server_ip: String,
    /// Management interface via DHCP.
    #[serde(skip_serializing_if = "is_false")]
    pub dhcp: bool,
    pub ztp_file_type: ZtpFileType,
}

impl EdgeGateway {
    #[must_use]
    pub fn new(name: impl Into<String>, ztp_file_type: ZtpFileType) -> Self {
        Self {
            name: name.into(),
            ztp_file_type,
            ..Self::default()
        }
    }
}

impl SessionPayload for EdgeGateway {
    fn set_session_token(&mut self, cid: &str) -> bool {
        self.cid = cid.to_string();
        true
    }
}

/// Device details reported by `get_cloudwan_device_details`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EdgeGatewayDetails {
    pub name: String,
    pub state: String,
    pub mgmt_egress_ip: String,
    pub mgmt_over_private_network: bool,
    pub wan_ip: String,
    pub wan_default_gateway: String,
    pub lan_ip: String,
    pub mgmt_ip: String,
    pub mgmt_default_gateway: String,
    pub dns_server_ip: String,
    pub dns_server_ip_secondary: String,
    pub dhcp: bool,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    #[serde(default)]
    results: EdgeGatewayDetails,
}

/// One interface of an edge HA gateway.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EdgeInterface {
    #[serde(rename = "logical_ifname")]
    pub logical_name: String,
    #[serde(rename = "ipaddr", skip_serializing_if = "String::is_empty")]
    pub ip_address: String,
    #[serde(rename = "gateway_ip", skip_serializing_if = "String::is_empty")]
    pub gateway_ip: String,
    #[serde(skip_serializing_if = "is_false")]
    pub dhcp: bool,
}

/// The self-managed HA peer of an edge gateway, as sent to
/// `create_multicloud_ha_gateway`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EdgeHaGateway {
    #[serde(rename = "CID")]
    pub cid: String,
    pub action: String,
    pub primary_gw_name: String,
    #[serde(skip)]
    pub site_id: String,
    #[serde(skip)]
    pub ztp_file_type: ZtpFileType,
    #[serde(skip)]
    pub interface_list: Vec<EdgeInterface>,
    /// Base64 of the JSON interface list, filled in on create.
    pub interfaces: String,
    #[serde(rename = "dns_server_ip", skip_serializing_if = "String::is_empty")]
    pub dns_server_ip: String,
    #[serde(rename = "dns_server_ip_secondary", skip_serializing_if = "String::is_empty")]
    pub secondary_dns_server_ip: String,
    #[serde(rename = "mgmt_egress_ip", skip_serializing_if = "String::is_empty")]
    pub management_egress_ip_prefix: String,
    #[serde(skip_serializing_if = "is_false")]
    pub no_progress_bar: bool,
    pub cloud_init: bool,
}

impl EdgeHaGateway {
    #[must_use]
    pub fn new(
        primary_gw_name: impl Into<String>,
        site_id: impl Into<String>,
        ztp_file_type: ZtpFileType,
    ) -> Self {
        Self {
            primary_gw_name: primary_gw_name.into(),
            site_id: site_id.into(),
            ztp_file_type,
            ..Self::default()
        }
    }

    fn encode_interfaces(&mut self) -> Result<()> {
        let list = serde_json::to_vec(&self.interface_list)
            .map_err(|e| ControllerError::Validation(format!("edge interfaces: {e}")))?;
        self.interfaces = STANDARD.encode(list);
        Ok(())
    }
}

impl SessionPayload for EdgeHaGateway {
    fn set_session_token(&mut self, cid: &str) -> bool {
        self.cid = cid.to_string();
        true
    }
}

/// Name the controller gives an HA peer when it reports none.
fn default_ha_name(primary: &str) -> String {
    format!("{primary}-hagw")
}

impl ControllerClient {
    /// Create an edge gateway and write its provisioning file into `dir`.
    ///
    /// Returns the path of the written file.
    pub async fn create_edge_gateway(
        &self,
        gateway: &mut EdgeGateway,
        dir: impl AsRef<Path>,
    ) -> Result<PathBuf> {
        gateway.action = "create_edge_gateway".to_string();
        gateway.cid = self.cid();
        gateway.gateway_type = "caag".to_string();
        gateway.caag = true;

        let download = self
            .post_api_download("create_edge_gateway", gateway, BasicCheck)
            .await?;

        let path = dir
            .as_ref()
            .join(gateway.ztp_file_type.file_name(&gateway.name));
        let mut file = tokio::fs::File::create(&path).await?;
        let written = download.write_to(&mut file).await?;
        info!(gateway = %gateway.name, path = %path.display(), bytes = written, "wrote provisioning file");
        Ok(path)
    }

    /// Create the HA peer of an edge gateway and write its provisioning file
    /// into `dir`.
    ///
    /// Returns the name of the HA gateway and the path of the written file.
    pub async fn create_edge_ha_gateway(
        &self,
        gateway: &mut EdgeHaGateway,
        dir: impl AsRef<Path>,
    ) -> Result<(String, PathBuf)> {
        gateway.action = "create_multicloud_ha_gateway".to_string();
        gateway.cid = self.cid();
        gateway.no_progress_bar = true;
        gateway.cloud_init = gateway.ztp_file_type == ZtpFileType::CloudInit;
        gateway.encode_interfaces()?;

        let reply = self
            .post_api_v2_ha_gw("create_multicloud_ha_gateway", gateway, BasicCheck)
            .await?;

        let content = match gateway.ztp_file_type {
            ZtpFileType::Iso => STANDARD.decode(reply.results.trim()).map_err(|e| {
                ControllerError::Decode {
                    context: "create_multicloud_ha_gateway ISO".to_string(),
                    message: e.to_string(),
                    body: String::new(),
                }
            })?,
            ZtpFileType::CloudInit => reply.results.into_bytes(),
        };
        let path = dir.as_ref().join(
            gateway
                .ztp_file_type
                .ha_file_name(&gateway.primary_gw_name, &gateway.site_id),
        );
        tokio::fs::write(&path, &content).await?;

        let name = if reply.ha_gw_name.is_empty() {
            default_ha_name(&gateway.primary_gw_name)
        } else {
            reply.ha_gw_name
        };
        info!(gateway = %name, path = %path.display(), bytes = content.len(), "wrote HA provisioning file");
        Ok((name, path))
    }

    /// [`NotFound`](crate::error::ControllerError::NotFound) when the device does not exist.
    pub async fn get_edge_gateway(&self, name: &str) -> Result<EdgeGatewayDetails> {
        let params = self
            .form("get_cloudwan_device_details")
            .with("device_name", name);
        let data: DetailsResponse = self
            .get_api(
                "get_cloudwan_device_details",
                &params,
                NotFoundCheck::does_not_exist(),
            )
            .await?;
        Ok(data.results)
    }

    pub async fn update_edge_gateway(&self, name: &str, management_egress_ip: &str) -> Result<()> {
        let mut form = self
            .form("update_edge_gateway")
            .with("gateway_name", name)
            .with("mgmt_egress_ip", management_egress_ip);
        self.post_api("update_edge_gateway", &mut form, BasicCheck)
            .await
    }

    /// Delete an edge gateway. Gateways that never registered (`check` or
    /// `waiting`) are reset to factory state instead.
    pub async fn delete_edge_gateway(&self, name: &str, state: &str) -> Result<()> {
        let mut form = if matches!(state, "check" | "waiting") {
            self.form("reset_managed_cloudn_to_factory_state")
                .with("device_name", name)
        } else {
            self.form("delete_edge_gateway")
                .with("name", name)
                .with("caag", "true")
        };
        let action = form.action_name().to_string();
        self.post_api(&action, &mut form, BasicCheck).await
    }
}
