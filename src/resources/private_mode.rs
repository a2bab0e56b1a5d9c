// SPDX-License-Identifier: MIT OR Apache-2.0

//! Controller private mode, configured over the JSON-body API.

use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::api::{BasicCheck, IgnoreCheck};
use crate::client::ControllerClient;
use crate::error::Result;

/// Private mode settings of the controller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrivateModeConfig {
    pub enabled: bool,
    pub copilot_instance_id: String,
    /// Proxy instance ids of type `http_proxy`.
    pub proxies: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PrivateModeContents {
    private_mode_enabled: bool,
    proxy_info: Map<String, Value>,
    copilot_resource_id: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PrivateModeResults {
    contents: PrivateModeContents,
}

#[derive(Debug, Deserialize)]
struct PrivateModeResponse {
    #[serde(default)]
    results: PrivateModeResults,
}

impl From<PrivateModeContents> for PrivateModeConfig {
    fn from(contents: PrivateModeContents) -> Self {
        let mut proxies: Vec<String> = contents
            .proxy_info
            .into_iter()
            .filter(|(_, info)| info.get("proxy_type").and_then(Value::as_str) == Some("http_proxy"))
            .map(|(id, _)| id)
            .collect();
        proxies.sort();
        Self {
            enabled: contents.private_mode_enabled,
            copilot_instance_id: contents.copilot_resource_id,
            proxies,
        }
    }
}

impl ControllerClient {
    fn v2_body(&self, action: &str) -> Value {
        json!({ "action": action, "CID": self.cid() })
    }

    /// Enable private mode. Succeeds when it is already enabled.
    pub async fn enable_private_mode(&self) -> Result<()> {
        let mut body = self.v2_body("enable_private_mode");
        self.post_api_v2::<Value, _>(
            "enable_private_mode",
            &mut body,
            IgnoreCheck::new(["Private Mode is already enabled"]),
        )
        .await
        .map(|_| ())
    }

    /// Disable private mode. Succeeds when it is not enabled.
    pub async fn disable_private_mode(&self) -> Result<()> {
        let mut body = self.v2_body("disable_private_mode");
        self.post_api_v2::<Value, _>(
            "disable_private_mode",
            &mut body,
            IgnoreCheck::new(["Cannot disable Private Mode, it is not enabled"]),
        )
        .await
        .map(|_| ())
    }

    pub async fn update_private_mode_copilot(&self, copilot_instance_id: &str) -> Result<()> {
        let mut body = self.v2_body("update_private_mode_copilot");
        body["instance_id"] = json!(copilot_instance_id);
        self.post_api_v2::<Value, _>("update_private_mode_copilot", &mut body, BasicCheck)
            .await
            .map(|_| ())
    }

    pub async fn update_private_mode_proxies(&self, proxies: &[String]) -> Result<()> {
        let mut body = self.v2_body("update_private_mode_controller_proxies");
        body["instance_ids"] = json!(proxies);
        self.post_api_v2::<Value, _>(
            "update_private_mode_controller_proxies",
            &mut body,
            BasicCheck,
        )
        .await
        .map(|_| ())
    }

    pub async fn get_private_mode(&self) -> Result<PrivateModeConfig> {
        let params = self.form("get_private_mode_info");
        let data: PrivateModeResponse = self
            .get_api("get_private_mode_info", &params, BasicCheck)
            .await?;
        Ok(data.results.contents.into())
    }
}
