// SPDX-License-Identifier: MIT OR Apache-2.0

//! AWS Transit Gateway Connect attachments.

use serde::{Deserialize, Serialize};

use crate::api::{BasicCheck, NotFoundCheck, SessionPayload};
use crate::client::ControllerClient;
use crate::error::Result;

/// Reason code the controller returns for an unknown connection.
const CONNECT_NOT_FOUND: &str = "AVXERR-TGW-0072";

/// A TGW Connect attachment.
///
/// Serializes to the attach/detach form; deserializes from
/// `get_tgw_connect_by_connection_name`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TgwConnect {
    #[serde(rename = "CID", skip_serializing_if = "String::is_empty", skip_deserializing)]
    pub cid: String,
    #[serde(skip_serializing_if = "String::is_empty", skip_deserializing)]
    pub action: String,
    pub tgw_name: String,
    pub connection_name: String,
    #[serde(rename(serialize = "transport_vpc_id", deserialize = "transport_attachment_id"))]
    pub transport_attachment_id: String,
    #[serde(skip_serializing)]
    pub transport_attachment_name: String,
    #[serde(skip_serializing)]
    pub transport_vpc_name: String,
    #[serde(rename(serialize = "security_domain_name", deserialize = "route_domain_name"))]
    pub security_domain_name: String,
    pub connect_attachment_id: String,
}

impl TgwConnect {
    #[must_use]
    pub fn new(
        tgw_name: impl Into<String>,
        connection_name: impl Into<String>,
        transport_attachment_id: impl Into<String>,
        security_domain_name: impl Into<String>,
    ) -> Self {
        Self {
            tgw_name: tgw_name.into(),
            connection_name: connection_name.into(),
            transport_attachment_id: transport_attachment_id.into(),
            security_domain_name: security_domain_name.into(),
            ..Self::default()
        }
    }

    /// Resource id in `<tgw_name>~~<connection_name>` form.
    #[must_use]
    pub fn id(&self) -> String {
        format!("{}~~{}", self.tgw_name, self.connection_name)
    }
}

impl SessionPayload for TgwConnect {
    fn set_session_token(&mut self, cid: &str) -> bool {
        self.cid = cid.to_string();
        true
    }
}

#[derive(Debug, Deserialize)]
struct TgwConnectResponse {
    #[serde(default)]
    results: TgwConnect,
}

impl ControllerClient {
    pub async fn attach_tgw_connect(&self, connect: &mut TgwConnect) -> Result<()> {
        connect.action = "attach_tgw_connect_to_tgw".to_string();
        connect.cid = self.cid();
        self.post_api("attach_tgw_connect_to_tgw", connect, BasicCheck)
            .await
    }

    pub async fn detach_tgw_connect(&self, connect: &mut TgwConnect) -> Result<()> {
        connect.action = "detach_tgw_connect_from_tgw".to_string();
        connect.cid = self.cid();
        self.post_api("detach_tgw_connect_from_tgw", connect, BasicCheck)
            .await
    }

    /// Fetch a connection; [`NotFound`](crate::error::ControllerError::NotFound)
    /// when the controller does not know it.
    pub async fn get_tgw_connect(&self, tgw_name: &str, connection_name: &str) -> Result<TgwConnect> {
        let params = self
            .form("get_tgw_connect_by_connection_name")
            .with("connection_name", connection_name)
            .with("tgw_name", tgw_name);
        let data: TgwConnectResponse = self
            .get_api(
                "get_tgw_connect_by_connection_name",
                &params,
                NotFoundCheck::new([CONNECT_NOT_FOUND]),
            )
            .await?;
        Ok(data.results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::CheckApiResponse;
    use crate::error::ControllerError;
    use serde_json::json;

    #[test]
    fn test_id() {
        let connect = TgwConnect::new("tgw1", "conn1", "tgw-attach-1", "Default_Domain");
        assert_eq!(connect.id(), "tgw1~~conn1");
    }

    #[test]
    fn test_form_uses_request_names() {
        let mut connect = TgwConnect::new("tgw1", "conn1", "tgw-attach-1", "Default_Domain");
        connect.set_session_token("abc");
        let value = serde_json::to_value(&connect).unwrap();
        assert_eq!(value["transport_vpc_id"], "tgw-attach-1");
        assert_eq!(value["security_domain_name"], "Default_Domain");
        assert_eq!(value["CID"], "abc");
        assert!(value.get("transport_vpc_name").is_none());
    }

    #[test]
    fn test_response_uses_reply_names() {
        let data: TgwConnectResponse = serde_json::from_value(json!({
            "return": true,
            "results": {
                "tgw_name": "tgw1",
                "connection_name": "conn1",
                "transport_attachment_id": "tgw-attach-1",
                "transport_vpc_name": "transit-vpc",
                "route_domain_name": "Default_Domain",
                "connect_attachment_id": "tgw-attach-2"
            }
        }))
        .unwrap();
        assert_eq!(data.results.security_domain_name, "Default_Domain");
        assert_eq!(data.results.transport_vpc_name, "transit-vpc");
    }

    #[test]
    fn test_not_found_reason() {
        let check = NotFoundCheck::new([CONNECT_NOT_FOUND]);
        let err = check
            .check(
                "get_tgw_connect_by_connection_name",
                "Get",
                "[AVXERR-TGW-0072] Connection conn1 not found",
                false,
            )
            .unwrap_err();
        assert!(matches!(err, ControllerError::NotFound));
    }
}
