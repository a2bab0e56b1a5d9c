// SPDX-License-Identifier: MIT OR Apache-2.0

//! App domains on the v2.5 REST surface.
//!
//! A selector is an OR of AND-filters. On the wire each filter is a flat
//! string map where tags are spelled `tags.<key>`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::ControllerClient;
use crate::error::{ControllerError, Result};

const ENDPOINT: &str = "app-domains";
const TAG_PREFIX: &str = "tags.";

/// One AND-filter of an app domain selector. Empty fields are not sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchExpression {
    pub cidr: String,
    pub resource_type: String,
    pub resource_id: String,
    pub account_id: String,
    pub account_name: String,
    pub region: String,
    pub zone: String,
    pub tags: BTreeMap<String, String>,
}

impl MatchExpression {
    /// A filter matching a single CIDR.
    #[must_use]
    pub fn cidr(cidr: impl Into<String>) -> Self {
        Self {
            cidr: cidr.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    fn to_filter(&self) -> BTreeMap<String, String> {
        let mut filter = BTreeMap::new();
        for (key, value) in [
            ("type", &self.resource_type),
            ("cidr", &self.cidr),
            ("res_id", &self.resource_id),
            ("account_id", &self.account_id),
            ("account_name", &self.account_name),
            ("region", &self.region),
            ("zone", &self.zone),
        ] {
            if !value.is_empty() {
                filter.insert(key.to_string(), value.clone());
            }
        }
        for (key, value) in &self.tags {
            filter.insert(format!("{TAG_PREFIX}{key}"), value.clone());
        }
        filter
    }

    fn from_filter(mut filter: BTreeMap<String, String>) -> Self {
        let tags = filter
            .iter()
            .filter_map(|(k, v)| {
                k.strip_prefix(TAG_PREFIX)
                    .map(|tag| (tag.to_string(), v.clone()))
            })
            .collect();
        let mut take = |key: &str| filter.remove(key).unwrap_or_default();
        Self {
            cidr: take("cidr"),
            resource_type: take("type"),
            resource_id: take("res_id"),
            account_id: take("account_id"),
            account_name: take("account_name"),
            region: take("region"),
            zone: take("zone"),
            tags,
        }
    }
}

/// An app domain. `uuid` is assigned by the controller.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppDomain {
    pub name: String,
    pub uuid: String,
    pub selector: Vec<MatchExpression>,
}

impl AppDomain {
    #[must_use]
    pub fn new(name: impl Into<String>, selector: Vec<MatchExpression>) -> Self {
        Self {
            name: name.into(),
            uuid: String::new(),
            selector,
        }
    }

    fn to_wire(&self) -> AppDomainWire {
        AppDomainWire {
            uuid: String::new(),
            name: self.name.clone(),
            selector: SelectorWire {
                or: self
                    .selector
                    .iter()
                    .map(|e| AndWire { and: e.to_filter() })
                    .collect(),
            },
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct AndWire {
    #[serde(rename = "_and", default)]
    and: BTreeMap<String, String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SelectorWire {
    #[serde(rename = "_or", default)]
    or: Vec<AndWire>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct AppDomainWire {
    #[serde(default, skip_serializing)]
    uuid: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    selector: SelectorWire,
}

impl From<AppDomainWire> for AppDomain {
    fn from(wire: AppDomainWire) -> Self {
        Self {
            name: wire.name,
            uuid: wire.uuid,
            selector: wire
                .selector
                .or
                .into_iter()
                .map(|f| MatchExpression::from_filter(f.and))
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreatedResponse {
    #[serde(default)]
    uuid: String,
}

#[derive(Debug, Deserialize)]
struct AppDomainList {
    #[serde(default)]
    app_domains: Vec<AppDomainWire>,
}

impl ControllerClient {
    /// Create an app domain and return its uuid.
    pub async fn create_app_domain(&self, domain: &AppDomain) -> Result<String> {
        let body = domain.to_wire();
        debug!(name = %domain.name, filters = body.selector.or.len(), "creating app domain");
        let created: CreatedResponse = self.post_api_v25(ENDPOINT, &body).await?;
        Ok(created.uuid)
    }

    /// Fetch an app domain by uuid; [`ControllerError::NotFound`] when absent.
    pub async fn get_app_domain(&self, uuid: &str) -> Result<AppDomain> {
        let list: AppDomainList = self.get_api_v25(ENDPOINT).await?;
        list.app_domains
            .into_iter()
            .find(|d| d.uuid == uuid)
            .map(AppDomain::from)
            .ok_or(ControllerError::NotFound)
    }

    pub async fn update_app_domain(&self, uuid: &str, domain: &AppDomain) -> Result<()> {
        let _: serde_json::Value = self
            .put_api_v25(&format!("{ENDPOINT}/{uuid}"), &domain.to_wire())
            .await?;
        Ok(())
    }

    pub async fn delete_app_domain(&self, uuid: &str) -> Result<()> {
        self.delete_api_v25(&format!("{ENDPOINT}/{uuid}")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_shape() {
        let domain = AppDomain::new(
            "web",
            vec![
                MatchExpression::cidr("10.0.0.0/16"),
                MatchExpression {
                    resource_type: "vm".to_string(),
                    region: "us-east-1".to_string(),
                    ..MatchExpression::default()
                }
                .with_tag("env", "prod"),
            ],
        );

        let value = serde_json::to_value(domain.to_wire()).unwrap();
        assert_eq!(
            value,
            json!({
                "name": "web",
                "selector": {"_or": [
                    {"_and": {"cidr": "10.0.0.0/16"}},
                    {"_and": {"type": "vm", "region": "us-east-1", "tags.env": "prod"}}
                ]}
            })
        );
    }

    #[test]
    fn test_list_decoding_splits_tags() {
        let list: AppDomainList = serde_json::from_value(json!({
            "app_domains": [{
                "uuid": "u-1",
                "name": "web",
                "selector": {"_or": [
                    {"_and": {"type": "vm", "tags.env": "prod", "tags.team": "net"}}
                ]}
            }]
        }))
        .unwrap();

        let domain: AppDomain = list.app_domains.into_iter().next().unwrap().into();
        assert_eq!(domain.uuid, "u-1");
        let filter = &domain.selector[0];
        assert_eq!(filter.resource_type, "vm");
        assert_eq!(filter.tags.len(), 2);
        assert_eq!(filter.tags["team"], "net");
        assert!(filter.cidr.is_empty());
    }
}
