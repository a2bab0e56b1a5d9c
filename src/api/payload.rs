// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request payloads that carry the session token.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Name of the session-token field in form, query and JSON payloads.
pub const SESSION_TOKEN_FIELD: &str = "CID";

/// A request payload whose session token can be refreshed in place.
///
/// When the controller reports an expired session the executor logs in again
/// and calls [`set_session_token`](SessionPayload::set_session_token) before
/// resending. Payloads without a token field keep the default, which leaves
/// the body untouched.
pub trait SessionPayload: Serialize + Send + Sync {
    /// Replace the session token. Returns `false` when there is no field to update.
    fn set_session_token(&mut self, _cid: &str) -> bool {
        false
    }
}

impl SessionPayload for BTreeMap<String, String> {
    fn set_session_token(&mut self, cid: &str) -> bool {
        self.insert(SESSION_TOKEN_FIELD.to_string(), cid.to_string());
        true
    }
}

impl SessionPayload for HashMap<String, String> {
    fn set_session_token(&mut self, cid: &str) -> bool {
        self.insert(SESSION_TOKEN_FIELD.to_string(), cid.to_string());
        true
    }
}

impl SessionPayload for serde_json::Map<String, serde_json::Value> {
    fn set_session_token(&mut self, cid: &str) -> bool {
        self.insert(
            SESSION_TOKEN_FIELD.to_string(),
            serde_json::Value::String(cid.to_string()),
        );
        true
    }
}

impl SessionPayload for serde_json::Value {
    fn set_session_token(&mut self, cid: &str) -> bool {
        match self {
            serde_json::Value::Object(map) => map.set_session_token(cid),
            _ => false,
        }
    }
}

/// Ordered form parameters for ad-hoc actions.
///
/// ```
/// use aviatrix_api_rs::api::FormParams;
///
/// let form = FormParams::action("list_accounts").with("account_name", "prod");
/// assert_eq!(form.get("action"), Some("list_accounts"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FormParams(BTreeMap<String, String>);

impl FormParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a form for the given controller action.
    #[must_use]
    pub fn action(action: impl Into<String>) -> Self {
        Self::new().with("action", action)
    }

    /// Add or replace a parameter.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// The `action` parameter, or an empty string.
    #[must_use]
    pub fn action_name(&self) -> &str {
        self.get("action").unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl SessionPayload for FormParams {
    fn set_session_token(&mut self, cid: &str) -> bool {
        self.0.set_session_token(cid)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Serialize)]
    struct WithCid {
        #[serde(rename = "CID")]
        cid: String,
        action: String,
    }

    impl SessionPayload for WithCid {
        fn set_session_token(&mut self, cid: &str) -> bool {
            self.cid = cid.to_string();
            true
        }
    }

    #[derive(Serialize)]
    struct WithoutCid {
        name: String,
    }

    impl SessionPayload for WithoutCid {}

    #[test]
    fn test_map_payload_gets_token() {
        let mut form: BTreeMap<String, String> = BTreeMap::new();
        assert!(form.set_session_token("def456"));
        assert_eq!(form.get("CID").map(String::as_str), Some("def456"));
    }

    #[test]
    fn test_form_params_replace_token() {
        let mut form = FormParams::action("list_accounts").with("CID", "abc123");
        assert!(form.set_session_token("def456"));
        assert_eq!(form.get("CID"), Some("def456"));
        assert_eq!(form.action_name(), "list_accounts");
    }

    #[test]
    fn test_record_payload_gets_token() {
        let mut record = WithCid {
            cid: "abc123".to_string(),
            action: "create".to_string(),
        };
        assert!(record.set_session_token("def456"));
        assert_eq!(record.cid, "def456");
        assert_eq!(record.action, "create");
    }

    #[test]
    fn test_record_without_token_field_is_untouched() {
        let mut record = WithoutCid {
            name: "gw1".to_string(),
        };
        assert!(!record.set_session_token("def456"));
        assert_eq!(record.name, "gw1");
    }

    #[test]
    fn test_json_value_payload() {
        let mut body = json!({"action": "enable", "CID": "abc123"});
        assert!(body.set_session_token("def456"));
        assert_eq!(body["CID"], "def456");

        let mut list = json!(["not", "an", "object"]);
        assert!(!list.set_session_token("def456"));
    }
}
