// SPDX-License-Identifier: MIT OR Apache-2.0

//! Response envelopes returned by the controller.

use serde::{Deserialize, Deserializer};

/// Treat `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Generic view of a response: the success flag and the reason string.
///
/// Every JSON reply is first decoded into this shape so the executor can spot
/// an expired session before the caller's result type is involved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ApiEnvelope {
    #[serde(rename = "return", default, deserialize_with = "null_as_default")]
    pub ret: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reason: String,
}

/// Typed view of a response carrying call-specific `results`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(rename = "return", default, deserialize_with = "null_as_default")]
    pub ret: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reason: String,
    pub results: Option<T>,
}

/// Envelope variant returned by high-availability gateway creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HaCreateResponse {
    #[serde(rename = "return", default, deserialize_with = "null_as_default")]
    pub ret: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reason: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub results: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ha_gw_name: String,
}

/// Reply to the `login` action.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LoginResponse {
    #[serde(rename = "return", default, deserialize_with = "null_as_default")]
    pub ret: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub results: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reason: String,
    #[serde(rename = "CID", default, deserialize_with = "null_as_default")]
    pub cid: String,
}

/// Error body of the v2.5 REST surface.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default, deserialize_with = "null_as_default")]
    pub message: String,
}

/// Progress report of an asynchronous controller task.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AsyncTaskStatus {
    #[serde(default)]
    pub pos: i64,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub status: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub result: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_tolerates_missing_and_null_fields() {
        let env: ApiEnvelope = serde_json::from_str(r#"{"return": true}"#).unwrap();
        assert!(env.ret);
        assert!(env.reason.is_empty());

        let env: ApiEnvelope =
            serde_json::from_str(r#"{"return": false, "reason": null, "results": [1, 2]}"#)
                .unwrap();
        assert!(!env.ret);
        assert!(env.reason.is_empty());
    }

    #[test]
    fn test_typed_response_results() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Version {
            current_version: String,
        }

        let resp: ApiResponse<Version> = serde_json::from_str(
            r#"{"return": true, "results": {"current_version": "UserConnect-7.1.1794"}}"#,
        )
        .unwrap();
        assert_eq!(
            resp.results.unwrap().current_version,
            "UserConnect-7.1.1794"
        );

        let resp: ApiResponse<Version> =
            serde_json::from_str(r#"{"return": false, "reason": "nope"}"#).unwrap();
        assert!(resp.results.is_none());
        assert_eq!(resp.reason, "nope");
    }

    fn decode_results<T: serde::de::DeserializeOwned>(body: &str) -> Option<T> {
        serde_json::from_str::<ApiResponse<T>>(body).unwrap().results
    }

    #[test]
    fn test_results_decode_without_default_bound() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Proxy {
            instance_id: String,
        }

        let proxy: Option<Proxy> =
            decode_results(r#"{"return": true, "results": {"instance_id": "i-1"}}"#);
        assert_eq!(proxy.unwrap().instance_id, "i-1");

        let missing: Option<Proxy> = decode_results(r#"{"return": true}"#);
        assert!(missing.is_none());
        let null: Option<Proxy> = decode_results(r#"{"return": true, "results": null}"#);
        assert!(null.is_none());
    }

    #[test]
    fn test_ha_create_response() {
        let resp: HaCreateResponse = serde_json::from_str(
            r#"{"return": true, "results": "created", "ha_gw_name": "spoke-1-hagw"}"#,
        )
        .unwrap();
        assert_eq!(resp.ha_gw_name, "spoke-1-hagw");
    }

    #[test]
    fn test_login_response() {
        let resp: LoginResponse = serde_json::from_str(
            r#"{"return": true, "results": "User login:admin", "CID": "5f6e7d"}"#,
        )
        .unwrap();
        assert!(resp.ret);
        assert_eq!(resp.cid, "5f6e7d");
    }
}
