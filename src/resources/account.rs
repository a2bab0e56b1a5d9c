// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cloud access accounts.
//!
//! An access account holds the credentials the controller uses to manage a
//! cloud provider. The controller accepts them as form fields but lists them
//! back under different JSON names, so [`Account`] serializes and
//! deserializes with separate field names.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::{BasicCheck, FormParams, SessionPayload};
use crate::client::ControllerClient;
use crate::error::{ControllerError, Result};

/// Cloud type bitmask values used by the controller.
pub mod cloud_type {
    pub const AWS: u32 = 1;
    pub const GCP: u32 = 4;
    pub const AZURE: u32 = 8;
    pub const OCI: u32 = 16;
    pub const AZURE_GOV: u32 = 32;
    pub const AWS_GOV: u32 = 256;
    pub const AWS_CHINA: u32 = 1024;
    pub const AZURE_CHINA: u32 = 2048;
}

fn is_zero(v: &u32) -> bool {
    *v == 0
}

/// A cloud access account.
///
/// # Example
///
/// ```
/// use aviatrix_api_rs::resources::{cloud_type, Account};
///
/// let account = Account::builder("prod-aws", cloud_type::AWS)
///     .aws_account_number("123456789012")
///     .aws_iam(true)
///     .build();
/// assert_eq!(account.account_name, "prod-aws");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Account {
    #[serde(rename = "CID", skip_serializing_if = "String::is_empty", skip_deserializing)]
    pub cid: String,
    #[serde(skip_serializing_if = "String::is_empty", skip_deserializing)]
    pub action: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub account_name: String,
    #[serde(skip_serializing_if = "is_zero")]
    pub cloud_type: u32,
    #[serde(
        rename(serialize = "aws_account_number", deserialize = "account_number"),
        skip_serializing_if = "String::is_empty"
    )]
    pub aws_account_number: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub aws_iam: String,
    #[serde(
        rename(serialize = "aws_access_key", deserialize = "account_access_key"),
        skip_serializing_if = "String::is_empty"
    )]
    pub aws_access_key: String,
    #[serde(
        rename(serialize = "aws_secret_key", deserialize = "account_secret_access_key"),
        skip_serializing_if = "String::is_empty"
    )]
    pub aws_secret_key: String,
    #[serde(rename = "aws_role_arn", skip_serializing_if = "String::is_empty")]
    pub aws_role_app: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub aws_role_ec2: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub arm_subscription_id: String,
    #[serde(
        rename(serialize = "arm_application_endpoint", deserialize = "arm_ad_tenant_id"),
        skip_serializing_if = "String::is_empty"
    )]
    pub arm_application_endpoint: String,
    #[serde(
        rename(serialize = "arm_application_client_id", deserialize = "arm_ad_client_id"),
        skip_serializing_if = "String::is_empty"
    )]
    pub arm_application_client_id: String,
    #[serde(
        rename(
            serialize = "arm_application_client_secret",
            deserialize = "arm_ad_client_secret"
        ),
        skip_serializing_if = "String::is_empty"
    )]
    pub arm_application_client_secret: String,
    #[serde(
        rename(serialize = "gcloud_project_name", deserialize = "project"),
        skip_serializing_if = "String::is_empty"
    )]
    pub gcloud_project_name: String,
}

impl SessionPayload for Account {
    fn set_session_token(&mut self, cid: &str) -> bool {
        self.cid = cid.to_string();
        true
    }
}

impl Account {
    #[must_use]
    pub fn builder(account_name: impl Into<String>, cloud_type: u32) -> AccountBuilder {
        AccountBuilder {
            account: Account {
                account_name: account_name.into(),
                cloud_type,
                ..Account::default()
            },
        }
    }
}

/// Builder for `Account`.
#[derive(Debug, Clone, Default)]
pub struct AccountBuilder {
    account: Account,
}

impl AccountBuilder {
    #[must_use]
    pub fn aws_account_number(mut self, number: impl Into<String>) -> Self {
        self.account.aws_account_number = number.into();
        self
    }

    /// Use IAM roles instead of access keys.
    #[must_use]
    pub fn aws_iam(mut self, enabled: bool) -> Self {
        self.account.aws_iam = enabled.to_string();
        self
    }

    #[must_use]
    pub fn aws_access_keys(
        mut self,
        access_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        self.account.aws_access_key = access_key.into();
        self.account.aws_secret_key = secret_key.into();
        self
    }

    #[must_use]
    pub fn aws_roles(mut self, app: impl Into<String>, ec2: impl Into<String>) -> Self {
        self.account.aws_role_app = app.into();
        self.account.aws_role_ec2 = ec2.into();
        self
    }

    #[must_use]
    pub fn azure(
        mut self,
        subscription_id: impl Into<String>,
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.account.arm_subscription_id = subscription_id.into();
        self.account.arm_application_endpoint = tenant_id.into();
        self.account.arm_application_client_id = client_id.into();
        self.account.arm_application_client_secret = client_secret.into();
        self
    }

    #[must_use]
    pub fn gcloud_project_name(mut self, project: impl Into<String>) -> Self {
        self.account.gcloud_project_name = project.into();
        self
    }

    #[must_use]
    pub fn build(self) -> Account {
        self.account
    }
}

#[derive(Debug, Default, Deserialize)]
struct AccountListResults {
    #[serde(default)]
    account_list: Vec<Account>,
}

#[derive(Debug, Deserialize)]
struct AccountListResponse {
    #[serde(default)]
    results: AccountListResults,
}

/// Status of one account in the credential audit.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AccountAuditRecord {
    pub account_name: String,
    pub status: String,
    pub comment: String,
}

#[derive(Debug, Deserialize)]
struct AccountAuditResponse {
    #[serde(default)]
    results: Vec<AccountAuditRecord>,
}

impl ControllerClient {
    /// Create an access account (`setup_account_profile`).
    pub async fn create_account(&self, account: &mut Account) -> Result<()> {
        account.cid = self.cid();
        account.action = "setup_account_profile".to_string();
        self.post_api("setup_account_profile", account, BasicCheck)
            .await
    }

    /// Look up an access account by name.
    ///
    /// Returns [`ControllerError::NotFound`] when no account has that name.
    pub async fn get_account(&self, account_name: &str) -> Result<Account> {
        let params = self.form("list_accounts");
        let data: AccountListResponse = self.get_api("list_accounts", &params, BasicCheck).await?;

        match data
            .results
            .account_list
            .into_iter()
            .find(|a| a.account_name == account_name)
        {
            Some(account) => {
                info!(account_name, "found access account");
                Ok(account)
            }
            None => {
                warn!(account_name, "access account not found");
                Err(ControllerError::NotFound)
            }
        }
    }

    /// Update an access account (`edit_account_profile`).
    pub async fn update_account(&self, account: &mut Account) -> Result<()> {
        account.cid = self.cid();
        account.action = "edit_account_profile".to_string();
        self.post_api("edit_account_profile", account, BasicCheck)
            .await
    }

    /// Delete an access account (`delete_account_profile`).
    pub async fn delete_account(&self, account_name: &str) -> Result<()> {
        let mut form = self
            .form("delete_account_profile")
            .with("account_name", account_name);
        self.post_api("delete_account_profile", &mut form, BasicCheck)
            .await
    }

    /// Fail with the audit comment when `account_name` did not pass the
    /// controller's credential audit.
    pub async fn audit_account(&self, account_name: &str) -> Result<()> {
        let params: FormParams = self.form("get_account_audit_records");
        let data: AccountAuditResponse = self
            .get_api("get_account_audit_records", &params, BasicCheck)
            .await?;

        match data
            .results
            .into_iter()
            .find(|r| r.account_name == account_name && !r.status.contains("Pass"))
        {
            Some(record) => Err(ControllerError::Api(record.comment)),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_account_form_field_names() {
        let mut account = Account::builder("prod-aws", cloud_type::AWS)
            .aws_account_number("123456789012")
            .aws_access_keys("AKIA", "shh")
            .build();
        account.set_session_token("abc123");
        account.action = "setup_account_profile".to_string();

        let value = serde_json::to_value(&account).unwrap();
        assert_eq!(value["CID"], "abc123");
        assert_eq!(value["aws_account_number"], "123456789012");
        assert_eq!(value["aws_secret_key"], "shh");
        assert_eq!(value["cloud_type"], 1);
        assert!(value.get("arm_subscription_id").is_none());
    }

    #[test]
    fn test_account_list_field_names() {
        let data: AccountListResponse = serde_json::from_value(json!({
            "return": true,
            "results": {
                "account_list": [{
                    "account_name": "prod-aws",
                    "cloud_type": 1,
                    "account_number": "123456789012",
                    "aws_iam": "true",
                    "unknown_field": "ignored"
                }, {
                    "account_name": "azure",
                    "cloud_type": 8,
                    "arm_ad_tenant_id": "tenant"
                }]
            }
        }))
        .unwrap();

        let accounts = data.results.account_list;
        assert_eq!(accounts[0].aws_account_number, "123456789012");
        assert_eq!(accounts[0].aws_iam, "true");
        assert_eq!(accounts[1].arm_application_endpoint, "tenant");
        assert!(accounts[0].cid.is_empty());
    }

    #[test]
    fn test_audit_records() {
        let data: AccountAuditResponse = serde_json::from_value(json!({
            "return": true,
            "results": [
                {"account_name": "a", "status": "Pass", "comment": ""},
                {"account_name": "b", "status": "Fail", "comment": "role missing"}
            ]
        }))
        .unwrap();
        assert_eq!(data.results[1].comment, "role missing");
    }
}
