// SPDX-License-Identifier: MIT OR Apache-2.0

//! Example: log in with a profile and make a few calls
//!
//! Reads `~/.aviatrix/config` (or `AVIATRIX_CONFIG`) with the usual
//! environment overrides, then:
//! - prints the controller version
//! - lists the access accounts
//! - reports how many logins the session needed
//!
//! Set `RUST_LOG=aviatrix_api::http=debug` to watch session renewals.

use aviatrix_api_rs::api::{BasicCheck, FormParams};
use aviatrix_api_rs::config::ControllerConfig;
use aviatrix_api_rs::ControllerClient;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize)]
struct AccountName {
    account_name: String,
}

#[derive(Debug, Deserialize)]
struct AccountList {
    #[serde(default)]
    account_list: Vec<AccountName>,
}

#[derive(Debug, Deserialize)]
struct ListAccounts {
    results: AccountList,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = ControllerConfig::load_with_env()?;
    let client_config = config.client_config()?;
    println!("Connecting to {}...", client_config.controller_ip);

    let client = match ControllerClient::new(client_config).await {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to log in: {}", e);
            return Ok(());
        }
    };

    println!("\n--- Version ---");
    match client.get_version_info().await {
        Ok(info) => println!("Controller: {}", info.current),
        Err(e) => eprintln!("Failed to get version: {}", e),
    }

    println!("\n--- Accounts ---");
    let params: FormParams = client.form("list_accounts");
    match client
        .get_api::<ListAccounts>("list_accounts", &params, BasicCheck)
        .await
    {
        Ok(data) => {
            for account in &data.results.account_list {
                println!("  {}", account.account_name);
            }
        }
        Err(e) => eprintln!("Failed to list accounts: {}", e),
    }

    println!("\nLogins: {}", client.login_count());
    println!(
        "Session renewals: {}",
        client.metrics().session_renewals()
    );
    Ok(())
}
