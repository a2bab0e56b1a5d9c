// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixture for tests against a live controller.

use std::env;

use crate::client::ControllerClient;
use crate::config::ControllerConfig;

/// Set to run tests against the controller named by the active profile.
pub const ENV_AVIATRIX_DEV_TESTS: &str = "AVIATRIX_DEV_TESTS";

pub struct LiveController {
    pub profile: String,
    pub controller_ip: String,
    pub client: ControllerClient,
}

impl LiveController {
    /// Logs in to the controller of the active profile.
    /// SKIPS if `AVIATRIX_DEV_TESTS` is not set.
    pub async fn connect() -> Option<Self> {
        if env::var(ENV_AVIATRIX_DEV_TESTS).is_err() {
            println!("Skipping integration test: {ENV_AVIATRIX_DEV_TESTS} not set");
            return None;
        }

        let config = match ControllerConfig::load_with_env() {
            Ok(c) => c,
            Err(e) => {
                eprintln!("no usable controller profile: {e}");
                return None;
            }
        };
        let profile = config.profile.clone().unwrap_or_else(|| "default".to_string());
        let client_config = match config.client_config() {
            Ok(c) => c,
            Err(e) => {
                eprintln!("profile '{profile}' is incomplete: {e}");
                return None;
            }
        };

        println!("Logging in to controller {} ...", client_config.controller_ip);
        let controller_ip = client_config.controller_ip.clone();
        match ControllerClient::new(client_config).await {
            Ok(client) => Some(Self {
                profile,
                controller_ip,
                client,
            }),
            Err(e) => panic!("Failed to log in to {controller_ip}: {e}"),
        }
    }
}
