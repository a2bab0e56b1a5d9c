// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration management for controller clients
//!
//! Connection details live in a YAML profile file so credentials stay out of
//! code.
//!
//! # Environment Variables
//!
//! - `AVIATRIX_CONFIG` - Path to the profile file (default: `~/.aviatrix/config`)
//! - `AVIATRIX_PROFILE` - Override the active profile
//! - `AVIATRIX_CONTROLLER_IP`, `AVIATRIX_USERNAME`, `AVIATRIX_PASSWORD` -
//!   Override the connection details of the active profile
//!
//! # Example
//!
//! ```no_run
//! use aviatrix_api_rs::config::ControllerConfig;
//! use aviatrix_api_rs::ControllerClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ControllerConfig::load_with_env()?;
//! let client = ControllerClient::new(config.client_config()?).await?;
//! # Ok(())
//! # }
//! ```

mod controllerconfig;

pub use controllerconfig::{
    ControllerConfig, ControllerProfile, ENV_AVIATRIX_CONFIG, ENV_AVIATRIX_CONTROLLER_IP,
    ENV_AVIATRIX_PASSWORD, ENV_AVIATRIX_PROFILE, ENV_AVIATRIX_USERNAME,
};
