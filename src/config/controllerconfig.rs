// SPDX-License-Identifier: MIT OR Apache-2.0

//! Controller profile file parser
//!
//! The profile file (typically `~/.aviatrix/config`) holds connection details
//! for one or more controllers:
//!
//! ```yaml
//! profile: prod
//! profiles:
//!   prod:
//!     controller_ip: 10.1.0.5
//!     username: admin
//!     password: secret
//!   lab:
//!     controller_ip: 192.168.10.4
//!     username: admin
//!     verify_tls: true
//!     request_timeout_secs: 120
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::client::ControllerClientConfig;
use crate::error::{ControllerError, Result};

/// Path of the profile file.
pub const ENV_AVIATRIX_CONFIG: &str = "AVIATRIX_CONFIG";
/// Name of the profile to use instead of the file's active one.
pub const ENV_AVIATRIX_PROFILE: &str = "AVIATRIX_PROFILE";
pub const ENV_AVIATRIX_CONTROLLER_IP: &str = "AVIATRIX_CONTROLLER_IP";
pub const ENV_AVIATRIX_USERNAME: &str = "AVIATRIX_USERNAME";
pub const ENV_AVIATRIX_PASSWORD: &str = "AVIATRIX_PASSWORD";

/// The whole profile file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ControllerConfig {
    /// The currently active profile name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,

    #[serde(default)]
    pub profiles: HashMap<String, ControllerProfile>,
}

/// Connection details for a single controller.
#[derive(Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ControllerProfile {
    pub controller_ip: String,

    #[serde(default)]
    pub username: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,

    /// Verify the controller certificate. Off by default.
    #[serde(default)]
    pub verify_tls: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

impl std::fmt::Debug for ControllerProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControllerProfile")
            .field("controller_ip", &self.controller_ip)
            .field("username", &self.username)
            .field("verify_tls", &self.verify_tls)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .finish_non_exhaustive()
    }
}

impl ControllerConfig {
    /// Load configuration from the default location (~/.aviatrix/config)
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined or the
    /// file cannot be read or parsed.
    #[allow(clippy::result_large_err)]
    pub fn load_default() -> Result<Self> {
        let config_path = Self::default_path()?;
        Self::load_from_path(&config_path)
    }

    /// Load the file named by `AVIATRIX_CONFIG` (or the default path) and
    /// apply the environment overrides.
    ///
    /// A missing file is not an error when the environment names a controller.
    #[allow(clippy::result_large_err)]
    pub fn load_with_env() -> Result<Self> {
        let path = Self::config_path()?;
        let mut config = if path.exists() {
            Self::load_from_path(&path)?
        } else {
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    #[allow(clippy::result_large_err)]
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            ControllerError::Config(format!(
                "Failed to read config file {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    #[allow(clippy::result_large_err)]
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| ControllerError::Config(format!("Failed to parse config YAML: {}", e)))
    }

    #[allow(clippy::result_large_err)]
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or_else(|| {
            ControllerError::Config("Could not determine home directory".to_string())
        })?;

        Ok(home.join(".aviatrix").join("config"))
    }

    /// Get the path to the config file, respecting `AVIATRIX_CONFIG`
    #[allow(clippy::result_large_err)]
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(env_path) = std::env::var(ENV_AVIATRIX_CONFIG) {
            Ok(PathBuf::from(env_path))
        } else {
            Self::default_path()
        }
    }

    /// Apply overrides read through `lookup`.
    ///
    /// `AVIATRIX_PROFILE` selects the profile. The credential variables then
    /// patch that profile, creating it when it does not exist yet.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(profile) = lookup(ENV_AVIATRIX_PROFILE).filter(|p| !p.is_empty()) {
            self.profile = Some(profile);
        }

        let ip = lookup(ENV_AVIATRIX_CONTROLLER_IP).filter(|v| !v.is_empty());
        let username = lookup(ENV_AVIATRIX_USERNAME).filter(|v| !v.is_empty());
        let password = lookup(ENV_AVIATRIX_PASSWORD).filter(|v| !v.is_empty());
        if ip.is_none() && username.is_none() && password.is_none() {
            return;
        }

        let name = self
            .profile
            .get_or_insert_with(|| "default".to_string())
            .clone();
        let profile = self.profiles.entry(name).or_default();
        if let Some(ip) = ip {
            profile.controller_ip = ip;
        }
        if let Some(username) = username {
            profile.username = username;
        }
        if let Some(password) = password {
            profile.password = password;
        }
    }

    /// Returns `None` if no active profile is set or if it doesn't exist
    pub fn active_profile(&self) -> Option<&ControllerProfile> {
        self.profile
            .as_ref()
            .and_then(|name| self.profiles.get(name))
    }

    pub fn get_profile(&self, name: &str) -> Option<&ControllerProfile> {
        self.profiles.get(name)
    }

    pub fn profile_names(&self) -> Vec<&String> {
        self.profiles.keys().collect()
    }

    /// Client configuration for the active profile.
    #[allow(clippy::result_large_err)]
    pub fn client_config(&self) -> Result<ControllerClientConfig> {
        let profile = self
            .active_profile()
            .ok_or_else(|| ControllerError::Config("No active controller profile".to_string()))?;
        Ok(profile.client_config())
    }
}

impl ControllerProfile {
    #[must_use]
    pub fn client_config(&self) -> ControllerClientConfig {
        let mut builder = ControllerClientConfig::builder(&self.controller_ip)
            .credentials(&self.username, &self.password);
        if self.verify_tls {
            builder = builder.verify_tls();
        }
        if let Some(secs) = self.request_timeout_secs {
            builder = builder.request_timeout(Duration::from_secs(secs));
        }
        builder.build()
    }
}

impl From<&ControllerProfile> for ControllerClientConfig {
    fn from(profile: &ControllerProfile) -> Self {
        profile.client_config()
    }
}
