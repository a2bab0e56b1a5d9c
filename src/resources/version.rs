// SPDX-License-Identifier: MIT OR Apache-2.0

//! Controller software version.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::api::BasicCheck;
use crate::client::ControllerClient;
use crate::error::{ControllerError, Result};

/// A parsed controller release, e.g. `UserConnect-6.5.123` is 6.5 build 123.
///
/// ```
/// use aviatrix_api_rs::resources::ControllerVersion;
///
/// let version: ControllerVersion = "UserConnect-6.5.123".parse().unwrap();
/// assert_eq!((version.major, version.minor, version.build), (6, 5, 123));
/// assert_eq!(version.to_string(), "6.5.123");
/// assert_eq!(version.short(), "6.5");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ControllerVersion {
    pub major: u64,
    pub minor: u64,
    pub build: u64,
}

impl ControllerVersion {
    #[must_use]
    pub fn new(major: u64, minor: u64, build: u64) -> Self {
        Self {
            major,
            minor,
            build,
        }
    }

    /// `major.minor` without the build number.
    #[must_use]
    pub fn short(&self) -> String {
        format!("{}.{}", self.major, self.minor)
    }
}

impl fmt::Display for ControllerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.build)
    }
}

impl FromStr for ControllerVersion {
    type Err = ControllerError;

    fn from_str(s: &str) -> Result<Self> {
        let version = s.trim().trim_start_matches("UserConnect-");
        if version.is_empty() {
            return Err(ControllerError::Validation(
                "unable to parse version information since it is empty".to_string(),
            ));
        }
        let invalid =
            || ControllerError::Validation(format!("unable to parse version information: {s}"));

        let mut parts = version.split('.');
        let major = parts
            .next()
            .and_then(|p| p.parse().ok())
            .ok_or_else(invalid)?;
        // Pre-release minors look like `2-rc1`.
        let minor = parts
            .next()
            .and_then(|p| p.split('-').next())
            .and_then(|p| p.parse().ok())
            .ok_or_else(invalid)?;
        let build = match parts.next() {
            Some(p) => p.parse().map_err(|_| invalid())?,
            None => 0,
        };

        Ok(Self {
            major,
            minor,
            build,
        })
    }
}

/// Current and previous release of the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionInfo {
    pub current: ControllerVersion,
    pub previous: Option<ControllerVersion>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct VersionInfoResults {
    current_version: String,
    previous_version: String,
    latest_version: String,
}

#[derive(Debug, Deserialize)]
struct VersionInfoResponse {
    #[serde(default)]
    results: VersionInfoResults,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ImageVersionResults {
    image_version: String,
}

#[derive(Debug, Deserialize)]
struct ImageVersionResponse {
    #[serde(default)]
    results: ImageVersionResults,
}

impl ControllerClient {
    /// The running and previous releases (`list_version_info`).
    pub async fn get_version_info(&self) -> Result<VersionInfo> {
        let params = self.form("list_version_info");
        let data: VersionInfoResponse = self
            .get_api("list_version_info", &params, BasicCheck)
            .await?;

        let current = data.results.current_version.parse()?;
        let previous = match data.results.previous_version.as_str() {
            "" => None,
            v => Some(v.parse()?),
        };
        Ok(VersionInfo { current, previous })
    }

    /// The newest release available to this controller.
    pub async fn get_latest_version(&self) -> Result<ControllerVersion> {
        let params = self
            .form("list_version_info")
            .with("latest_version", "true");
        let data: VersionInfoResponse = self
            .get_api("list_version_info", &params, BasicCheck)
            .await?;
        data.results.latest_version.parse()
    }

    /// Gateway image matching a software release on a cloud type.
    pub async fn get_compatible_image_version(
        &self,
        cloud_type: u32,
        software_version: &str,
    ) -> Result<String> {
        let params = self
            .form("get_compatible_image_version")
            .with("software_version", software_version)
            .with("cloud_type", cloud_type.to_string());
        let data: ImageVersionResponse = self
            .get_api("get_compatible_image_version", &params, BasicCheck)
            .await?;
        Ok(data.results.image_version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_version() {
        let v: ControllerVersion = "UserConnect-6.5.123".parse().unwrap();
        assert_eq!(v, ControllerVersion::new(6, 5, 123));
    }

    #[test]
    fn test_parse_without_prefix_or_build() {
        let v: ControllerVersion = "7.1".parse().unwrap();
        assert_eq!(v, ControllerVersion::new(7, 1, 0));
    }

    #[test]
    fn test_parse_prerelease_minor() {
        let v: ControllerVersion = "6.2-rc1".parse().unwrap();
        assert_eq!(v.minor, 2);
    }

    #[test]
    fn test_parse_errors() {
        assert!("".parse::<ControllerVersion>().is_err());
        assert!("UserConnect-".parse::<ControllerVersion>().is_err());
        assert!("6".parse::<ControllerVersion>().is_err());
        assert!("6.x.1".parse::<ControllerVersion>().is_err());
        assert!("6.5.b".parse::<ControllerVersion>().is_err());
    }

    #[test]
    fn test_ordering() {
        let old: ControllerVersion = "6.5.123".parse().unwrap();
        let new: ControllerVersion = "6.10.1".parse().unwrap();
        assert!(old < new);
    }
}
