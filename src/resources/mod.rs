// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed bindings for controller resources.
//!
//! Each binding is a thin layer over the calls in [`crate::client`]: it
//! fills in the action name and session token, picks a response check and
//! decodes the reply into a typed struct.

mod account;
mod app_domain;
mod edge_gateway;
mod private_mode;
mod remote_syslog;
mod tgw_connect;
mod version;

pub use account::{cloud_type, Account, AccountAuditRecord, AccountBuilder};
pub use app_domain::{AppDomain, MatchExpression};
pub use edge_gateway::{
    EdgeGateway, EdgeGatewayDetails, EdgeHaGateway, EdgeInterface, ZtpFileType,
};
pub use private_mode::PrivateModeConfig;
pub use remote_syslog::{RemoteSyslog, RemoteSyslogStatus};
pub use tgw_connect::TgwConnect;
pub use version::{ControllerVersion, VersionInfo};
