// SPDX-License-Identifier: MIT OR Apache-2.0

//! Async client for the Aviatrix controller API.
//!
//! Calls go through a session-aware executor: when the controller reports an
//! expired session token, the client logs in again, rewrites the token in the
//! request and resends it.
//!
//! ```no_run
//! use aviatrix_api_rs::{ControllerClient, ControllerClientConfig};
//!
//! # async fn run() -> aviatrix_api_rs::error::Result<()> {
//! let config = ControllerClientConfig::builder("10.1.0.5")
//!     .credentials("admin", "secret")
//!     .build();
//! let client = ControllerClient::new(config).await?;
//! let account = client.get_account("prod-aws").await?;
//! println!("{}", account.account_name);
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod error;
pub mod resources;
pub mod runtime;
pub mod testkit;

pub use api::{BasicCheck, CheckApiResponse, FormParams, SessionPayload};
pub use client::{ControllerClient, ControllerClientConfig, ControllerEndpoints};
pub use config::{ControllerConfig, ControllerProfile};
pub use error::ControllerError;
