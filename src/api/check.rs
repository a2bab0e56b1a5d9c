// SPDX-License-Identifier: MIT OR Apache-2.0

//! Response checks.
//!
//! Controller actions disagree on which failures matter: disabling something
//! that is already disabled is fine, reading a deleted object should surface
//! as [`ControllerError::NotFound`]. Each call therefore supplies a
//! [`CheckApiResponse`] that turns `(action, method, reason, return)` into
//! the final verdict.

use crate::error::{ControllerError, Result};

/// Decides whether a controller reply is acceptable.
pub trait CheckApiResponse: Send + Sync {
    /// Inspect a reply. `Ok(())` accepts it, an error is handed to the caller verbatim.
    fn check(&self, action: &str, method: &str, reason: &str, ret: bool) -> Result<()>;
}

impl<F> CheckApiResponse for F
where
    F: Fn(&str, &str, &str, bool) -> Result<()> + Send + Sync,
{
    fn check(&self, action: &str, method: &str, reason: &str, ret: bool) -> Result<()> {
        self(action, method, reason, ret)
    }
}

fn rest_failure(action: &str, method: &str, reason: &str) -> ControllerError {
    ControllerError::Api(format!("rest API {action} {method} failed: {reason}"))
}

/// Only verifies that `return` was set.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicCheck;

impl CheckApiResponse for BasicCheck {
    fn check(&self, action: &str, method: &str, reason: &str, ret: bool) -> Result<()> {
        if !ret {
            return Err(rest_failure(action, method, reason));
        }
        Ok(())
    }
}

/// Maps reasons containing any of the given patterns to [`ControllerError::NotFound`].
#[derive(Debug, Clone)]
pub struct NotFoundCheck {
    patterns: Vec<String>,
}

impl NotFoundCheck {
    #[must_use]
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }

    /// The controller's usual phrasing for a missing object.
    #[must_use]
    pub fn does_not_exist() -> Self {
        Self::new(["does not exist"])
    }
}

impl CheckApiResponse for NotFoundCheck {
    fn check(&self, action: &str, method: &str, reason: &str, ret: bool) -> Result<()> {
        if ret {
            return Ok(());
        }
        if self.patterns.iter().any(|p| reason.contains(p.as_str())) {
            return Err(ControllerError::NotFound);
        }
        Err(rest_failure(action, method, reason))
    }
}

/// Accepts failures whose reason contains any of the given patterns.
///
/// Used for idempotent toggles, e.g. `"already enabled"`.
#[derive(Debug, Clone)]
pub struct IgnoreCheck {
    patterns: Vec<String>,
}

impl IgnoreCheck {
    #[must_use]
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }
}

impl CheckApiResponse for IgnoreCheck {
    fn check(&self, action: &str, method: &str, reason: &str, ret: bool) -> Result<()> {
        if ret || self.patterns.iter().any(|p| reason.contains(p.as_str())) {
            return Ok(());
        }
        Err(rest_failure(action, method, reason))
    }
}
