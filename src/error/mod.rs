// SPDX-License-Identifier: MIT OR Apache-2.0

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("HTTP {action} failed: {source}")]
    Transport {
        action: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Json Decode {context} failed: {message}\n Body: {body}")]
    Decode {
        context: String,
        message: String,
        body: String,
    },

    /// The controller kept reporting an expired session after re-authenticating.
    #[error("{reason}")]
    SessionExpired { action: String, reason: String },

    #[error("login failed: {0}")]
    Auth(String),

    #[error("{0}")]
    Api(String),

    /// Sentinel used by response checks when the controller reports a missing object.
    #[error("ErrNotFound")]
    NotFound,

    #[error("request cancelled")]
    Cancelled,

    #[error("expected a file download for {0}, controller returned JSON")]
    UnexpectedJson(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ControllerError {
    pub(crate) fn transport(action: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Transport {
            action: action.into(),
            source,
        }
    }

    pub(crate) fn decode(
        context: impl Into<String>,
        err: &serde_json::Error,
        body: impl Into<String>,
    ) -> Self {
        Self::Decode {
            context: context.into(),
            message: err.to_string(),
            body: body.into(),
        }
    }

    /// Returns `true` for the not-found sentinel.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }
}

pub type Result<T> = std::result::Result<T, ControllerError>;
