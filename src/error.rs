//! Error taxonomy for admin dashboard calls.

use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdminError {
    /// Network-level failure (unreachable host, timeout, bad URL).
    #[error("{0}")]
    Transport(String),

    /// The admin API answered with a non-2xx status.
    #[error("{message} (HTTP {status})")]
    Http { status: u16, message: String },

    /// The response body did not have a recognized shape.
    #[error("Unrecognized response from admin dashboard: {0}")]
    Format(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    /// A tagged `status: false` response.
    #[error("{message}")]
    Rejected {
        message: String,
        errors: BTreeMap<String, Vec<String>>,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl AdminError {
    /// Network and HTTP failures both count as transport errors.
    pub fn is_transport(&self) -> bool {
        matches!(self, AdminError::Transport(_) | AdminError::Http { .. })
    }

    pub fn is_format(&self) -> bool {
        matches!(self, AdminError::Format(_))
    }
}
