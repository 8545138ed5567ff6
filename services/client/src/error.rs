//! services/client/src/error.rs
//!
//! Defines the primary error type for the entire client service, and the
//! classification used when surfacing failures to the user.

use crate::config::ConfigError;
use guestgo_core::ports::PortError;
use serde::Serialize;

/// The primary error type for the `client` service.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Represents an error that occurred during configuration loading.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Represents an error that propagated up from one of the core service ports.
    #[error("Service Port Error: {0}")]
    Port(#[from] PortError),

    /// Represents an error from the underlying HTTP client.
    #[error("HTTP Error: {0}")]
    Http(#[from] reqwest::Error),

    /// Represents a standard Input/Output error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A catch-all for any other unexpected errors.
    #[error("An unexpected internal error occurred: {0}")]
    Internal(String),
}

/// How a user-surfaced failure is presented.
///
/// `Validation` failures are shown inline and never retried automatically;
/// `Provider` failures get a retry affordance; `State` failures get their own
/// message, distinct from validation ("no active code", "unrecognized code").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Provider,
    State,
}
