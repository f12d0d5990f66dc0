//! Error types
//!
//! One taxonomy for everything the wizard engine can surface to an operator.
//! Validation and connectivity problems are shown inline at the step that
//! triggered them; stale-backend and fatal-sequence errors abort an install run.

use std::time::Duration;

use thiserror::Error;

use crate::backend::BackendError;
use crate::remote::ConnectivityIssue;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, DeckhandError>;

/// Top-level error type
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DeckhandError {
    /// Required operator input is missing; rejected before any backend call
    #[error("{0}")]
    Validation(String),

    /// Connection or tunnel failure, already rewritten for the operator
    #[error("{0}")]
    Connectivity(ConnectivityIssue),

    /// The connectivity check did not settle within its bound
    #[error("Connection timed out after {}s. Check the IP address and network connectivity.", .0.as_secs())]
    Timeout(Duration),

    /// Tunnel verification answered with a definite "no"
    #[error(
        "Remote backend speaks an older tunnel protocol. Restart the remote agent service and try again."
    )]
    StaleBackend,

    /// A single skill failed to install; the run continues
    #[error("Failed to install skill {skill}: {message}")]
    PartialProvisioning { skill: String, message: String },

    /// Any other failure during an install run
    #[error("{phase} failed: {message}")]
    FatalSequence { phase: String, message: String },

    /// Raw backend failure that has not been classified yet
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// Wizard state or persisted configuration could not be read
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Stable error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Validation,
    Connectivity,
    Timeout,
    StaleBackend,
    PartialProvisioning,
    FatalSequence,
    Backend,
    Config,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Connectivity => "connectivity",
            Self::Timeout => "timeout",
            Self::StaleBackend => "stale_backend",
            Self::PartialProvisioning => "partial_provisioning",
            Self::FatalSequence => "fatal_sequence",
            Self::Backend => "backend",
            Self::Config => "config",
        }
    }

    /// Errors that abort an install run and require a fresh attempt
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::StaleBackend | Self::FatalSequence | Self::Backend)
    }

    /// Errors handled at the triggering step with an auto-expiring notice
    pub fn shows_inline(&self) -> bool {
        matches!(self, Self::Validation | Self::Connectivity | Self::Timeout)
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl DeckhandError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn fatal(phase: impl Into<String>, message: impl Into<String>) -> Self {
        Self::FatalSequence {
            phase: phase.into(),
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(_) => ErrorCode::Validation,
            Self::Connectivity(_) => ErrorCode::Connectivity,
            Self::Timeout(_) => ErrorCode::Timeout,
            Self::StaleBackend => ErrorCode::StaleBackend,
            Self::PartialProvisioning { .. } => ErrorCode::PartialProvisioning,
            Self::FatalSequence { .. } => ErrorCode::FatalSequence,
            Self::Backend(_) => ErrorCode::Backend,
            Self::Config(_) => ErrorCode::Config,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_vs_fatal_codes() {
        assert!(DeckhandError::validation("x").code().shows_inline());
        assert!(DeckhandError::Timeout(Duration::from_secs(15)).code().shows_inline());
        assert!(!DeckhandError::StaleBackend.code().shows_inline());
        assert!(DeckhandError::StaleBackend.code().is_fatal());
        assert!(DeckhandError::fatal("Start service", "boom").code().is_fatal());

        let partial = DeckhandError::PartialProvisioning {
            skill: "github".to_string(),
            message: "404".to_string(),
        };
        assert!(!partial.code().is_fatal());
        assert!(!partial.code().shows_inline());
    }

    #[test]
    fn test_error_display() {
        let err = DeckhandError::Timeout(Duration::from_secs(15));
        assert!(err.to_string().starts_with("Connection timed out after 15s"));

        let err = DeckhandError::fatal("Apply configuration", "disk full");
        assert_eq!(err.to_string(), "Apply configuration failed: disk full");

        let err = DeckhandError::PartialProvisioning {
            skill: "slack".to_string(),
            message: "not found".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to install skill slack: not found");
    }

    #[test]
    fn test_backend_error_converts() {
        let err: DeckhandError = BackendError::new("ssh exited 255").into();
        assert_eq!(err.code(), ErrorCode::Backend);
        assert_eq!(err.to_string(), "ssh exited 255");
        assert_eq!(ErrorCode::Backend.to_string(), "backend");
    }
}
