//! Error types for MeetSpace
//!
//! This module defines all error types used throughout the client,
//! using `thiserror` for ergonomic error handling.
//!
//! The session manager distinguishes three families of failure:
//!
//! - user-correctable login/registration failures
//!   ([`MeetspaceError::InvalidCredentials`]), shown inline;
//! - session-ending failures ([`MeetspaceError::RefreshRejected`],
//!   [`MeetspaceError::NoRefreshAvailable`],
//!   [`MeetspaceError::AuthorizationFailure`]), which route to login;
//! - everything else, normalized into [`MeetspaceError::Api`].

use thiserror::Error;

/// Main error type for MeetSpace operations
#[derive(Error, Debug)]
pub enum MeetspaceError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Login or registration was rejected by the server
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// The refresh endpoint declined to issue a new access credential
    #[error("Refresh rejected: {0}")]
    RefreshRejected(String),

    /// No refresh credential is available to renew the session
    #[error("No refresh credential available")]
    NoRefreshAvailable,

    /// A protected call was still unauthorized after re-authentication
    #[error("Authorization failure: {0}")]
    AuthorizationFailure(String),

    /// Normalized network or server error
    ///
    /// `message` is the first human-readable string found in the error
    /// payload, falling back to the transport-level message.
    #[error("API error{}: {message}", status.map(|s| format!(" ({})", s)).unwrap_or_default())]
    Api {
        /// Human-readable message
        message: String,
        /// HTTP status, absent for transport failures
        status: Option<u16>,
        /// Raw error payload as returned by the server
        payload: Option<serde_json::Value>,
    },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Keyring/credential storage errors
    #[error("Keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    /// Credential storage errors (file-backed store, lock poisoning)
    #[error("Storage error: {0}")]
    Storage(String),
}

impl MeetspaceError {
    /// Returns `true` for errors that mean the session is gone and the user
    /// has to log in again.
    pub fn ends_session(&self) -> bool {
        matches!(
            self,
            MeetspaceError::RefreshRejected(_)
                | MeetspaceError::NoRefreshAvailable
                | MeetspaceError::AuthorizationFailure(_)
        )
    }

    /// HTTP status attached to the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            MeetspaceError::Api { status, .. } => *status,
            MeetspaceError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Result type alias for MeetSpace operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type.
/// The root cause is always a [`MeetspaceError`]; use
/// `err.downcast_ref::<MeetspaceError>()` to inspect it.
pub type Result<T> = anyhow::Result<T>;
