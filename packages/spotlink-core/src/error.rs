//! Centralized error types for the Spotlink core library.
//!
//! This module provides a unified error handling system that:
//! - Defines structured error types using `thiserror`
//! - Maps every error to a stable, machine-readable code
//! - Folds the per-concern errors into [`PlayerError`]

use thiserror::Error;

use crate::config::ConfigError;
use crate::lifecycle::LifecycleState;
use crate::native::NativeError;
use crate::token::TokenStoreError;
use crate::uri::UriError;
use crate::web_api::WebApiError;

/// Trait for error types that provide machine-readable error codes.
///
/// Implement this trait to provide consistent error codes across different
/// error conversion paths.
pub trait ErrorCode {
    /// Returns a machine-readable error code.
    fn code(&self) -> &'static str;
}

impl ErrorCode for WebApiError {
    fn code(&self) -> &'static str {
        match self {
            Self::Http(_) => "http_request_failed",
            Self::Status(_, _) => "http_error_status",
            Self::InvalidUrl(_) => "invalid_url",
        }
    }
}

impl ErrorCode for TokenStoreError {
    fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "token_store_io",
            Self::Serialize(_) => "token_store_serialize",
        }
    }
}

impl ErrorCode for ConfigError {
    fn code(&self) -> &'static str {
        match self {
            Self::Read { .. } => "config_read_failed",
            Self::Parse { .. } => "config_parse_failed",
        }
    }
}

/// Library-wide error type for player operations.
#[derive(Debug, Error)]
pub enum PlayerError {
    /// Missing or invalid configuration. Returned before the collaborator is touched.
    #[error("{0}")]
    Configuration(String),

    /// A gated operation was called outside the `Ready` state.
    #[error("Cannot call method {method} before player has initialized")]
    NotInitialized {
        method: &'static str,
        state: LifecycleState,
    },

    /// The collaborator rejected construction.
    #[error("Player initialization failed: {0}")]
    Initialization(String),

    /// No cached token and the collaborator could not provide one.
    #[error("Failed to acquire access token: {0}")]
    TokenAcquisition(String),

    /// A load or queue target is not a recognized Spotify URI.
    #[error(transparent)]
    InvalidUri(#[from] UriError),

    /// The collaborator rejected a call.
    #[error(transparent)]
    Native(#[from] NativeError),

    /// Web API request failed.
    #[error(transparent)]
    Transport(#[from] WebApiError),

    /// Writing the token store failed.
    #[error(transparent)]
    Storage(#[from] TokenStoreError),
}

impl PlayerError {
    /// Returns a machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration_error",
            Self::NotInitialized { .. } => "not_initialized",
            Self::Initialization(_) => "initialization_failed",
            Self::TokenAcquisition(_) => "token_acquisition_failed",
            Self::InvalidUri(_) => "invalid_uri",
            Self::Native(e) => e.code(),
            Self::Transport(e) => e.code(),
            Self::Storage(e) => e.code(),
        }
    }
}

impl From<ConfigError> for PlayerError {
    fn from(err: ConfigError) -> Self {
        Self::Configuration(err.to_string())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Result Type Aliases
// ─────────────────────────────────────────────────────────────────────────────

// Re-export Result type aliases from their defining modules
pub use crate::native::NativeResult;
pub use crate::web_api::WebApiResult;

/// Convenient Result alias for player operations.
pub type PlayerResult<T> = Result<T, PlayerError>;
