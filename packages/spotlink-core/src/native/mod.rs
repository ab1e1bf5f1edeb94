//! Trait abstractions for the native player collaborator.
//!
//! The collaborator is the compiled librespot binding that does the actual
//! Connect session, decoding and transport work. The core only ever talks to it
//! through these traits, by entry-point name, so the same player code drives
//! both the plain player and the SPIRC remote-control variant.

mod entry_points;

pub use entry_points::{EntryPoints, LoadStrategy, PlayerVariant};

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ValidatedConfig;
use crate::error::ErrorCode;
use crate::events::EventSink;

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors reported by the collaborator.
#[derive(Debug, Error)]
pub enum NativeError {
    /// The collaborator rejected the call.
    #[error("{entry} rejected: {reason}")]
    Rejected { entry: String, reason: String },

    /// The collaborator answered with a reply of the wrong shape.
    #[error("{entry} returned an unexpected reply (expected {expected})")]
    UnexpectedReply {
        entry: String,
        expected: &'static str,
    },
}

impl NativeError {
    /// Shorthand for a rejection from `entry`.
    pub fn rejected(entry: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rejected {
            entry: entry.into(),
            reason: reason.into(),
        }
    }
}

impl ErrorCode for NativeError {
    fn code(&self) -> &'static str {
        match self {
            Self::Rejected { .. } => "native_rejected",
            Self::UnexpectedReply { .. } => "native_unexpected_reply",
        }
    }
}

/// Convenient Result alias for collaborator calls.
pub type NativeResult<T> = Result<T, NativeError>;

// ─────────────────────────────────────────────────────────────────────────────
// Calls and Replies
// ─────────────────────────────────────────────────────────────────────────────

/// A single operation on a native player handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeCall {
    Play,
    Pause,
    Seek {
        position_ms: u32,
    },
    /// Raw volume, 0-65535.
    SetVolume {
        volume: u16,
    },
    Close,
    DeviceId,
    /// Comma-separated scope list.
    Token {
        scopes: String,
    },
    LoadTrack {
        uri: String,
        auto_play: bool,
        start_position_ms: u32,
    },
    Canvas {
        uri: String,
    },
    Lyrics {
        uri: String,
    },
}

/// Token as reported by the collaborator, before the wrapper stamps an expiry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeToken {
    pub access_token: String,
    pub token_type: String,
    /// Seconds of validity.
    pub expires_in: u64,
    /// Comma-separated scope list.
    pub scopes: String,
}

/// The collaborator's answer to a [`NativeCall`].
#[derive(Debug, Clone, PartialEq)]
pub enum NativeReply {
    Unit,
    DeviceId(String),
    /// `None` when the collaborator could not produce a token.
    Token(Option<NativeToken>),
    Json(serde_json::Value),
}

impl NativeReply {
    pub fn into_unit(self, entry: &str) -> NativeResult<()> {
        match self {
            Self::Unit => Ok(()),
            _ => Err(NativeError::UnexpectedReply {
                entry: entry.to_string(),
                expected: "unit",
            }),
        }
    }

    pub fn into_device_id(self, entry: &str) -> NativeResult<String> {
        match self {
            Self::DeviceId(id) => Ok(id),
            _ => Err(NativeError::UnexpectedReply {
                entry: entry.to_string(),
                expected: "device id",
            }),
        }
    }

    pub fn into_token(self, entry: &str) -> NativeResult<Option<NativeToken>> {
        match self {
            Self::Token(token) => Ok(token),
            _ => Err(NativeError::UnexpectedReply {
                entry: entry.to_string(),
                expected: "token",
            }),
        }
    }

    pub fn into_json(self, entry: &str) -> NativeResult<serde_json::Value> {
        match self {
            Self::Json(value) => Ok(value),
            _ => Err(NativeError::UnexpectedReply {
                entry: entry.to_string(),
                expected: "json",
            }),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Collaborator Traits
// ─────────────────────────────────────────────────────────────────────────────

/// Factory side of the collaborator.
///
/// Used once per player, during initialization.
#[async_trait]
pub trait NativeModule: Send + Sync {
    /// Constructs a native player.
    ///
    /// # Arguments
    /// * `entry` - Construction entry point (`create_player` or `create_player_spirc`)
    /// * `config` - Validated, fully defaulted configuration
    /// * `events` - Sink the collaborator must feed every player event into, in order
    async fn create_player(
        &self,
        entry: &'static str,
        config: &ValidatedConfig,
        events: EventSink,
    ) -> NativeResult<Arc<dyn NativeHandle>>;
}

/// A constructed native player.
///
/// Exclusively owned by one [`Player`](crate::Player); never share a handle
/// between two wrappers.
#[async_trait]
pub trait NativeHandle: Send + Sync {
    /// Invokes `call` through the named entry point.
    async fn invoke(&self, entry: &'static str, call: NativeCall) -> NativeResult<NativeReply>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_shape_mismatch_names_entry() {
        let err = NativeReply::Unit.into_device_id("get_device_id").unwrap_err();
        assert_eq!(err.code(), "native_unexpected_reply");
        assert!(err.to_string().contains("get_device_id"));
    }

    #[test]
    fn absent_token_is_not_an_error() {
        let token = NativeReply::Token(None).into_token("get_token").unwrap();
        assert!(token.is_none());
    }

    #[test]
    fn native_token_deserializes_from_record() {
        let token: NativeToken = serde_json::from_value(serde_json::json!({
            "access_token": "abc",
            "token_type": "Bearer",
            "expires_in": 3600,
            "scopes": "streaming,user-read-email",
        }))
        .unwrap();
        assert_eq!(token.expires_in, 3600);
        assert_eq!(token.scopes, "streaming,user-read-email");
    }
}
