//! Scoped access tokens and their on-disk cache.

mod cache;

pub use cache::{TokenCache, TokenStoreError};

use serde::{Deserialize, Serialize};

use crate::native::NativeToken;

/// Token type literal. Spotify only issues bearer tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TokenType {
    #[default]
    Bearer,
}

/// A scoped access token with an absolute expiry.
///
/// Immutable once created; a newer token with overlapping scopes is stored
/// alongside it rather than replacing it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: TokenType,
    /// Seconds of validity reported by the collaborator.
    pub expires_in: u64,
    /// Absolute expiry, Unix milliseconds.
    pub expiry_from_epoch: u64,
    /// Granted scopes, in the order the collaborator reported them.
    pub scopes: Vec<String>,
}

impl Token {
    /// Stamps a collaborator token with its absolute expiry.
    ///
    /// `captured_at_ms` is the Unix time (ms) at which the token was received.
    #[must_use]
    pub fn from_native(native: NativeToken, captured_at_ms: u64) -> Self {
        let scopes = native
            .scopes
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();

        if native.token_type != "Bearer" {
            log::debug!("[Token] Unexpected token type {:?}, treating as Bearer", native.token_type);
        }

        Self {
            access_token: native.access_token,
            token_type: TokenType::Bearer,
            expires_in: native.expires_in,
            expiry_from_epoch: captured_at_ms.saturating_add(native.expires_in.saturating_mul(1000)),
            scopes,
        }
    }

    /// True iff the token is still valid at `now_ms`. A token expiring exactly now is expired.
    #[must_use]
    pub fn is_valid_at(&self, now_ms: u64) -> bool {
        self.expiry_from_epoch > now_ms
    }

    /// True iff any of `requested` is among this token's scopes.
    #[must_use]
    pub fn covers_any<S: AsRef<str>>(&self, requested: &[S]) -> bool {
        requested
            .iter()
            .any(|want| self.scopes.iter().any(|have| have == want.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn native(scopes: &str) -> NativeToken {
        NativeToken {
            access_token: "BQD".into(),
            token_type: "Bearer".into(),
            expires_in: 3600,
            scopes: scopes.into(),
        }
    }

    #[test]
    fn expiry_is_capture_time_plus_lifetime() {
        let token = Token::from_native(native("streaming"), 1_000);
        assert_eq!(token.expiry_from_epoch, 3_601_000);
        assert!(token.is_valid_at(3_600_999));
        assert!(!token.is_valid_at(3_601_000));
    }

    #[test]
    fn scopes_keep_collaborator_order() {
        let token = Token::from_native(native("user-top-read, streaming,,user-follow-read"), 0);
        assert_eq!(token.scopes, vec!["user-top-read", "streaming", "user-follow-read"]);
    }

    #[test]
    fn serializes_in_store_format() {
        let token = Token::from_native(native("a,b"), 0);
        let value = serde_json::to_value(&token).unwrap();
        assert_eq!(value["token_type"], "Bearer");
        assert_eq!(value["scopes"], serde_json::json!(["a", "b"]));
        assert_eq!(value["expiry_from_epoch"], 3_600_000);
    }

    #[test]
    fn empty_request_covers_nothing() {
        let token = Token::from_native(native("a"), 0);
        assert!(!token.covers_any::<&str>(&[]));
        assert!(token.covers_any(&["z", "a"]));
    }
}
