//! File-backed token cache.
//!
//! The store is a single JSON array at a fixed path. It is re-read on every
//! lookup and every addition, so edits made by another cache instance (or by
//! hand) are always visible. Writes go to a temp file that is then renamed
//! over the store.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::sync::Mutex;

use super::Token;
use crate::utils::now_millis;

/// Errors persisting the token store.
///
/// Read failures never surface: a missing or malformed store is treated as empty.
#[derive(Debug, Error)]
pub enum TokenStoreError {
    #[error("Token store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Token store serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Persists and retrieves scoped access tokens.
///
/// One cache per path. Reads and writes through the same cache are serialized;
/// nothing coordinates two caches (or two processes) sharing a file.
#[derive(Debug)]
pub struct TokenCache {
    path: PathBuf,
    lock: Mutex<()>,
}

impl TokenCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Path of the backing store.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the first stored token that covers any of `scopes` and has not expired.
    pub async fn get_token<S: AsRef<str>>(&self, scopes: &[S]) -> Option<Token> {
        self.get_token_at(scopes, now_millis()).await
    }

    /// Same as [`TokenCache::get_token`] with an explicit clock.
    pub async fn get_token_at<S: AsRef<str>>(&self, scopes: &[S], now_ms: u64) -> Option<Token> {
        let _guard = self.lock.lock().await;
        let tokens = self.load().await;
        find_valid(&tokens, scopes, now_ms).cloned()
    }

    /// Appends `token` and rewrites the store.
    ///
    /// No deduplication or eviction: expired tokens stay on disk.
    pub async fn add_token(&self, token: Token) -> Result<(), TokenStoreError> {
        let _guard = self.lock.lock().await;
        let mut tokens = self.load().await;
        tokens.push(token);
        self.persist(&tokens).await?;
        log::debug!(
            "[TokenCache] Stored token ({} total) at {}",
            tokens.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Reads the store, resetting to empty on any failure.
    async fn load(&self) -> Vec<Token> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("[TokenCache] No token store at {}, starting empty", self.path.display());
                return Vec::new();
            }
            Err(e) => {
                log::warn!(
                    "[TokenCache] Failed to read token store {}, creating new: {}",
                    self.path.display(),
                    e
                );
                return Vec::new();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(tokens) => tokens,
            Err(e) => {
                log::warn!("[TokenCache] Failed to parse token store, creating new: {}", e);
                Vec::new()
            }
        }
    }

    /// Writes the full store atomically (temp file + rename).
    async fn persist(&self, tokens: &[Token]) -> Result<(), TokenStoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let contents = serde_json::to_string(tokens)?;
        let mut temp_name = self.path.as_os_str().to_owned();
        temp_name.push(".tmp");
        let temp_path = PathBuf::from(temp_name);

        tokio::fs::write(&temp_path, contents).await?;
        tokio::fs::rename(&temp_path, &self.path).await?;
        Ok(())
    }
}

/// First token in storage order that covers any of `scopes` and is valid at `now_ms`.
pub(crate) fn find_valid<'a, S: AsRef<str>>(
    tokens: &'a [Token],
    scopes: &[S],
    now_ms: u64,
) -> Option<&'a Token> {
    tokens
        .iter()
        .find(|t| t.covers_any(scopes) && t.is_valid_at(now_ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenType;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn token(access: &str, scopes: &[&str], expiry: u64) -> Token {
        Token {
            access_token: access.to_string(),
            token_type: TokenType::Bearer,
            expires_in: 3600,
            expiry_from_epoch: expiry,
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn cache_in(dir: &TempDir) -> TokenCache {
        TokenCache::new(dir.path().join("token_dump"))
    }

    #[tokio::test]
    async fn add_then_get_returns_the_same_token() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        let stored = token("a", &["streaming", "user-top-read"], now_millis() + 60_000);

        cache.add_token(stored.clone()).await.unwrap();

        assert_eq!(cache.get_token(&["user-top-read"]).await, Some(stored));
    }

    #[tokio::test]
    async fn returns_first_match_in_storage_order() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        cache.add_token(token("old", &["streaming"], 2_000)).await.unwrap();
        cache.add_token(token("new", &["streaming"], 3_000)).await.unwrap();

        let found = cache.get_token_at(&["streaming"], 1_000).await.unwrap();
        assert_eq!(found.access_token, "old");
    }

    #[tokio::test]
    async fn skips_expired_and_disjoint_tokens() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        cache.add_token(token("expired", &["streaming"], 500)).await.unwrap();
        cache.add_token(token("other", &["user-follow-read"], 5_000)).await.unwrap();
        cache.add_token(token("good", &["streaming"], 5_000)).await.unwrap();

        let found = cache.get_token_at(&["streaming"], 1_000).await.unwrap();
        assert_eq!(found.access_token, "good");
    }

    #[tokio::test]
    async fn expiry_equal_to_now_is_expired() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        cache.add_token(token("edge", &["streaming"], 1_000)).await.unwrap();

        assert!(cache.get_token_at(&["streaming"], 1_000).await.is_none());
        assert!(cache.get_token_at(&["streaming"], 999).await.is_some());
    }

    #[tokio::test]
    async fn empty_request_matches_nothing() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        cache.add_token(token("a", &["streaming"], u64::MAX)).await.unwrap();

        assert!(cache.get_token::<&str>(&[]).await.is_none());
    }

    #[tokio::test]
    async fn missing_store_reads_as_empty() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        assert!(cache.get_token(&["streaming"]).await.is_none());
    }

    #[tokio::test]
    async fn corrupt_store_is_reset_on_next_add() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        std::fs::write(cache.path(), "{ not json").unwrap();

        assert!(cache.get_token(&["streaming"]).await.is_none());

        cache.add_token(token("fresh", &["streaming"], u64::MAX)).await.unwrap();
        let on_disk: Vec<Token> =
            serde_json::from_str(&std::fs::read_to_string(cache.path()).unwrap()).unwrap();
        assert_eq!(on_disk.len(), 1);
        assert_eq!(on_disk[0].access_token, "fresh");
    }

    #[tokio::test]
    async fn non_array_document_is_treated_as_empty() {
        let dir = TempDir::new().unwrap();
        let cache = cache_in(&dir);
        std::fs::write(cache.path(), r#"{"access_token":"x"}"#).unwrap();

        assert!(cache.get_token(&["streaming"]).await.is_none());
    }

    #[tokio::test]
    async fn sees_tokens_written_by_another_instance() {
        let dir = TempDir::new().unwrap();
        let writer = cache_in(&dir);
        let reader = cache_in(&dir);

        writer.add_token(token("shared", &["streaming"], u64::MAX)).await.unwrap();

        assert!(reader.get_token(&["streaming"]).await.is_some());
    }

    #[tokio::test]
    async fn creates_missing_parent_directories() {
        let dir = TempDir::new().unwrap();
        let cache = TokenCache::new(dir.path().join("nested/cache/token_dump"));

        cache.add_token(token("a", &["streaming"], u64::MAX)).await.unwrap();
        assert!(cache.path().exists());
    }

    #[tokio::test]
    async fn concurrent_adds_are_all_kept() {
        let dir = TempDir::new().unwrap();
        let cache = Arc::new(cache_in(&dir));

        let adds = (0..16).map(|i| {
            let cache = Arc::clone(&cache);
            async move {
                cache
                    .add_token(token(&format!("t{i}"), &["streaming"], u64::MAX))
                    .await
            }
        });
        for result in futures::future::join_all(adds).await {
            result.unwrap();
        }

        let on_disk: Vec<Token> =
            serde_json::from_str(&std::fs::read_to_string(cache.path()).unwrap()).unwrap();
        assert_eq!(on_disk.len(), 16);
    }

    #[test]
    fn find_valid_matches_intersection_and_expiry() {
        const SCOPES: [&str; 5] = ["a", "b", "c", "d", "e"];
        let mut rng = StdRng::seed_from_u64(0x5eed);

        for _ in 0..500 {
            let now: u64 = rng.gen_range(1_000..2_000);
            let tokens: Vec<Token> = (0..rng.gen_range(0..6))
                .map(|i| {
                    let scopes: Vec<&str> =
                        SCOPES.iter().copied().filter(|_| rng.gen_bool(0.4)).collect();
                    token(&format!("t{i}"), &scopes, rng.gen_range(500..2_500))
                })
                .collect();
            let requested: Vec<&str> =
                SCOPES.iter().copied().filter(|_| rng.gen_bool(0.3)).collect();

            let expected = tokens.iter().find(|t| {
                t.expiry_from_epoch > now && t.scopes.iter().any(|s| requested.contains(&s.as_str()))
            });

            assert_eq!(find_valid(&tokens, &requested, now), expected);
        }
    }
}
