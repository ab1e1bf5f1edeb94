//! Minimal Spotify Web API client.
//!
//! Only the two player endpoints the SPIRC variant needs: start playback on a
//! device and append to its queue. Both take a bearer token and a device id.

use reqwest::{Client, Url};
use serde::Serialize;
use thiserror::Error;

use crate::protocol_constants::{PLAYER_PLAY_PATH, PLAYER_QUEUE_PATH, WEB_API_TIMEOUT};
use crate::uri::SpotifyUri;

// ─────────────────────────────────────────────────────────────────────────────
// Error Types
// ─────────────────────────────────────────────────────────────────────────────

/// Errors that can occur talking to the Web API.
#[derive(Debug, Error)]
pub enum WebApiError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response. Carries the raw body.
    #[error("HTTP error {0}: {1}")]
    Status(u16, String),

    /// The configured base URL could not be joined with an endpoint path.
    #[error("Invalid Web API URL: {0}")]
    InvalidUrl(String),
}

/// Convenient Result alias for Web API operations.
pub type WebApiResult<T> = Result<T, WebApiError>;

// ─────────────────────────────────────────────────────────────────────────────
// Request Bodies
// ─────────────────────────────────────────────────────────────────────────────

/// Body of `PUT /v1/me/player/play`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlaybackBody {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub uris: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_uri: Option<String>,
}

impl PlaybackBody {
    /// Tracks go to `uris` in order; for contexts (album, playlist, artist) the last one wins.
    #[must_use]
    pub fn from_uris(uris: &[SpotifyUri]) -> Self {
        let mut body = Self::default();
        for uri in uris {
            if uri.is_context() {
                body.context_uri = Some(uri.to_string());
            } else {
                body.uris.push(uri.to_string());
            }
        }
        body
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

/// Web API client bound to one base URL.
#[derive(Clone)]
pub struct WebApiClient {
    http: Client,
    base_url: String,
}

impl WebApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> WebApiResult<Url> {
        let raw = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        let mut url = Url::parse(&raw).map_err(|e| WebApiError::InvalidUrl(format!("{raw}: {e}")))?;
        url.query_pairs_mut().extend_pairs(query);
        Ok(url)
    }

    /// Starts playback of `body` on `device_id`.
    pub async fn start_playback(
        &self,
        device_id: &str,
        token: &str,
        body: &PlaybackBody,
    ) -> WebApiResult<()> {
        let url = self.endpoint(PLAYER_PLAY_PATH, &[("device_id", device_id)])?;
        log::info!(
            "[WebApi] PUT play on {} ({} track(s), context: {:?})",
            device_id,
            body.uris.len(),
            body.context_uri
        );

        let res = self
            .http
            .put(url)
            .bearer_auth(token)
            .json(body)
            .timeout(WEB_API_TIMEOUT)
            .send()
            .await?;

        check_status(res).await
    }

    /// Appends `uri` to the queue of `device_id`.
    pub async fn add_to_queue(&self, device_id: &str, token: &str, uri: &SpotifyUri) -> WebApiResult<()> {
        let uri = uri.to_string();
        let url = self.endpoint(PLAYER_QUEUE_PATH, &[("device_id", device_id), ("uri", &uri)])?;
        log::info!("[WebApi] POST queue {} on {}", uri, device_id);

        let res = self
            .http
            .post(url)
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_LENGTH, 0)
            .timeout(WEB_API_TIMEOUT)
            .send()
            .await?;

        check_status(res).await
    }
}

async fn check_status(res: reqwest::Response) -> WebApiResult<()> {
    let status = res.status();
    if status.is_success() {
        return Ok(());
    }

    let body = res.text().await.unwrap_or_default();
    log::warn!("[WebApi] Request failed with {}: {}", status, body);
    Err(WebApiError::Status(status.as_u16(), body))
}
