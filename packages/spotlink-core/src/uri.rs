//! Spotify URI recognition and normalization.
//!
//! Accepts canonical `spotify:<type>:<id>` URIs and `open.spotify.com` /
//! `play.spotify.com` web links (optionally `embed/`), and normalizes both to
//! the canonical form.

use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejection for a string that is not a recognized Spotify item.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unrecognized Spotify URI: {0}")]
pub struct UriError(pub String);

/// Kind of item a URI points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpotifyItemType {
    Album,
    Track,
    Playlist,
    Artist,
}

impl SpotifyItemType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Album => "album",
            Self::Track => "track",
            Self::Playlist => "playlist",
            Self::Artist => "artist",
        }
    }

    /// Tracks are played as a list; everything else is a playback context.
    #[must_use]
    pub fn is_context(self) -> bool {
        !matches!(self, Self::Track)
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "album" => Some(Self::Album),
            "track" => Some(Self::Track),
            "playlist" => Some(Self::Playlist),
            "artist" => Some(Self::Artist),
            _ => None,
        }
    }
}

/// A normalized `spotify:<type>:<id>` reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SpotifyUri {
    pub item_type: SpotifyItemType,
    pub id: String,
}

fn uri_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?P<scheme>spotify:|https?://(?:open|play)\.spotify\.com/)(?:embed)?/?(?P<type>album|track|playlist|artist)(?::|/)(?P<id>[0-9a-zA-Z]{22})",
        )
        .expect("static regex is valid")
    })
}

impl SpotifyUri {
    /// Parses a canonical URI or a Spotify web link.
    ///
    /// For web links the id is the last path segment of the URL; anything after
    /// the 22-character id in a canonical URI is ignored.
    pub fn parse(input: &str) -> Result<Self, UriError> {
        let input = input.trim();
        let caps = uri_regex()
            .captures(input)
            .ok_or_else(|| UriError(input.to_string()))?;

        let item_type = SpotifyItemType::parse(&caps["type"]).ok_or_else(|| UriError(input.to_string()))?;

        let id = if caps["scheme"].starts_with("http") {
            reqwest::Url::parse(input)
                .ok()
                .and_then(|url| {
                    url.path_segments()?
                        .filter(|segment| !segment.is_empty())
                        .next_back()
                        .map(String::from)
                })
                .unwrap_or_else(|| caps["id"].to_string())
        } else {
            caps["id"].to_string()
        };

        Ok(Self { item_type, id })
    }

    #[must_use]
    pub fn is_context(&self) -> bool {
        self.item_type.is_context()
    }
}

impl fmt::Display for SpotifyUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "spotify:{}:{}", self.item_type.as_str(), self.id)
    }
}

impl FromStr for SpotifyUri {
    type Err = UriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Parses every input, failing on the first unrecognized one.
pub fn normalize_all<S: AsRef<str>>(inputs: &[S]) -> Result<Vec<SpotifyUri>, UriError> {
    inputs.iter().map(|s| SpotifyUri::parse(s.as_ref())).collect()
}
