//! Fixed protocol constants that should NOT be changed.
//!
//! These values are defined by the Spotify Web API, the librespot collaborator,
//! or the persisted token format, and changing them would break compatibility.

use std::time::Duration;

// ─────────────────────────────────────────────────────────────────────────────
// Collaborator
// ─────────────────────────────────────────────────────────────────────────────

/// Upper bound of the collaborator's raw volume scale.
pub const MAX_RAW_VOLUME: u16 = u16::MAX;

/// Default initial volume handed to the Connect device (half of the raw scale).
pub const DEFAULT_INITIAL_VOLUME: u16 = 32768;

/// Default Connect device display name.
pub const DEFAULT_DEVICE_NAME: &str = "librespot";

// ─────────────────────────────────────────────────────────────────────────────
// Position Tracking
// ─────────────────────────────────────────────────────────────────────────────

/// Default interval between position ticks (milliseconds).
pub const DEFAULT_POS_UPDATE_INTERVAL_MS: u64 = 500;

// ─────────────────────────────────────────────────────────────────────────────
// Token Persistence
// ─────────────────────────────────────────────────────────────────────────────

/// File name of the token store inside the configured cache directory.
pub const TOKEN_DUMP_FILE: &str = "token_dump";

/// Scopes requested when the caller does not name any.
pub const DEFAULT_SCOPES: [&str; 6] = [
    "playlist-read-collaborative",
    "user-follow-read",
    "user-library-read",
    "user-top-read",
    "user-read-recently-played",
    "user-modify-playback-state",
];

// ─────────────────────────────────────────────────────────────────────────────
// Web API
// ─────────────────────────────────────────────────────────────────────────────

/// Base URL of the Spotify Web API.
pub const WEB_API_BASE_URL: &str = "https://api.spotify.com";

/// Timeout for Web API requests.
pub const WEB_API_TIMEOUT: Duration = Duration::from_secs(10);

/// Path for starting playback on a device.
pub const PLAYER_PLAY_PATH: &str = "/v1/me/player/play";

/// Path for appending an item to the playback queue.
pub const PLAYER_QUEUE_PATH: &str = "/v1/me/player/queue";

// ─────────────────────────────────────────────────────────────────────────────
// Events
// ─────────────────────────────────────────────────────────────────────────────

/// Capacity of the broadcast channel mirroring dispatched events.
pub const EVENT_CHANNEL_CAPACITY: usize = 100;
