//! Event system for player notifications.
//!
//! This module provides:
//! - [`PlayerEvent`], the tagged union of everything the collaborator reports
//!   plus the events the wrapper emits itself
//! - [`EventRouter`] for synchronous fan-out to registered listeners
//! - [`EventSink`], the callback handle given to the collaborator

mod router;
mod sink;

pub use router::{EventRouter, Listener, ListenerId};
pub use sink::EventSink;

use serde::{Deserialize, Serialize};

/// Events delivered to listeners.
///
/// On the wire each record is an object tagged by its `event` field, e.g.
/// `{"event":"Playing","play_request_id":3,"track_id":"...","position_ms":1000}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum PlayerEvent {
    Stopped {
        play_request_id: u64,
        track_id: String,
    },
    Loading {
        play_request_id: u64,
        track_id: String,
        position_ms: u64,
    },
    Preloading {
        track_id: String,
    },
    Playing {
        play_request_id: u64,
        track_id: String,
        position_ms: u64,
    },
    Paused {
        play_request_id: u64,
        track_id: String,
        position_ms: u64,
    },
    TimeToPreloadNextTrack {
        play_request_id: u64,
        track_id: String,
    },
    EndOfTrack {
        play_request_id: u64,
        track_id: String,
    },
    Unavailable {
        play_request_id: u64,
        track_id: String,
    },
    /// Raw volume on the 0-65535 scale.
    VolumeChanged {
        volume: u16,
    },
    PositionCorrection {
        play_request_id: u64,
        track_id: String,
        position_ms: u64,
    },
    Seeked {
        play_request_id: u64,
        track_id: String,
        position_ms: u64,
    },
    TrackChanged {
        audio_item: String,
    },
    SessionConnected {
        connection_id: String,
        user_name: String,
    },
    SessionDisconnected {
        connection_id: String,
        user_name: String,
    },
    SessionClientChanged {
        client_id: String,
        client_name: String,
        client_brand_name: String,
        client_model_name: String,
    },
    ShuffleChanged {
        shuffle: bool,
    },
    RepeatChanged {
        repeat: bool,
    },
    AutoPlayChanged {
        auto_play: bool,
    },
    FilterExplicitContentChanged {
        filter: bool,
    },

    // Emitted by the wrapper, never by the collaborator.
    /// The native player is ready; gated operations are now allowed.
    PlayerInitialized,
    /// The collaborator rejected construction. Terminal.
    InitializationError {
        error: String,
    },
    /// Estimated position after a ticker step.
    TimeUpdated {
        position_ms: u64,
    },
}

impl PlayerEvent {
    /// Returns the channel this event is dispatched on.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Stopped { .. } => EventKind::Stopped,
            Self::Loading { .. } => EventKind::Loading,
            Self::Preloading { .. } => EventKind::Preloading,
            Self::Playing { .. } => EventKind::Playing,
            Self::Paused { .. } => EventKind::Paused,
            Self::TimeToPreloadNextTrack { .. } => EventKind::TimeToPreloadNextTrack,
            Self::EndOfTrack { .. } => EventKind::EndOfTrack,
            Self::Unavailable { .. } => EventKind::Unavailable,
            Self::VolumeChanged { .. } => EventKind::VolumeChanged,
            Self::PositionCorrection { .. } => EventKind::PositionCorrection,
            Self::Seeked { .. } => EventKind::Seeked,
            Self::TrackChanged { .. } => EventKind::TrackChanged,
            Self::SessionConnected { .. } => EventKind::SessionConnected,
            Self::SessionDisconnected { .. } => EventKind::SessionDisconnected,
            Self::SessionClientChanged { .. } => EventKind::SessionClientChanged,
            Self::ShuffleChanged { .. } => EventKind::ShuffleChanged,
            Self::RepeatChanged { .. } => EventKind::RepeatChanged,
            Self::AutoPlayChanged { .. } => EventKind::AutoPlayChanged,
            Self::FilterExplicitContentChanged { .. } => EventKind::FilterExplicitContentChanged,
            Self::PlayerInitialized => EventKind::PlayerInitialized,
            Self::InitializationError { .. } => EventKind::InitializationError,
            Self::TimeUpdated { .. } => EventKind::TimeUpdated,
        }
    }

    /// Returns the authoritative position carried by this event, if any.
    ///
    /// Only `Playing`, `Paused`, `Seeked` and `PositionCorrection` count;
    /// `Loading` reports a start offset, not the playhead.
    #[must_use]
    pub fn authoritative_position(&self) -> Option<u64> {
        match self {
            Self::Playing { position_ms, .. }
            | Self::Paused { position_ms, .. }
            | Self::Seeked { position_ms, .. }
            | Self::PositionCorrection { position_ms, .. } => Some(*position_ms),
            _ => None,
        }
    }

    /// Parses a raw `{ "event": ..., ... }` record.
    pub fn from_record(record: serde_json::Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(record)
    }
}

/// Discriminant of a [`PlayerEvent`]; names the channel listeners subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Stopped,
    Loading,
    Preloading,
    Playing,
    Paused,
    TimeToPreloadNextTrack,
    EndOfTrack,
    Unavailable,
    VolumeChanged,
    PositionCorrection,
    Seeked,
    TrackChanged,
    SessionConnected,
    SessionDisconnected,
    SessionClientChanged,
    ShuffleChanged,
    RepeatChanged,
    AutoPlayChanged,
    FilterExplicitContentChanged,
    PlayerInitialized,
    InitializationError,
    TimeUpdated,
}

impl EventKind {
    /// Channel name as it appears in the record's `event` field.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Stopped => "Stopped",
            Self::Loading => "Loading",
            Self::Preloading => "Preloading",
            Self::Playing => "Playing",
            Self::Paused => "Paused",
            Self::TimeToPreloadNextTrack => "TimeToPreloadNextTrack",
            Self::EndOfTrack => "EndOfTrack",
            Self::Unavailable => "Unavailable",
            Self::VolumeChanged => "VolumeChanged",
            Self::PositionCorrection => "PositionCorrection",
            Self::Seeked => "Seeked",
            Self::TrackChanged => "TrackChanged",
            Self::SessionConnected => "SessionConnected",
            Self::SessionDisconnected => "SessionDisconnected",
            Self::SessionClientChanged => "SessionClientChanged",
            Self::ShuffleChanged => "ShuffleChanged",
            Self::RepeatChanged => "RepeatChanged",
            Self::AutoPlayChanged => "AutoPlayChanged",
            Self::FilterExplicitContentChanged => "FilterExplicitContentChanged",
            Self::PlayerInitialized => "PlayerInitialized",
            Self::InitializationError => "InitializationError",
            Self::TimeUpdated => "TimeUpdated",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
