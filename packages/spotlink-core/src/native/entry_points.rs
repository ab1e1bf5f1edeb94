//! Capability tables for the two player variants.
//!
//! The plain player and the SPIRC remote-control player differ only in which
//! collaborator entry points they call and in how `load` reaches Spotify. Both
//! are plain data here; the player picks a table once, at construction.

use super::NativeCall;

/// Names of the collaborator entry points used by one variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryPoints {
    pub create: &'static str,
    pub play: &'static str,
    pub pause: &'static str,
    pub seek: &'static str,
    pub set_volume: &'static str,
    pub close: &'static str,
    pub device_id: &'static str,
    pub token: &'static str,
    pub load_track: &'static str,
    pub canvas: &'static str,
    pub lyrics: &'static str,
}

impl EntryPoints {
    pub const STANDARD: Self = Self {
        create: "create_player",
        play: "play",
        pause: "pause",
        seek: "seek",
        set_volume: "set_volume",
        close: "close_player",
        device_id: "get_device_id",
        token: "get_token",
        load_track: "load_track",
        canvas: "get_canvas",
        lyrics: "get_lyrics",
    };

    pub const SPIRC: Self = Self {
        create: "create_player_spirc",
        play: "play_spirc",
        pause: "pause_spirc",
        seek: "seek_spirc",
        set_volume: "set_volume_spirc",
        close: "close_player_spirc",
        device_id: "get_device_id_spirc",
        token: "get_token_spirc",
        load_track: "load_track_spirc",
        canvas: "get_canvas_spirc",
        lyrics: "get_lyrics_spirc",
    };

    /// Entry point that serves `call`.
    #[must_use]
    pub fn for_call(&self, call: &NativeCall) -> &'static str {
        match call {
            NativeCall::Play => self.play,
            NativeCall::Pause => self.pause,
            NativeCall::Seek { .. } => self.seek,
            NativeCall::SetVolume { .. } => self.set_volume,
            NativeCall::Close => self.close,
            NativeCall::DeviceId => self.device_id,
            NativeCall::Token { .. } => self.token,
            NativeCall::LoadTrack { .. } => self.load_track,
            NativeCall::Canvas { .. } => self.canvas,
            NativeCall::Lyrics { .. } => self.lyrics,
        }
    }
}

/// How `load` gets content playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStrategy {
    /// One `load_track` call per URI on the native handle.
    Native,
    /// A single Web API `play` request targeting this device.
    WebApi,
}

/// Which native player the wrapper drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlayerVariant {
    #[default]
    Standard,
    /// Spotify Connect remote-control player.
    Spirc,
}

impl PlayerVariant {
    #[must_use]
    pub fn entry_points(self) -> &'static EntryPoints {
        match self {
            Self::Standard => &EntryPoints::STANDARD,
            Self::Spirc => &EntryPoints::SPIRC,
        }
    }

    #[must_use]
    pub fn load_strategy(self) -> LoadStrategy {
        match self {
            Self::Standard => LoadStrategy::Native,
            Self::Spirc => LoadStrategy::WebApi,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Spirc => "spirc",
        }
    }
}
