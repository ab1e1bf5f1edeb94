//! Spotlink Core - wrapper around a native Spotify Connect player.
//!
//! The native collaborator (a compiled librespot binding) does the session,
//! decoding and audio output work. This crate coordinates everything around it:
//! configuration, initialization, event delivery, position estimation, volume
//! and token caching, and loading content through either the native player or
//! the Spotify Web API.
//!
//! # Architecture
//!
//! - [`player`]: The [`Player`] handle, in plain and SPIRC variants
//! - [`lifecycle`]: Initialization state machine gating every operation
//! - [`events`]: Event model, listener routing and the collaborator sink
//! - [`position`]: Playhead estimation between authoritative events
//! - [`token`]: Scoped access tokens and their on-disk cache
//! - [`web_api`]: Web API playback and queue requests
//! - [`uri`]: Spotify URI and web link normalization
//! - [`config`]: YAML configuration with environment overrides
//! - [`error`]: Centralized error types
//!
//! # Abstraction Traits
//!
//! - [`NativeModule`](native::NativeModule) / [`NativeHandle`](native::NativeHandle):
//!   the collaborator boundary
//! - [`TaskSpawner`](runtime::TaskSpawner): Spawning background tasks

#![allow(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod events;
pub mod lifecycle;
pub mod native;
pub mod player;
pub mod position;
pub mod protocol_constants;
pub mod runtime;
pub mod token;
pub mod uri;
pub mod utils;
pub mod web_api;

#[cfg(test)]
mod test_fixtures;

// Re-export commonly used types at the crate root
pub use config::{AuthDetails, AuthType, Bitrate, ConfigError, InitialVolume, PlayerConfig, ValidatedConfig};
pub use error::{ErrorCode, NativeResult, PlayerError, PlayerResult, WebApiResult};
pub use events::{EventKind, EventRouter, EventSink, ListenerId, PlayerEvent};
pub use lifecycle::LifecycleState;
pub use native::{NativeCall, NativeError, NativeHandle, NativeModule, NativeReply, NativeToken, PlayerVariant};
pub use player::{LoadOptions, Player};
pub use runtime::{TaskSpawner, TokioSpawner};
pub use token::{Token, TokenCache};
pub use uri::{SpotifyItemType, SpotifyUri, UriError};
pub use utils::now_millis;
