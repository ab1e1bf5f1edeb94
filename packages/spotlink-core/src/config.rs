//! Player configuration.
//!
//! [`PlayerConfig`] is what callers write (in code or YAML); every field is
//! optional and defaulted. [`PlayerConfig::validate`] checks credentials once
//! and produces the [`ValidatedConfig`] handed to the collaborator.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{PlayerError, PlayerResult};
use crate::protocol_constants::{
    DEFAULT_DEVICE_NAME, DEFAULT_INITIAL_VOLUME, DEFAULT_POS_UPDATE_INTERVAL_MS, TOKEN_DUMP_FILE,
    WEB_API_BASE_URL,
};

/// Errors loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Auth
// ─────────────────────────────────────────────────────────────────────────────

/// Credential type passed through to the Connect session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthType {
    #[default]
    AuthenticationUserPass,
    AuthenticationStoredFacebookCredentials,
    AuthenticationSpotifyToken,
    AuthenticationFacebookToken,
}

/// Account credentials.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthDetails {
    pub username: String,
    pub password: String,
    #[serde(alias = "authType")]
    pub auth_type: AuthType,
}

impl AuthDetails {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            auth_type: AuthType::default(),
        }
    }
}

impl std::fmt::Debug for AuthDetails {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthDetails")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("auth_type", &self.auth_type)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Audio / Connect
// ─────────────────────────────────────────────────────────────────────────────

/// Streaming bitrate in kbps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Bitrate {
    #[serde(rename = "96")]
    Kbps96,
    #[serde(rename = "160")]
    Kbps160,
    #[default]
    #[serde(rename = "320")]
    Kbps320,
}

/// How the device presents itself to Spotify Connect clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectConfig {
    #[serde(alias = "deviceType")]
    pub device_type: String,
    #[serde(alias = "hasVolumeControl")]
    pub has_volume_control: bool,
    /// Raw volume, 0-65535.
    #[serde(alias = "initialVolume")]
    pub initial_volume: u16,
    pub name: String,
}

impl Default for ConnectConfig {
    fn default() -> Self {
        Self {
            device_type: "computer".to_string(),
            has_volume_control: true,
            initial_volume: DEFAULT_INITIAL_VOLUME,
            name: DEFAULT_DEVICE_NAME.to_string(),
        }
    }
}

/// Loudness normalization settings, passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizationConfig {
    pub normalization: bool,
    #[serde(alias = "normalizationType")]
    pub normalization_type: String,
    #[serde(alias = "normalizationMethod")]
    pub normalization_method: String,
    #[serde(alias = "normalizationAttackCF")]
    pub normalization_attack_cf: f64,
    #[serde(alias = "normalizationKneeDB")]
    pub normalization_knee_db: f64,
    #[serde(alias = "normalizationPregain")]
    pub normalization_pregain: f64,
    #[serde(alias = "normalizationReleaseCF")]
    pub normalization_release_cf: f64,
    #[serde(alias = "normalizationThreshold")]
    pub normalization_threshold: f64,
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            normalization: false,
            normalization_type: "auto".to_string(),
            normalization_method: "basic".to_string(),
            normalization_attack_cf: 0.0,
            normalization_knee_db: 0.0,
            normalization_pregain: 0.0,
            normalization_release_cf: 0.0,
            normalization_threshold: 0.0,
        }
    }
}

/// Volume applied each time a Connect session comes up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InitialVolume {
    pub volume: f64,
    /// `volume` is on the raw 0-65535 scale rather than a percentage.
    #[serde(default)]
    pub raw: bool,
}

// ─────────────────────────────────────────────────────────────────────────────
// Player Config
// ─────────────────────────────────────────────────────────────────────────────

/// Player configuration loaded from code or YAML with environment overrides.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Required. Override: `SPOTLINK_USERNAME` / `SPOTLINK_PASSWORD`
    pub auth: Option<AuthDetails>,

    /// Audio backend name; empty selects the collaborator's default.
    pub backend: String,

    pub bitrate: Bitrate,

    pub gapless: bool,

    #[serde(alias = "passThrough")]
    pub pass_through: bool,

    #[serde(alias = "connectConfig")]
    pub connect_config: ConnectConfig,

    #[serde(alias = "normalizationConfig")]
    pub normalization_config: NormalizationConfig,

    /// Persist tokens fetched from the collaborator.
    /// Override: `SPOTLINK_SAVE_TOKENS`
    pub save_tokens: bool,

    #[serde(alias = "initialVolume")]
    pub initial_volume: Option<InitialVolume>,

    /// Position tick interval in milliseconds. Must be non-zero.
    /// Override: `SPOTLINK_POS_UPDATE_INTERVAL`
    pub pos_update_interval: u64,

    /// Directory holding the token store. Defaults to the executable's directory.
    /// Override: `SPOTLINK_CACHE_PATH`
    pub cache_path: Option<PathBuf>,

    /// Web API endpoint used by the SPIRC load path.
    pub web_api_base_url: String,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            auth: None,
            backend: String::new(),
            bitrate: Bitrate::default(),
            gapless: false,
            pass_through: false,
            connect_config: ConnectConfig::default(),
            normalization_config: NormalizationConfig::default(),
            save_tokens: false,
            initial_volume: None,
            pos_update_interval: DEFAULT_POS_UPDATE_INTERVAL_MS,
            cache_path: None,
            web_api_base_url: WEB_API_BASE_URL.to_string(),
        }
    }
}

impl PlayerConfig {
    /// Shorthand for a default config with username/password credentials.
    pub fn with_credentials(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            auth: Some(AuthDetails::new(username, password)),
            ..Default::default()
        }
    }

    /// Loads configuration from a YAML file, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = path {
            let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })?;
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Applies environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Applies overrides from an arbitrary key lookup.
    ///
    /// Unparseable values are logged and skipped.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(username) = lookup("SPOTLINK_USERNAME") {
            self.auth.get_or_insert_with(AuthDetails::default).username = username;
        }

        if let Some(password) = lookup("SPOTLINK_PASSWORD") {
            self.auth.get_or_insert_with(AuthDetails::default).password = password;
        }

        if let Some(val) = lookup("SPOTLINK_CACHE_PATH") {
            self.cache_path = Some(PathBuf::from(val));
        }

        if let Some(val) = lookup("SPOTLINK_POS_UPDATE_INTERVAL") {
            match val.parse() {
                Ok(interval) => self.pos_update_interval = interval,
                Err(_) => log::warn!("[Config] Ignoring invalid SPOTLINK_POS_UPDATE_INTERVAL: {}", val),
            }
        }

        if let Some(val) = lookup("SPOTLINK_SAVE_TOKENS") {
            match val.parse() {
                Ok(save) => self.save_tokens = save,
                Err(_) => log::warn!("[Config] Ignoring invalid SPOTLINK_SAVE_TOKENS: {}", val),
            }
        }
    }

    /// Checks credentials and resolves derived values.
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::Configuration`] when `auth` is missing, either
    /// credential is empty, or the tick interval is zero.
    pub fn validate(&self) -> PlayerResult<ValidatedConfig> {
        let auth = self
            .auth
            .clone()
            .ok_or_else(|| PlayerError::Configuration("missing auth details from config".into()))?;

        if auth.username.is_empty() || auth.password.is_empty() {
            return Err(PlayerError::Configuration(
                "missing username or password from config".into(),
            ));
        }

        if self.pos_update_interval == 0 {
            return Err(PlayerError::Configuration(
                "pos_update_interval must be >= 1".into(),
            ));
        }

        let cache_dir = self.cache_path.clone().unwrap_or_else(executable_dir);

        Ok(ValidatedConfig {
            auth,
            backend: self.backend.clone(),
            bitrate: self.bitrate,
            gapless: self.gapless,
            pass_through: self.pass_through,
            connect_config: self.connect_config.clone(),
            normalization_config: self.normalization_config.clone(),
            save_tokens: self.save_tokens,
            initial_volume: self.initial_volume,
            pos_update_interval: Duration::from_millis(self.pos_update_interval),
            token_file: cache_dir.join(TOKEN_DUMP_FILE),
            web_api_base_url: self.web_api_base_url.clone(),
        })
    }
}

/// Fully defaulted configuration with credentials checked.
#[derive(Debug, Clone, Serialize)]
pub struct ValidatedConfig {
    pub auth: AuthDetails,
    pub backend: String,
    pub bitrate: Bitrate,
    pub gapless: bool,
    pub pass_through: bool,
    pub connect_config: ConnectConfig,
    pub normalization_config: NormalizationConfig,
    pub save_tokens: bool,
    pub initial_volume: Option<InitialVolume>,
    #[serde(skip)]
    pub pos_update_interval: Duration,
    pub token_file: PathBuf,
    #[serde(skip)]
    pub web_api_base_url: String,
}

fn executable_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}
