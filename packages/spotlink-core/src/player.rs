//! The player wrapper.
//!
//! [`Player`] owns one native handle and everything coordinated around it: the
//! lifecycle gate, the event router, the position tracker, the volume cache and
//! the token cache. The plain and SPIRC players share this type; a
//! [`PlayerVariant`] decides which collaborator entry points are used and how
//! `load` reaches Spotify.

use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::BroadcastStream;

use crate::config::{PlayerConfig, ValidatedConfig};
use crate::error::{PlayerError, PlayerResult};
use crate::events::{EventKind, EventRouter, EventSink, ListenerId, PlayerEvent};
use crate::lifecycle::{Lifecycle, LifecycleState};
use crate::native::{
    EntryPoints, LoadStrategy, NativeCall, NativeHandle, NativeModule, NativeReply, PlayerVariant,
};
use crate::position::PositionTracker;
use crate::protocol_constants::{DEFAULT_SCOPES, EVENT_CHANNEL_CAPACITY};
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::token::{Token, TokenCache};
use crate::uri::{normalize_all, SpotifyUri};
use crate::utils::{clamp_raw, now_millis, percent_to_raw, raw_to_percent};
use crate::web_api::{PlaybackBody, WebApiClient};

/// Options for [`Player::load`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Start playing as soon as the track is loaded (native loading only).
    pub auto_play: bool,
    /// Offset into the first track (native loading only).
    pub start_position_ms: u32,
    /// Bearer token for Web API loading; acquired via [`Player::get_token`] when absent.
    pub token: Option<String>,
}

impl LoadOptions {
    #[must_use]
    pub fn auto_play(mut self, auto_play: bool) -> Self {
        self.auto_play = auto_play;
        self
    }

    #[must_use]
    pub fn start_position_ms(mut self, position_ms: u32) -> Self {
        self.start_position_ms = position_ms;
        self
    }

    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

/// Handle to a native Spotify Connect player.
///
/// Cheap to clone; all clones drive the same native player. Background work
/// (initialization, volume commands, the position ticker) runs on `S`.
pub struct Player<S: TaskSpawner = TokioSpawner> {
    inner: Arc<PlayerInner<S>>,
}

impl<S: TaskSpawner> Clone for Player<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct PlayerInner<S: TaskSpawner> {
    variant: PlayerVariant,
    entries: &'static EntryPoints,
    config: ValidatedConfig,
    lifecycle: Lifecycle,
    router: Arc<EventRouter>,
    tracker: Arc<PositionTracker<S>>,
    token_cache: TokenCache,
    web_api: WebApiClient,
    handle: RwLock<Option<Arc<dyn NativeHandle>>>,
    device_id: OnceLock<String>,
    volume: Arc<AtomicU16>,
    /// Feeds the single worker that forwards volume commands in call order.
    volume_tx: Mutex<Option<mpsc::UnboundedSender<u16>>>,
    init_error: Mutex<Option<String>>,
    spawner: S,
}

impl Player {
    /// Validates `config` and starts initializing the native player in the background.
    ///
    /// Returns as soon as validation passes; the player is usable once
    /// `PlayerInitialized` is emitted (or [`Player::wait_until_settled`] resolves).
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::Configuration`] for invalid configuration or when
    /// called outside a Tokio runtime. The collaborator is not called in either case.
    pub fn new(
        config: PlayerConfig,
        variant: PlayerVariant,
        native: Arc<dyn NativeModule>,
    ) -> PlayerResult<Self> {
        let handle = tokio::runtime::Handle::try_current().map_err(|_| {
            PlayerError::Configuration("Player must be created inside a Tokio runtime".into())
        })?;
        Self::with_spawner(config, variant, native, TokioSpawner::new(handle))
    }

    /// Plain player: native loading through `load_track`.
    pub fn standard(config: PlayerConfig, native: Arc<dyn NativeModule>) -> PlayerResult<Self> {
        Self::new(config, PlayerVariant::Standard, native)
    }

    /// Spotify Connect remote-control player: loading goes through the Web API.
    pub fn spirc(config: PlayerConfig, native: Arc<dyn NativeModule>) -> PlayerResult<Self> {
        Self::new(config, PlayerVariant::Spirc, native)
    }
}

impl<S: TaskSpawner> Player<S> {
    /// Same as [`Player::new`], running background work on `spawner`.
    ///
    /// # Errors
    ///
    /// Returns [`PlayerError::Configuration`] for invalid configuration.
    pub fn with_spawner(
        config: PlayerConfig,
        variant: PlayerVariant,
        native: Arc<dyn NativeModule>,
        spawner: S,
    ) -> PlayerResult<Self> {
        let config = config.validate()?;

        let router = Arc::new(EventRouter::new(EVENT_CHANNEL_CAPACITY));
        let tracker = Arc::new(PositionTracker::new(
            config.pos_update_interval,
            spawner.clone(),
        ));

        let ticks_to = Arc::downgrade(&router);
        tracker.set_on_tick(move |position_ms| {
            if let Some(router) = ticks_to.upgrade() {
                router.dispatch(&PlayerEvent::TimeUpdated { position_ms });
            }
        });

        let inner = Arc::new(PlayerInner {
            variant,
            entries: variant.entry_points(),
            token_cache: TokenCache::new(config.token_file.clone()),
            web_api: WebApiClient::new(config.web_api_base_url.clone()),
            config,
            lifecycle: Lifecycle::new(),
            router,
            tracker,
            handle: RwLock::new(None),
            device_id: OnceLock::new(),
            volume: Arc::new(AtomicU16::new(0)),
            volume_tx: Mutex::new(None),
            init_error: Mutex::new(None),
            spawner: spawner.clone(),
        });

        inner.lifecycle.begin_initializing();
        spawner.spawn(PlayerInner::initialize(Arc::clone(&inner), native));

        Ok(Self { inner })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Lifecycle
    // ─────────────────────────────────────────────────────────────────────────

    #[must_use]
    pub fn variant(&self) -> PlayerVariant {
        self.inner.variant
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        self.inner.lifecycle.state()
    }

    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.inner.lifecycle.is_ready()
    }

    /// Waits for initialization to finish.
    ///
    /// # Errors
    ///
    /// [`PlayerError::Initialization`] if the collaborator rejected construction,
    /// [`PlayerError::NotInitialized`] if the player was already closed.
    pub async fn wait_until_settled(&self) -> PlayerResult<()> {
        match self.inner.lifecycle.wait_settled().await {
            LifecycleState::Ready => Ok(()),
            LifecycleState::InitializationFailed => Err(PlayerError::Initialization(
                self.inner
                    .init_error
                    .lock()
                    .clone()
                    .unwrap_or_else(|| "unknown error".to_string()),
            )),
            state => Err(PlayerError::NotInitialized {
                method: "wait_until_settled",
                state,
            }),
        }
    }

    /// Device id reported by the collaborator. `None` until initialized.
    #[must_use]
    pub fn device_id(&self) -> Option<&str> {
        self.inner.device_id.get().map(String::as_str)
    }

    /// Stops position tracking, drops every listener and closes the native player.
    ///
    /// The player is unusable afterwards. Of several concurrent calls only one
    /// reaches the collaborator; the others fail with [`PlayerError::NotInitialized`].
    pub async fn close(&self) -> PlayerResult<()> {
        let handle = self.inner.ready_handle("close")?;

        if !self.inner.lifecycle.mark_closed() {
            return Err(PlayerError::NotInitialized {
                method: "close",
                state: self.inner.lifecycle.state(),
            });
        }
        self.inner.tracker.stop_ticking();
        self.inner.volume_tx.lock().take();
        self.inner.router.clear();
        self.inner.handle.write().take();

        log::info!("[Player] Closing {} player", self.inner.variant.name());
        let entry = self.inner.entries.close;
        handle.invoke(entry, NativeCall::Close).await?.into_unit(entry)?;
        Ok(())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Playback
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn play(&self) -> PlayerResult<()> {
        self.inner.call_unit("play", NativeCall::Play).await
    }

    pub async fn pause(&self) -> PlayerResult<()> {
        self.inner.call_unit("pause", NativeCall::Pause).await
    }

    pub async fn seek(&self, position_ms: u32) -> PlayerResult<()> {
        self.inner
            .call_unit("seek", NativeCall::Seek { position_ms })
            .await
    }

    /// Estimated playhead in milliseconds.
    #[must_use]
    pub fn current_position(&self) -> u64 {
        self.inner.tracker.position()
    }

    /// Loads one or more items.
    ///
    /// Each input may be a `spotify:` URI or an `open.spotify.com` link; all are
    /// normalized before anything is sent. The plain player loads each item in
    /// order through `load_track`. The SPIRC player issues one Web API `play`
    /// request targeting this device.
    ///
    /// # Errors
    ///
    /// [`PlayerError::InvalidUri`] if any input is unrecognized (nothing is loaded),
    /// [`PlayerError::TokenAcquisition`] if the SPIRC player has no token to use.
    pub async fn load<U: AsRef<str>>(&self, uris: &[U], options: LoadOptions) -> PlayerResult<()> {
        let handle = self.inner.ready_handle("load")?;
        let uris = normalize_all(uris)?;
        if uris.is_empty() {
            return Ok(());
        }

        match self.inner.variant.load_strategy() {
            LoadStrategy::Native => {
                let entry = self.inner.entries.load_track;
                for uri in &uris {
                    log::debug!("[Player] Loading {}", uri);
                    let call = NativeCall::LoadTrack {
                        uri: uri.to_string(),
                        auto_play: options.auto_play,
                        start_position_ms: options.start_position_ms,
                    };
                    handle.invoke(entry, call).await?.into_unit(entry)?;
                }
            }
            LoadStrategy::WebApi => {
                let token = self.inner.token_or_acquire(options.token).await?;
                let body = PlaybackBody::from_uris(&uris);
                self.inner
                    .web_api
                    .start_playback(self.inner.ready_device_id("load")?, &token, &body)
                    .await?;
            }
        }
        Ok(())
    }

    /// Appends one item to this device's queue via the Web API.
    pub async fn add_to_queue(&self, uri: &str, token: Option<String>) -> PlayerResult<()> {
        self.inner.ready_handle("add_to_queue")?;
        let uri = SpotifyUri::parse(uri)?;
        let token = self.inner.token_or_acquire(token).await?;
        self.inner
            .web_api
            .add_to_queue(self.inner.ready_device_id("add_to_queue")?, &token, &uri)
            .await?;
        Ok(())
    }

    /// Canvas (looping video) metadata for a track, as returned by the collaborator.
    pub async fn canvas(&self, uri: &str) -> PlayerResult<serde_json::Value> {
        self.inner.ready_handle("canvas")?;
        let uri = SpotifyUri::parse(uri)?.to_string();
        self.inner
            .call("canvas", NativeCall::Canvas { uri })
            .await
            .and_then(|(entry, reply)| Ok(reply.into_json(entry)?))
    }

    /// Lyrics for a track, as returned by the collaborator.
    pub async fn lyrics(&self, uri: &str) -> PlayerResult<serde_json::Value> {
        self.inner.ready_handle("lyrics")?;
        let uri = SpotifyUri::parse(uri)?.to_string();
        self.inner
            .call("lyrics", NativeCall::Lyrics { uri })
            .await
            .and_then(|(entry, reply)| Ok(reply.into_json(entry)?))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Volume
    // ─────────────────────────────────────────────────────────────────────────

    /// Requests a volume change.
    ///
    /// `volume` is a percentage (clamped to 0-100) unless `raw` is set, in which
    /// case it is clamped to 0-65535. Fire-and-forget: commands reach the
    /// collaborator in call order, and the cached volume only changes when the
    /// collaborator reports `VolumeChanged`.
    pub fn set_volume(&self, volume: f64, raw: bool) -> PlayerResult<()> {
        self.inner.set_volume(volume, raw)
    }

    /// Last reported volume, raw (0-65535) or as a percentage.
    #[must_use]
    pub fn get_volume(&self, raw: bool) -> f64 {
        let current = self.inner.volume.load(Ordering::SeqCst);
        if raw {
            f64::from(current)
        } else {
            raw_to_percent(current)
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Tokens
    // ─────────────────────────────────────────────────────────────────────────

    /// Returns an access token covering any of `scopes` (default scopes if empty).
    ///
    /// Served from the token cache when possible. Otherwise the collaborator is
    /// asked; the fresh token is cached only when `save_tokens` is enabled.
    pub async fn get_token<U: AsRef<str>>(&self, scopes: &[U]) -> PlayerResult<Token> {
        self.inner.lifecycle.guard("get_token")?;
        let scopes: Vec<&str> = scopes.iter().map(AsRef::as_ref).collect();
        self.inner.acquire_token(&scopes).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Events
    // ─────────────────────────────────────────────────────────────────────────

    /// Registers a listener for every event of `kind`.
    pub fn add_listener<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&PlayerEvent) + Send + Sync + 'static,
    {
        self.inner.router.add_listener(kind, listener)
    }

    /// Alias for [`Player::add_listener`].
    pub fn on<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&PlayerEvent) + Send + Sync + 'static,
    {
        self.add_listener(kind, listener)
    }

    /// Registers a listener for the next event of `kind` only.
    pub fn once<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&PlayerEvent) + Send + Sync + 'static,
    {
        self.inner.router.once(kind, listener)
    }

    pub fn remove_listener(&self, kind: EventKind, id: ListenerId) -> bool {
        self.inner.router.remove_listener(kind, id)
    }

    /// Alias for [`Player::remove_listener`].
    pub fn off(&self, kind: EventKind, id: ListenerId) -> bool {
        self.remove_listener(kind, id)
    }

    /// Removes every consumer listener. Position tracking and the volume cache keep working.
    pub fn remove_all_listeners(&self) {
        self.inner.router.reset_listeners();
    }

    /// Receiver for every event dispatched from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.inner.router.subscribe()
    }

    /// Same as [`Player::subscribe`], as a `Stream`.
    pub fn events(&self) -> BroadcastStream<PlayerEvent> {
        self.inner.router.stream()
    }
}

impl<S: TaskSpawner> std::fmt::Debug for Player<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("variant", &self.inner.variant)
            .field("state", &self.inner.lifecycle.state())
            .field("device_id", &self.inner.device_id.get())
            .finish()
    }
}

impl<S: TaskSpawner> PlayerInner<S> {
    /// Runs construction against the collaborator and settles the lifecycle.
    async fn initialize(self: Arc<Self>, native: Arc<dyn NativeModule>) {
        log::info!(
            "[Player] Initializing {} player via {}",
            self.variant.name(),
            self.entries.create
        );

        match self.connect(native.as_ref()).await {
            Ok(handle) => {
                let (volume_tx, volume_rx) = mpsc::unbounded_channel();
                *self.volume_tx.lock() = Some(volume_tx);
                self.spawner
                    .spawn(forward_volume(handle, self.entries.set_volume, volume_rx));

                self.router
                    .set_default_listeners(default_listeners(&self));
                self.lifecycle.mark_ready();
                log::info!(
                    "[Player] Initialized (device id: {})",
                    self.device_id.get().map_or("", String::as_str)
                );
                self.router.dispatch(&PlayerEvent::PlayerInitialized);
            }
            Err(e) => {
                let error = e.to_string();
                log::error!("[Player] Initialization failed: {}", error);
                *self.init_error.lock() = Some(error.clone());
                self.lifecycle.mark_failed();
                self.router
                    .dispatch(&PlayerEvent::InitializationError { error });
            }
        }
    }

    async fn connect(&self, native: &dyn NativeModule) -> PlayerResult<Arc<dyn NativeHandle>> {
        let sink = EventSink::new(&self.router);
        let handle = native
            .create_player(self.entries.create, &self.config, sink)
            .await?;

        let entry = self.entries.device_id;
        let device_id = handle
            .invoke(entry, NativeCall::DeviceId)
            .await?
            .into_device_id(entry)?;

        *self.handle.write() = Some(Arc::clone(&handle));
        if self.device_id.set(device_id).is_err() {
            log::warn!("[Player] Device id already assigned, keeping the first one");
        }
        Ok(handle)
    }

    /// Passes the lifecycle gate and returns the native handle.
    fn ready_handle(&self, method: &'static str) -> PlayerResult<Arc<dyn NativeHandle>> {
        self.lifecycle.guard(method)?;
        self.handle
            .read()
            .clone()
            .ok_or_else(|| PlayerError::NotInitialized {
                method,
                state: self.lifecycle.state(),
            })
    }

    fn ready_device_id(&self, method: &'static str) -> PlayerResult<&str> {
        self.device_id
            .get()
            .map(String::as_str)
            .ok_or_else(|| PlayerError::NotInitialized {
                method,
                state: self.lifecycle.state(),
            })
    }

    /// Gated call through the variant's entry point for `call`.
    async fn call(
        &self,
        method: &'static str,
        call: NativeCall,
    ) -> PlayerResult<(&'static str, NativeReply)> {
        let handle = self.ready_handle(method)?;
        let entry = self.entries.for_call(&call);
        let reply = handle.invoke(entry, call).await?;
        Ok((entry, reply))
    }

    async fn call_unit(&self, method: &'static str, call: NativeCall) -> PlayerResult<()> {
        let (entry, reply) = self.call(method, call).await?;
        Ok(reply.into_unit(entry)?)
    }

    fn set_volume(&self, volume: f64, raw: bool) -> PlayerResult<()> {
        self.lifecycle.guard("set_volume")?;
        let volume = if raw {
            clamp_raw(volume)
        } else {
            percent_to_raw(volume)
        };

        let sent = self
            .volume_tx
            .lock()
            .as_ref()
            .is_some_and(|tx| tx.send(volume).is_ok());
        if !sent {
            log::warn!("[Player] Volume worker gone, dropping volume {}", volume);
        }
        Ok(())
    }

    /// Cache first, then the collaborator. Caller must have passed the gate.
    async fn acquire_token(&self, scopes: &[&str]) -> PlayerResult<Token> {
        let scopes: Vec<&str> = if scopes.is_empty() {
            DEFAULT_SCOPES.to_vec()
        } else {
            scopes.to_vec()
        };

        if let Some(token) = self.token_cache.get_token(&scopes).await {
            log::debug!("[Player] Using cached token for {:?}", scopes);
            return Ok(token);
        }

        let entry = self.entries.token;
        let handle = self
            .handle
            .read()
            .clone()
            .ok_or_else(|| PlayerError::TokenAcquisition("native player is gone".into()))?;
        let reply = handle
            .invoke(
                entry,
                NativeCall::Token {
                    scopes: scopes.join(","),
                },
            )
            .await
            .and_then(|reply| reply.into_token(entry))
            .map_err(|e| PlayerError::TokenAcquisition(e.to_string()))?;

        let native = reply.ok_or_else(|| {
            PlayerError::TokenAcquisition(format!("{entry} returned no token"))
        })?;
        let token = Token::from_native(native, now_millis());

        if self.config.save_tokens {
            self.token_cache.add_token(token.clone()).await?;
        }
        Ok(token)
    }

    async fn token_or_acquire(&self, token: Option<String>) -> PlayerResult<String> {
        match token {
            Some(token) => Ok(token),
            None => Ok(self.acquire_token(&[]).await?.access_token),
        }
    }
}

/// Forwards queued volume commands one at a time, in the order they were issued.
///
/// Ends once the sender is dropped (on close or when the player goes away).
async fn forward_volume(
    handle: Arc<dyn NativeHandle>,
    entry: &'static str,
    mut commands: mpsc::UnboundedReceiver<u16>,
) {
    while let Some(volume) = commands.recv().await {
        if let Err(e) = handle.invoke(entry, NativeCall::SetVolume { volume }).await {
            log::warn!("[Player] {} failed: {}", entry, e);
        }
    }
    log::debug!("[Player] Volume worker stopped");
}

/// Builds the installer for the player's internal listeners.
///
/// Captures only what the listeners touch; the inner player is held weakly so
/// the router never keeps the player alive.
fn default_listeners<S: TaskSpawner>(
    inner: &Arc<PlayerInner<S>>,
) -> impl Fn(&EventRouter) + Send + Sync + 'static {
    let tracker = Arc::clone(&inner.tracker);
    let volume = Arc::clone(&inner.volume);
    let initial_volume = inner.config.initial_volume;
    let player: Weak<PlayerInner<S>> = Arc::downgrade(inner);

    move |router: &EventRouter| {
        let cached = Arc::clone(&volume);
        router.add_internal_listener(EventKind::VolumeChanged, move |event| {
            if let PlayerEvent::VolumeChanged { volume } = event {
                cached.store(*volume, Ordering::SeqCst);
            }
        });

        for kind in [
            EventKind::Playing,
            EventKind::Paused,
            EventKind::Seeked,
            EventKind::PositionCorrection,
            EventKind::Stopped,
            EventKind::TrackChanged,
        ] {
            let tracker = Arc::clone(&tracker);
            router.add_internal_listener(kind, move |event| tracker.apply(event));
        }

        if let Some(initial) = initial_volume {
            let player = player.clone();
            router.add_internal_listener(EventKind::SessionConnected, move |_| {
                let Some(player) = player.upgrade() else {
                    return;
                };
                if let Err(e) = player.set_volume(initial.volume, initial.raw) {
                    log::warn!("[Player] Failed to apply initial volume: {}", e);
                }
            });
        }
    }
}
