//! Synchronous event fan-out.
//!
//! The [`EventRouter`] is the single point every event passes through. Listeners
//! are registered per [`EventKind`] channel and called in registration order on
//! the dispatching thread. Every dispatched event is also mirrored onto a
//! `tokio::sync::broadcast` channel for async consumers.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use super::{EventKind, PlayerEvent};

/// A registered event callback.
pub type Listener = Arc<dyn Fn(&PlayerEvent) + Send + Sync>;

/// Installs the wrapper's internal listeners on a router.
type DefaultsInstaller = Arc<dyn Fn(&EventRouter) + Send + Sync>;

/// Handle returned on registration, used to remove the listener again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

struct Registration {
    id: ListenerId,
    listener: Listener,
    once: bool,
    internal: bool,
}

/// Routes events to listeners by channel.
///
/// # Default listeners
///
/// The player hands the router an installer for its internal listeners
/// (position tracking, volume cache). [`EventRouter::reset_listeners`] removes
/// everything and re-runs that installer, so consumers can never strip the
/// wrapper's own wiring. Installation first drops any previously installed
/// internal listeners, which keeps repeated resets from stacking duplicates.
///
/// # Panics in listeners
///
/// Listeners are not isolated from each other. A panicking listener unwinds
/// through [`EventRouter::dispatch`] and later listeners for that event are
/// not called. No lock is held while listeners run.
pub struct EventRouter {
    channels: RwLock<HashMap<EventKind, Vec<Registration>>>,
    defaults: RwLock<Option<DefaultsInstaller>>,
    next_id: AtomicU64,
    tx: broadcast::Sender<PlayerEvent>,
}

impl EventRouter {
    /// Creates a router whose broadcast mirror holds up to `capacity` events.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is 0 (a `broadcast::channel` requirement).
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            channels: RwLock::new(HashMap::new()),
            defaults: RwLock::new(None),
            next_id: AtomicU64::new(1),
            tx,
        }
    }

    fn register(&self, kind: EventKind, listener: Listener, once: bool, internal: bool) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.channels.write().entry(kind).or_default().push(Registration {
            id,
            listener,
            once,
            internal,
        });
        id
    }

    /// Registers a listener for every event on `kind`.
    pub fn add_listener<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&PlayerEvent) + Send + Sync + 'static,
    {
        self.register(kind, Arc::new(listener), false, false)
    }

    /// Registers a listener that is removed after its first call.
    pub fn once<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&PlayerEvent) + Send + Sync + 'static,
    {
        self.register(kind, Arc::new(listener), true, false)
    }

    /// Registers one of the wrapper's internal listeners.
    ///
    /// Only meaningful from inside a defaults installer; internal listeners are
    /// replaced wholesale by [`EventRouter::install_default_listeners`].
    pub fn add_internal_listener<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&PlayerEvent) + Send + Sync + 'static,
    {
        self.register(kind, Arc::new(listener), false, true)
    }

    /// Removes a listener. Returns `false` if it was not registered on `kind`.
    pub fn remove_listener(&self, kind: EventKind, id: ListenerId) -> bool {
        let mut channels = self.channels.write();
        let Some(registrations) = channels.get_mut(&kind) else {
            return false;
        };
        let before = registrations.len();
        registrations.retain(|r| r.id != id);
        registrations.len() < before
    }

    /// Number of listeners (internal included) registered on `kind`.
    #[must_use]
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.channels.read().get(&kind).map_or(0, Vec::len)
    }

    /// Number of internal listeners across all channels.
    #[must_use]
    pub fn internal_listener_count(&self) -> usize {
        self.channels
            .read()
            .values()
            .flat_map(|regs| regs.iter())
            .filter(|r| r.internal)
            .count()
    }

    /// Sets the default listener installer and installs it immediately.
    pub fn set_default_listeners<F>(&self, installer: F)
    where
        F: Fn(&EventRouter) + Send + Sync + 'static,
    {
        *self.defaults.write() = Some(Arc::new(installer));
        self.install_default_listeners();
    }

    /// Replaces the internal listeners with a fresh set from the installer.
    ///
    /// No-op (beyond dropping stale internal listeners) before an installer is set.
    pub fn install_default_listeners(&self) {
        for registrations in self.channels.write().values_mut() {
            registrations.retain(|r| !r.internal);
        }

        let installer = self.defaults.read().clone();
        if let Some(installer) = installer {
            installer(self);
        }
    }

    /// Removes every listener, then re-installs the defaults.
    pub fn reset_listeners(&self) {
        self.channels.write().clear();
        self.install_default_listeners();
        log::debug!(
            "[EventRouter] Listeners reset ({} internal listener(s) installed)",
            self.internal_listener_count()
        );
    }

    /// Removes every listener and forgets the default installer.
    ///
    /// Used when the player closes; nothing is re-installed afterwards.
    pub fn clear(&self) {
        self.defaults.write().take();
        self.channels.write().clear();
    }

    /// Delivers `event` to every listener on its channel, in registration order.
    pub fn dispatch(&self, event: &PlayerEvent) {
        let kind = event.kind();

        let snapshot: Vec<Listener> = {
            let mut channels = self.channels.write();
            match channels.get_mut(&kind) {
                Some(registrations) => {
                    let snapshot = registrations.iter().map(|r| Arc::clone(&r.listener)).collect();
                    registrations.retain(|r| !r.once);
                    snapshot
                }
                None => Vec::new(),
            }
        };

        tracing::trace!(event = kind.as_str(), listeners = snapshot.len(), "dispatch");

        for listener in &snapshot {
            listener(event);
        }

        if let Err(e) = self.tx.send(event.clone()) {
            log::trace!("[EventRouter] No broadcast receivers: {}", e);
        }
    }

    /// Returns a receiver that sees every event dispatched from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.tx.subscribe()
    }

    /// Same as [`EventRouter::subscribe`], adapted into a `Stream`.
    pub fn stream(&self) -> BroadcastStream<PlayerEvent> {
        BroadcastStream::new(self.tx.subscribe())
    }
}
