//! Callback handle handed to the collaborator.
//!
//! The collaborator owns its own threads and may outlive the wrapper; the sink
//! only holds a weak reference to the router so a late event after the player
//! is dropped is discarded instead of keeping the router alive.

use std::sync::{Arc, Weak};

use super::{EventRouter, PlayerEvent};

/// Forwards collaborator events into an [`EventRouter`].
#[derive(Clone)]
pub struct EventSink {
    router: Weak<EventRouter>,
}

impl EventSink {
    /// Creates a sink feeding `router`.
    pub fn new(router: &Arc<EventRouter>) -> Self {
        Self {
            router: Arc::downgrade(router),
        }
    }

    /// Delivers one event. Returns `false` if the router is gone.
    pub fn emit(&self, event: PlayerEvent) -> bool {
        match self.router.upgrade() {
            Some(router) => {
                tracing::debug!(?event, "player_event");
                router.dispatch(&event);
                true
            }
            None => {
                log::trace!("[EventSink] Router dropped, discarding {}", event.kind());
                false
            }
        }
    }

    /// Parses and delivers a raw `{ "event": ..., ... }` record.
    ///
    /// Records with an unknown discriminant or mismatched fields are rejected
    /// without being dispatched.
    pub fn emit_record(&self, record: serde_json::Value) -> Result<bool, serde_json::Error> {
        let event = PlayerEvent::from_record(record)?;
        Ok(self.emit(event))
    }
}

impl std::fmt::Debug for EventSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSink")
            .field("connected", &(self.router.strong_count() > 0))
            .finish()
    }
}
