//! Player lifecycle state machine.
//!
//! ```text
//! Uninitialized -> Initializing -> Ready -> Closed
//!                             \-> InitializationFailed -> Closed
//! ```
//!
//! Every gated player operation calls [`Lifecycle::guard`] before doing
//! anything else. State lives in a `tokio::sync::watch` channel so async
//! callers can wait for initialization to settle.

use serde::Serialize;
use tokio::sync::watch;

use crate::error::{PlayerError, PlayerResult};

/// Where the player is in its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Uninitialized,
    Initializing,
    Ready,
    InitializationFailed,
    Closed,
}

impl LifecycleState {
    /// True once initialization has either succeeded or failed (or the player closed).
    #[must_use]
    pub fn is_settled(self) -> bool {
        !matches!(self, Self::Uninitialized | Self::Initializing)
    }

    fn can_transition_to(self, next: Self) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Uninitialized, Initializing)
                | (Initializing, Ready)
                | (Initializing, InitializationFailed)
                | (Ready, Closed)
                | (InitializationFailed, Closed)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Initializing => "initializing",
            Self::Ready => "ready",
            Self::InitializationFailed => "initialization_failed",
            Self::Closed => "closed",
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Owns the player's [`LifecycleState`].
pub struct Lifecycle {
    tx: watch::Sender<LifecycleState>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(LifecycleState::Uninitialized);
        Self { tx }
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        *self.tx.borrow()
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state() == LifecycleState::Ready
    }

    /// Moves to `next` if the transition is legal. Returns whether it happened.
    fn transition(&self, next: LifecycleState) -> bool {
        let mut from = None;
        let changed = self.tx.send_if_modified(|state| {
            if state.can_transition_to(next) {
                from = Some(*state);
                *state = next;
                true
            } else {
                false
            }
        });

        match from {
            Some(from) => log::debug!("[Lifecycle] {} -> {}", from, next),
            None => log::warn!(
                "[Lifecycle] Ignoring transition {} -> {}",
                self.state(),
                next
            ),
        }
        changed
    }

    pub fn begin_initializing(&self) -> bool {
        self.transition(LifecycleState::Initializing)
    }

    pub fn mark_ready(&self) -> bool {
        self.transition(LifecycleState::Ready)
    }

    pub fn mark_failed(&self) -> bool {
        self.transition(LifecycleState::InitializationFailed)
    }

    pub fn mark_closed(&self) -> bool {
        self.transition(LifecycleState::Closed)
    }

    /// Fails with [`PlayerError::NotInitialized`] unless the player is `Ready`.
    pub fn guard(&self, method: &'static str) -> PlayerResult<()> {
        match self.state() {
            LifecycleState::Ready => Ok(()),
            state => Err(PlayerError::NotInitialized { method, state }),
        }
    }

    /// Resolves with the first settled state (see [`LifecycleState::is_settled`]).
    pub async fn wait_settled(&self) -> LifecycleState {
        let mut rx = self.tx.subscribe();
        let settled = match rx.wait_for(|state| state.is_settled()).await {
            Ok(state) => *state,
            // Sender lives in `self`, so this only happens mid-drop.
            Err(_) => self.state(),
        };
        settled
    }
}
