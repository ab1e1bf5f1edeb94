//! Task spawning abstraction.
//!
//! The player spawns three kinds of background work: the one-shot
//! initialization against the collaborator, the volume command worker and the
//! position ticker. [`Player`](crate::Player) and
//! [`PositionTracker`](crate::position::PositionTracker) are generic over
//! [`TaskSpawner`]; [`TokioSpawner`] is the default.

use std::future::Future;

/// Abstraction for spawning background tasks.
///
/// Spawned tasks run detached and must be driven by a Tokio runtime (they use
/// Tokio timers and channels). Cancellation is handled by the task itself.
pub trait TaskSpawner: Clone + Send + Sync + 'static {
    /// Spawns a future as a background task.
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static;
}

/// Tokio-based spawner.
///
/// Holds a runtime handle so events delivered from collaborator threads
/// (which have no runtime context of their own) can still start the ticker.
#[derive(Clone)]
pub struct TokioSpawner {
    handle: tokio::runtime::Handle,
}

impl TokioSpawner {
    /// Creates a new `TokioSpawner` with the given runtime handle.
    #[must_use]
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Creates a new `TokioSpawner` using the current runtime's handle.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    #[must_use]
    pub fn current() -> Self {
        Self {
            handle: tokio::runtime::Handle::current(),
        }
    }
}

impl TaskSpawner for TokioSpawner {
    fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handle.spawn(future);
    }
}
