//! Estimated playback position.
//!
//! The collaborator only reports the playhead on state changes. Between those
//! reports [`PositionTracker`] advances its own estimate by a fixed step on a
//! timer that runs only while playing.
//!
//! Ticks and authoritative corrections serialize on one lock. Every stop or
//! restart bumps a generation counter; a tick whose generation is stale is
//! discarded, so a step never lands after the ticker was stopped.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;

use crate::events::PlayerEvent;
use crate::runtime::{TaskSpawner, TokioSpawner};

/// Callback invoked with the new position after every tick.
pub type TickCallback = Arc<dyn Fn(u64) + Send + Sync>;

#[derive(Default)]
struct TickState {
    position_ms: u64,
    generation: u64,
    ticker: Option<CancellationToken>,
}

impl TickState {
    /// Invalidates the running ticker, if any.
    fn halt(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        if let Some(cancel) = self.ticker.take() {
            cancel.cancel();
        }
    }
}

/// Tracks the playhead between authoritative events.
pub struct PositionTracker<S: TaskSpawner = TokioSpawner> {
    state: Arc<Mutex<TickState>>,
    interval: Duration,
    on_tick: Arc<RwLock<Option<TickCallback>>>,
    spawner: S,
}

impl<S: TaskSpawner> PositionTracker<S> {
    /// Creates a stopped tracker at position 0 ticking by `interval` once started.
    pub fn new(interval: Duration, spawner: S) -> Self {
        Self {
            state: Arc::new(Mutex::new(TickState::default())),
            interval,
            on_tick: Arc::new(RwLock::new(None)),
            spawner,
        }
    }

    /// Current estimate in milliseconds.
    #[must_use]
    pub fn position(&self) -> u64 {
        self.state.lock().position_ms
    }

    /// Overwrites the estimate without touching the ticker.
    pub fn set_position(&self, position_ms: u64) {
        self.state.lock().position_ms = position_ms;
    }

    /// Sets the callback run after each tick.
    pub fn set_on_tick<F>(&self, callback: F)
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        *self.on_tick.write() = Some(Arc::new(callback));
    }

    #[must_use]
    pub fn is_ticking(&self) -> bool {
        self.state.lock().ticker.is_some()
    }

    /// Starts advancing the position by `interval` every `interval`.
    ///
    /// Replaces a running ticker; the old one is cancelled first.
    pub fn start_ticking(&self, interval: Duration) {
        let mut state = self.state.lock();
        self.restart_locked(&mut state, interval);
    }

    /// Cancels the ticker if one is running.
    pub fn stop_ticking(&self) {
        self.state.lock().halt();
    }

    /// Reconciles the estimate with an authoritative event.
    pub fn apply(&self, event: &PlayerEvent) {
        let mut state = self.state.lock();

        let Some(position_ms) = event.authoritative_position() else {
            if matches!(
                event,
                PlayerEvent::Stopped { .. } | PlayerEvent::TrackChanged { .. }
            ) {
                state.halt();
                state.position_ms = 0;
            }
            return;
        };

        state.position_ms = position_ms;
        match event {
            PlayerEvent::Playing { .. } => self.restart_locked(&mut state, self.interval),
            PlayerEvent::Paused { .. } => state.halt(),
            _ => {}
        }
    }

    fn restart_locked(&self, state: &mut TickState, interval: Duration) {
        state.halt();
        let cancel = CancellationToken::new();
        state.ticker = Some(cancel.clone());
        let generation = state.generation;

        let shared = Arc::clone(&self.state);
        let on_tick = Arc::clone(&self.on_tick);
        let step = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);

        self.spawner.spawn(async move {
            let start = tokio::time::Instant::now() + interval;
            let mut ticks = tokio::time::interval_at(start, interval);
            ticks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticks.tick() => {
                        let now = {
                            let mut state = shared.lock();
                            if state.generation != generation {
                                break;
                            }
                            state.position_ms = state.position_ms.saturating_add(step);
                            state.position_ms
                        };
                        let callback = on_tick.read().clone();
                        if let Some(callback) = callback {
                            callback(now);
                        }
                    }
                }
            }
        });
    }
}

impl<S: TaskSpawner> Drop for PositionTracker<S> {
    fn drop(&mut self) {
        self.stop_ticking();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

    const TICK: Duration = Duration::from_millis(500);

    fn playing(position_ms: u64) -> PlayerEvent {
        PlayerEvent::Playing {
            play_request_id: 1,
            track_id: "spotify:track:4PTG3Z6ehGkBFwjybzWkR8".into(),
            position_ms,
        }
    }

    fn tracker() -> PositionTracker {
        PositionTracker::new(TICK, TokioSpawner::current())
    }

    #[tokio::test(start_paused = true)]
    async fn playing_then_two_ticks_reaches_two_seconds() {
        let tracker = tracker();
        tracker.apply(&playing(1000));

        tokio::time::sleep(Duration::from_millis(1010)).await;

        let position = tracker.position();
        assert!((1500..=2500).contains(&position), "position was {position}");
    }

    #[tokio::test(start_paused = true)]
    async fn paused_freezes_position() {
        let tracker = tracker();
        tracker.apply(&playing(0));
        tokio::time::sleep(Duration::from_millis(510)).await;

        tracker.apply(&PlayerEvent::Paused {
            play_request_id: 1,
            track_id: "t".into(),
            position_ms: 7_000,
        });
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(tracker.position(), 7_000);
        assert!(!tracker.is_ticking());
    }

    #[tokio::test(start_paused = true)]
    async fn restart_does_not_stack_tickers() {
        let tracker = tracker();
        tracker.apply(&playing(0));
        tracker.apply(&playing(0));
        tracker.apply(&playing(0));

        tokio::time::sleep(Duration::from_millis(1010)).await;
        assert_eq!(tracker.position(), 1000);
    }

    #[tokio::test(start_paused = true)]
    async fn track_change_resets_and_stops() {
        let tracker = tracker();
        tracker.apply(&playing(30_000));
        tracker.apply(&PlayerEvent::TrackChanged {
            audio_item: "{}".into(),
        });

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(tracker.position(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn seek_snaps_while_ticking() {
        let tracker = tracker();
        tracker.apply(&playing(0));
        tracker.apply(&PlayerEvent::Seeked {
            play_request_id: 1,
            track_id: "t".into(),
            position_ms: 60_000,
        });

        tokio::time::sleep(Duration::from_millis(510)).await;
        assert_eq!(tracker.position(), 60_500);
    }

    #[tokio::test(start_paused = true)]
    async fn loading_is_ignored() {
        let tracker = tracker();
        tracker.set_position(4_000);
        tracker.apply(&PlayerEvent::Loading {
            play_request_id: 1,
            track_id: "t".into(),
            position_ms: 0,
        });
        assert_eq!(tracker.position(), 4_000);
        assert!(!tracker.is_ticking());
    }

    #[tokio::test(start_paused = true)]
    async fn tick_callback_sees_each_step() {
        let tracker = tracker();
        let calls = Arc::new(AtomicUsize::new(0));
        let last = Arc::new(AtomicU64::new(0));
        {
            let calls = Arc::clone(&calls);
            let last = Arc::clone(&last);
            tracker.set_on_tick(move |pos| {
                calls.fetch_add(1, Ordering::SeqCst);
                last.store(pos, Ordering::SeqCst);
            });
        }

        tracker.start_ticking(TICK);
        tokio::time::sleep(Duration::from_millis(1510)).await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(last.load(Ordering::SeqCst), 1500);
    }

    #[tokio::test(start_paused = true)]
    async fn correction_snaps_while_ticking() {
        let tracker = tracker();
        tracker.apply(&playing(0));
        tokio::time::sleep(Duration::from_millis(510)).await;

        tracker.apply(&PlayerEvent::PositionCorrection {
            play_request_id: 1,
            track_id: "t".into(),
            position_ms: 90_000,
        });
        assert_eq!(tracker.position(), 90_000);
        assert!(tracker.is_ticking());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(tracker.position(), 90_500);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_on_tick_boundary_always_resets() {
        for trial in 0..200 {
            let tracker = tracker();
            tracker.apply(&playing(0));
            tokio::time::sleep(TICK).await;

            tracker.apply(&PlayerEvent::Stopped {
                play_request_id: 1,
                track_id: "t".into(),
            });
            assert_eq!(tracker.position(), 0, "trial {trial}");

            tokio::time::sleep(TICK * 2).await;
            assert_eq!(tracker.position(), 0, "trial {trial}");
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn pause_never_drifts_on_multi_thread_runtime() {
        let tick = Duration::from_millis(1);
        for trial in 0..100 {
            let tracker = PositionTracker::new(tick, TokioSpawner::current());
            tracker.apply(&playing(0));
            tokio::time::sleep(Duration::from_millis(3)).await;

            tracker.apply(&PlayerEvent::Paused {
                play_request_id: 1,
                track_id: "t".into(),
                position_ms: 7_000,
            });
            tokio::time::sleep(Duration::from_millis(5)).await;

            assert_eq!(tracker.position(), 7_000, "trial {trial}");
            assert!(!tracker.is_ticking());
        }
    }

    /// Spawns on the current runtime and counts what it was handed.
    #[derive(Clone, Default)]
    struct CountingSpawner {
        spawned: Arc<AtomicUsize>,
    }

    impl TaskSpawner for CountingSpawner {
        fn spawn<F>(&self, future: F)
        where
            F: Future<Output = ()> + Send + 'static,
        {
            self.spawned.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(future);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn ticker_runs_on_the_given_spawner() {
        let spawner = CountingSpawner::default();
        let tracker = PositionTracker::new(TICK, spawner.clone());

        tracker.apply(&playing(0));
        tracker.apply(&playing(0));
        tracker.apply(&PlayerEvent::Paused {
            play_request_id: 1,
            track_id: "t".into(),
            position_ms: 0,
        });

        assert_eq!(spawner.spawned.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn stop_without_ticker_is_noop() {
        let tracker = tracker();
        tracker.stop_ticking();
        assert!(!tracker.is_ticking());
    }
}
