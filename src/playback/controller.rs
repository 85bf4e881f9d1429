//! Per-item playback controller.
//!
//! Owns at most one live [`MediaHandle`] and the 1-second elapsed-time
//! poll. The poll is a cancellable tokio task held by the controller and
//! aborted on pause, stop, rebind, and drop — a tick can never outlive the
//! activation that spawned it. Ticks flow back through a channel carrying
//! a generation counter; [`PlaybackController::on_poll`] rejects ticks
//! from a superseded activation, so a stale tick arriving after a rebind
//! cannot advance the new item's clock.
//!
//! Reaching the end of the track — by the resource's own completion
//! signal or by the polled elapsed time crossing the duration — moves the
//! controller to a stopped state and yields exactly one
//! [`PollOutcome::Ended`] per activation.

use super::backend::{MediaBackend, MediaError, MediaHandle};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// One elapsed-time poll tick, tagged with the activation that spawned
/// the poll task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTick {
    pub generation: u64,
}

/// Result of applying a poll tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Tick from a superseded activation, or playback is not running.
    Stale,
    /// Elapsed time advanced; playback continues.
    Progress,
    /// Playback reached the end of the track. Raised once per activation.
    Ended,
}

pub struct PlaybackController {
    backend: Arc<dyn MediaBackend>,
    handle: Option<Box<dyn MediaHandle>>,
    elapsed: Duration,
    is_playing: bool,
    /// Ended already raised for the current activation.
    ended: bool,
    /// Bumped on every play and every rebind; stale ticks carry an older
    /// value and are dropped.
    generation: u64,
    poll_task: Option<JoinHandle<()>>,
}

impl PlaybackController {
    pub fn new(backend: Arc<dyn MediaBackend>) -> Self {
        Self {
            backend,
            handle: None,
            elapsed: Duration::ZERO,
            is_playing: false,
            ended: false,
            generation: 0,
            poll_task: None,
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.handle.is_some()
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn duration(&self) -> Option<Duration> {
        self.handle.as_ref().map(|h| h.duration())
    }

    /// Generation of the current activation. Exposed for tests that drive
    /// `on_poll` directly.
    pub fn poll_generation(&self) -> u64 {
        self.generation
    }

    /// Acquire the resource for `url`, releasing any previously held
    /// resource first. On failure the controller is left unloaded; the
    /// caller decides whether and when to retry.
    pub async fn load(&mut self, url: &str) -> Result<(), MediaError> {
        // Release-before-acquire: the old handle is stopped and dropped
        // before the new acquisition starts, so at no point do two live
        // resources exist.
        self.unload();
        let handle = self.backend.load(url).await?;
        self.handle = Some(handle);
        Ok(())
    }

    /// Adopt a handle acquired out-of-band, e.g. by a background load
    /// task. Releases any previously held resource first.
    pub fn attach(&mut self, handle: Box<dyn MediaHandle>) {
        self.unload();
        self.handle = Some(handle);
    }

    /// Release the held resource, if any. Stops playback first so a
    /// playing resource is never dropped live, and cancels the poll.
    pub fn unload(&mut self) {
        self.cancel_poll();
        if let Some(mut handle) = self.handle.take() {
            handle.stop();
        }
        self.is_playing = false;
        self.elapsed = Duration::ZERO;
        self.ended = false;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Start playback and the elapsed poll. No-op when unloaded or
    /// already playing.
    pub fn play(&mut self, tx: &mpsc::Sender<PollTick>) {
        if self.is_playing {
            return;
        }
        let Some(handle) = self.handle.as_mut() else {
            tracing::debug!("Play requested with no media loaded, ignoring");
            return;
        };

        handle.play();
        self.is_playing = true;
        self.ended = false;
        self.generation = self.generation.wrapping_add(1);
        let generation = self.generation;
        let tx = tx.clone();

        self.cancel_poll();
        self.poll_task = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick of a tokio interval fires immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                if tx.send(PollTick { generation }).await.is_err() {
                    break; // receiver gone, the app is shutting down
                }
            }
        }));
    }

    /// Halt playback and the poll, preserving the elapsed position.
    pub fn pause(&mut self) {
        if !self.is_playing {
            return;
        }
        if let Some(handle) = self.handle.as_mut() {
            handle.pause();
        }
        self.cancel_poll();
        self.is_playing = false;
    }

    /// Halt playback and the poll, resetting elapsed to zero.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.as_mut() {
            handle.stop();
        }
        self.cancel_poll();
        self.is_playing = false;
        self.elapsed = Duration::ZERO;
    }

    /// Reposition, clamped to `[0, duration]`. Valid paused or playing.
    pub fn seek(&mut self, position: Duration) {
        let Some(handle) = self.handle.as_mut() else {
            return;
        };
        let clamped = position.min(handle.duration());
        handle.seek(clamped);
        self.elapsed = clamped;
    }

    /// Apply one poll tick.
    pub fn on_poll(&mut self, tick: PollTick) -> PollOutcome {
        if tick.generation != self.generation || !self.is_playing {
            return PollOutcome::Stale;
        }
        let Some(handle) = self.handle.as_ref() else {
            return PollOutcome::Stale;
        };

        // The resource's own completion signal wins over the threshold.
        if handle.finished() {
            return self.finish();
        }

        // Prefer the resource's own clock when it has one.
        self.elapsed = match handle.position() {
            Some(position) => position,
            None => self.elapsed + Duration::from_secs(1),
        };
        if self.elapsed >= handle.duration() {
            return self.finish();
        }
        PollOutcome::Progress
    }

    /// Transition to stopped at end-of-track.
    fn finish(&mut self) -> PollOutcome {
        self.cancel_poll();
        self.is_playing = false;
        self.elapsed = Duration::ZERO;
        if let Some(handle) = self.handle.as_mut() {
            handle.stop();
        }
        if self.ended {
            PollOutcome::Stale
        } else {
            self.ended = true;
            PollOutcome::Ended
        }
    }

    fn cancel_poll(&mut self) {
        if let Some(task) = self.poll_task.take() {
            task.abort();
        }
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        // Teardown must leave neither a running poll nor a playing
        // resource behind.
        self.cancel_poll();
        if let Some(mut handle) = self.handle.take() {
            handle.stop();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::backend::{MediaBackend, MediaError, MediaHandle};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Backend whose handles are counted, so tests can assert the
    /// at-most-one-live-resource invariant.
    struct ScriptedBackend {
        live: Arc<AtomicUsize>,
        loads: Arc<AtomicUsize>,
        fail_next: Arc<AtomicBool>,
        finished: Arc<AtomicBool>,
        duration: Duration,
    }

    impl ScriptedBackend {
        fn new(duration: Duration) -> Self {
            Self {
                live: Arc::new(AtomicUsize::new(0)),
                loads: Arc::new(AtomicUsize::new(0)),
                fail_next: Arc::new(AtomicBool::new(false)),
                finished: Arc::new(AtomicBool::new(false)),
                duration,
            }
        }
    }

    #[async_trait]
    impl MediaBackend for ScriptedBackend {
        async fn load(&self, _url: &str) -> Result<Box<dyn MediaHandle>, MediaError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if self.fail_next.swap(false, Ordering::SeqCst) {
                return Err(MediaError::HttpStatus(404));
            }
            self.live.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(ScriptedMedia {
                live: self.live.clone(),
                finished: self.finished.clone(),
                duration: self.duration,
                playing: false,
            }))
        }
    }

    struct ScriptedMedia {
        live: Arc<AtomicUsize>,
        finished: Arc<AtomicBool>,
        duration: Duration,
        playing: bool,
    }

    impl MediaHandle for ScriptedMedia {
        fn duration(&self) -> Duration {
            self.duration
        }
        fn play(&mut self) {
            self.playing = true;
        }
        fn pause(&mut self) {
            self.playing = false;
        }
        fn stop(&mut self) {
            self.playing = false;
        }
        fn seek(&mut self, _position: Duration) {}
        fn finished(&self) -> bool {
            self.finished.load(Ordering::SeqCst)
        }
    }

    impl Drop for ScriptedMedia {
        fn drop(&mut self) {
            assert!(!self.playing, "resource dropped while playing");
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    fn tick_channel() -> (mpsc::Sender<PollTick>, mpsc::Receiver<PollTick>) {
        mpsc::channel(8)
    }

    /// Drive one controller-visible tick without waiting on the timer.
    fn manual_tick(controller: &mut PlaybackController) -> PollOutcome {
        controller.on_poll(PollTick {
            generation: controller.poll_generation(),
        })
    }

    #[tokio::test]
    async fn test_load_releases_previous_resource() {
        let backend = Arc::new(ScriptedBackend::new(Duration::from_secs(10)));
        let live = backend.live.clone();
        let mut controller = PlaybackController::new(backend.clone());

        controller.load("a.mp3").await.unwrap();
        assert_eq!(live.load(Ordering::SeqCst), 1);

        controller.load("b.mp3").await.unwrap();
        assert_eq!(live.load(Ordering::SeqCst), 1, "old handle must be released");
        assert_eq!(backend.loads.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_load_failure_leaves_unloaded() {
        let backend = Arc::new(ScriptedBackend::new(Duration::from_secs(10)));
        let live = backend.live.clone();
        let mut controller = PlaybackController::new(backend.clone());

        controller.load("a.mp3").await.unwrap();
        backend.fail_next.store(true, Ordering::SeqCst);

        let err = controller.load("missing.mp3").await.unwrap_err();
        assert!(matches!(err, MediaError::HttpStatus(404)));
        assert!(!controller.is_loaded());
        assert_eq!(
            live.load(Ordering::SeqCst),
            0,
            "previous resource released even when the new load fails"
        );
    }

    #[tokio::test]
    async fn test_play_without_load_is_noop() {
        let backend = Arc::new(ScriptedBackend::new(Duration::from_secs(10)));
        let mut controller = PlaybackController::new(backend);
        let (tx, _rx) = tick_channel();

        controller.play(&tx);
        assert!(!controller.is_playing());
    }

    #[tokio::test]
    async fn test_play_while_playing_is_noop() {
        let backend = Arc::new(ScriptedBackend::new(Duration::from_secs(10)));
        let mut controller = PlaybackController::new(backend);
        let (tx, _rx) = tick_channel();

        controller.load("a.mp3").await.unwrap();
        controller.play(&tx);
        let generation = controller.poll_generation();
        controller.play(&tx);
        assert_eq!(
            controller.poll_generation(),
            generation,
            "second play must not restart the poll"
        );
    }

    #[tokio::test]
    async fn test_pause_preserves_elapsed() {
        let backend = Arc::new(ScriptedBackend::new(Duration::from_secs(10)));
        let mut controller = PlaybackController::new(backend);
        let (tx, _rx) = tick_channel();

        controller.load("a.mp3").await.unwrap();
        controller.play(&tx);
        manual_tick(&mut controller);
        manual_tick(&mut controller);
        manual_tick(&mut controller);
        assert_eq!(controller.elapsed(), Duration::from_secs(3));

        controller.pause();
        assert!(!controller.is_playing());
        assert_eq!(controller.elapsed(), Duration::from_secs(3));

        controller.play(&tx);
        assert_eq!(
            controller.elapsed(),
            Duration::from_secs(3),
            "resume must continue from the paused position"
        );
    }

    #[tokio::test]
    async fn test_stop_resets_elapsed() {
        let backend = Arc::new(ScriptedBackend::new(Duration::from_secs(10)));
        let mut controller = PlaybackController::new(backend);
        let (tx, _rx) = tick_channel();

        controller.load("a.mp3").await.unwrap();
        controller.play(&tx);
        manual_tick(&mut controller);
        controller.stop();
        assert_eq!(controller.elapsed(), Duration::ZERO);
        assert!(!controller.is_playing());
    }

    #[tokio::test]
    async fn test_threshold_crossing_raises_ended_once() {
        let backend = Arc::new(ScriptedBackend::new(Duration::from_secs(3)));
        let mut controller = PlaybackController::new(backend);
        let (tx, _rx) = tick_channel();

        controller.load("a.mp3").await.unwrap();
        controller.play(&tx);

        assert_eq!(manual_tick(&mut controller), PollOutcome::Progress);
        assert_eq!(manual_tick(&mut controller), PollOutcome::Progress);
        assert_eq!(manual_tick(&mut controller), PollOutcome::Ended);
        assert!(!controller.is_playing());
        assert_eq!(controller.elapsed(), Duration::ZERO);

        // Any further tick is stale: the activation produced its one Ended.
        assert_eq!(manual_tick(&mut controller), PollOutcome::Stale);
    }

    #[tokio::test]
    async fn test_completion_signal_beats_threshold() {
        let backend = Arc::new(ScriptedBackend::new(Duration::from_secs(100)));
        let finished = backend.finished.clone();
        let mut controller = PlaybackController::new(backend);
        let (tx, _rx) = tick_channel();

        controller.load("a.mp3").await.unwrap();
        controller.play(&tx);
        assert_eq!(manual_tick(&mut controller), PollOutcome::Progress);

        finished.store(true, Ordering::SeqCst);
        assert_eq!(manual_tick(&mut controller), PollOutcome::Ended);
    }

    #[tokio::test]
    async fn test_stale_generation_rejected() {
        let backend = Arc::new(ScriptedBackend::new(Duration::from_secs(10)));
        let mut controller = PlaybackController::new(backend);
        let (tx, _rx) = tick_channel();

        controller.load("a.mp3").await.unwrap();
        controller.play(&tx);
        let old = controller.poll_generation();

        controller.pause();
        controller.play(&tx);

        let outcome = controller.on_poll(PollTick { generation: old });
        assert_eq!(outcome, PollOutcome::Stale);
        assert_eq!(controller.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_seek_clamps_to_duration() {
        let backend = Arc::new(ScriptedBackend::new(Duration::from_secs(30)));
        let mut controller = PlaybackController::new(backend);

        controller.load("a.mp3").await.unwrap();
        controller.seek(Duration::from_secs(500));
        assert_eq!(controller.elapsed(), Duration::from_secs(30));

        controller.seek(Duration::from_secs(5));
        assert_eq!(controller.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_replay_after_ended_raises_ended_again() {
        let backend = Arc::new(ScriptedBackend::new(Duration::from_secs(2)));
        let mut controller = PlaybackController::new(backend);
        let (tx, _rx) = tick_channel();

        controller.load("a.mp3").await.unwrap();
        controller.play(&tx);
        manual_tick(&mut controller);
        assert_eq!(manual_tick(&mut controller), PollOutcome::Ended);

        // Replay: a fresh activation gets its own Ended.
        controller.play(&tx);
        manual_tick(&mut controller);
        assert_eq!(manual_tick(&mut controller), PollOutcome::Ended);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_task_emits_ticks_on_schedule() {
        let backend = Arc::new(ScriptedBackend::new(Duration::from_secs(10)));
        let mut controller = PlaybackController::new(backend);
        let (tx, mut rx) = tick_channel();

        controller.load("a.mp3").await.unwrap();
        controller.play(&tx);

        // Paused tokio time auto-advances when every task is idle, so the
        // interval fires without real waiting.
        let tick = rx.recv().await.unwrap();
        assert_eq!(tick.generation, controller.poll_generation());
        assert_eq!(controller.on_poll(tick), PollOutcome::Progress);
        assert_eq!(controller.elapsed(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_cancels_poll_task() {
        let backend = Arc::new(ScriptedBackend::new(Duration::from_secs(10)));
        let mut controller = PlaybackController::new(backend);
        let (tx, mut rx) = tick_channel();

        controller.load("a.mp3").await.unwrap();
        controller.play(&tx);
        let first = rx.recv().await.unwrap();
        controller.on_poll(first);

        controller.pause();
        drop(tx);
        // The aborted task sends nothing further; the channel drains to
        // closure instead of producing a tick.
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_unload_releases_resource() {
        let backend = Arc::new(ScriptedBackend::new(Duration::from_secs(10)));
        let live = backend.live.clone();
        let mut controller = PlaybackController::new(backend);
        let (tx, _rx) = tick_channel();

        controller.load("a.mp3").await.unwrap();
        controller.play(&tx);
        controller.unload();

        assert_eq!(live.load(Ordering::SeqCst), 0);
        assert!(!controller.is_loaded());
        assert_eq!(controller.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_drop_releases_resource() {
        let backend = Arc::new(ScriptedBackend::new(Duration::from_secs(10)));
        let live = backend.live.clone();
        let (tx, _rx) = tick_channel();

        {
            let mut controller = PlaybackController::new(backend);
            controller.load("a.mp3").await.unwrap();
            controller.play(&tx);
        }
        assert_eq!(live.load(Ordering::SeqCst), 0);
    }
}
