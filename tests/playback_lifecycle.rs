//! Integration tests for the playback lifecycle: the sequencer and the
//! playback controller composed, driven by a scripted media backend.
//!
//! The backend counts live handles so every test doubles as a check of
//! the one-resource-at-a-time rule.

use async_trait::async_trait;
use hark::feed::{FeedSequencer, SeqCommand};
use hark::gateway::Article;
use hark::playback::{
    MediaBackend, MediaError, MediaHandle, PlaybackController, PollOutcome, PollTick,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

// ============================================================================
// Scripted backend
// ============================================================================

struct CountingBackend {
    live: Arc<AtomicUsize>,
    total_loads: Arc<AtomicUsize>,
    duration: Duration,
}

impl CountingBackend {
    fn new(duration: Duration) -> Self {
        Self {
            live: Arc::new(AtomicUsize::new(0)),
            total_loads: Arc::new(AtomicUsize::new(0)),
            duration,
        }
    }
}

#[async_trait]
impl MediaBackend for CountingBackend {
    async fn load(&self, _url: &str) -> Result<Box<dyn MediaHandle>, MediaError> {
        self.total_loads.fetch_add(1, Ordering::SeqCst);
        let previous = self.live.fetch_add(1, Ordering::SeqCst);
        assert_eq!(previous, 0, "second live resource acquired");
        Ok(Box::new(CountingMedia {
            live: self.live.clone(),
            duration: self.duration,
        }))
    }
}

struct CountingMedia {
    live: Arc<AtomicUsize>,
    duration: Duration,
}

impl MediaHandle for CountingMedia {
    fn duration(&self) -> Duration {
        self.duration
    }
    fn play(&mut self) {}
    fn pause(&mut self) {}
    fn stop(&mut self) {}
    fn seek(&mut self, _position: Duration) {}
}

impl Drop for CountingMedia {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

// ============================================================================
// Harness
// ============================================================================

fn article(id: &str) -> Article {
    Article {
        id: id.to_string(),
        category_id: "c1".to_string(),
        title: format!("Story {id}"),
        audio_url: format!("https://cdn.example.com/{id}.mp3"),
        thumbnail_url: String::new(),
    }
}

struct Harness {
    sequencer: FeedSequencer,
    controller: PlaybackController,
    backend: Arc<CountingBackend>,
    tx: mpsc::Sender<PollTick>,
    _rx: mpsc::Receiver<PollTick>,
}

impl Harness {
    fn new(track_secs: u64, replay_limit: u32) -> Self {
        let backend = Arc::new(CountingBackend::new(Duration::from_secs(track_secs)));
        let controller = PlaybackController::new(backend.clone() as Arc<dyn MediaBackend>);
        let (tx, rx) = mpsc::channel(16);
        Self {
            sequencer: FeedSequencer::new(replay_limit),
            controller,
            backend,
            tx,
            _rx: rx,
        }
    }

    /// Apply a sequencer command the way the app's event layer does,
    /// with the media load resolved inline.
    async fn apply(&mut self, command: SeqCommand) {
        match command {
            SeqCommand::Idle => {}
            SeqCommand::Release => self.controller.unload(),
            SeqCommand::Bind { index } => {
                self.controller.unload();
                let url = self.sequencer.items()[index].audio_url.clone();
                self.controller.load(&url).await.unwrap();
                self.controller.play(&self.tx.clone());
            }
            SeqCommand::Replay { .. } => {
                self.controller.play(&self.tx.clone());
            }
        }
    }

    /// Drive controller ticks until it reports Ended, then feed that to
    /// the sequencer and apply the verdict.
    async fn play_to_end(&mut self) {
        loop {
            let tick = PollTick {
                generation: self.controller.poll_generation(),
            };
            match self.controller.on_poll(tick) {
                PollOutcome::Progress => {}
                PollOutcome::Ended => break,
                PollOutcome::Stale => panic!("tick went stale mid-track"),
            }
        }
        let command = self.sequencer.on_ended();
        self.apply(command).await;
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_each_item_plays_twice_then_advances() {
    let mut h = Harness::new(3, 2);
    let command = h.sequencer.set_feed(vec![article("a"), article("b")]);
    h.apply(command).await;
    assert_eq!(h.sequencer.active_index(), 0);

    // First end: replay of the same item, no reacquisition.
    h.play_to_end().await;
    assert_eq!(h.sequencer.active_index(), 0);
    assert_eq!(h.sequencer.repeat_count(), 1);
    assert_eq!(h.backend.total_loads.load(Ordering::SeqCst), 1);

    // Second end: advance to the next item, one more acquisition.
    h.play_to_end().await;
    assert_eq!(h.sequencer.active_index(), 1);
    assert_eq!(h.sequencer.repeat_count(), 0);
    assert_eq!(h.backend.total_loads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_feed_wraps_from_last_to_first() {
    let mut h = Harness::new(2, 1);
    let command = h.sequencer.set_feed(vec![article("a"), article("b")]);
    h.apply(command).await;

    h.play_to_end().await;
    assert_eq!(h.sequencer.active_index(), 1);
    h.play_to_end().await;
    assert_eq!(h.sequencer.active_index(), 0, "last item wraps to first");
}

#[tokio::test]
async fn test_single_item_feed_loops_on_itself() {
    let mut h = Harness::new(2, 2);
    let command = h.sequencer.set_feed(vec![article("only")]);
    h.apply(command).await;

    h.play_to_end().await; // replay
    h.play_to_end().await; // "advance", which lands on the same item
    assert_eq!(h.sequencer.active_index(), 0);
    // Advancing rebinds even with one item: fresh resource, repeats reset.
    assert_eq!(h.sequencer.repeat_count(), 0);
    assert_eq!(h.backend.total_loads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_scroll_rebinds_and_resets_the_repeat_count() {
    let mut h = Harness::new(10, 2);
    let command = h.sequencer.set_feed(vec![article("a"), article("b"), article("c")]);
    h.apply(command).await;

    h.play_to_end().await; // a is now on its second pass
    assert_eq!(h.sequencer.repeat_count(), 1);

    let command = h.sequencer.on_scroll_settle(2);
    h.apply(command).await;
    assert_eq!(h.sequencer.active_index(), 2);
    assert_eq!(h.sequencer.repeat_count(), 0);
    assert_eq!(h.backend.live.load(Ordering::SeqCst), 1);

    // Ending c advances to a (wrap), not back to wherever we came from.
    h.play_to_end().await;
    h.play_to_end().await;
    assert_eq!(h.sequencer.active_index(), 0);
}

#[tokio::test]
async fn test_pause_preserves_position_across_resume() {
    let mut h = Harness::new(10, 2);
    let command = h.sequencer.set_feed(vec![article("a")]);
    h.apply(command).await;

    for _ in 0..4 {
        let tick = PollTick {
            generation: h.controller.poll_generation(),
        };
        assert_eq!(h.controller.on_poll(tick), PollOutcome::Progress);
    }
    assert_eq!(h.controller.elapsed(), Duration::from_secs(4));

    h.controller.pause();
    assert_eq!(h.controller.elapsed(), Duration::from_secs(4));

    h.controller.play(&h.tx.clone());
    assert_eq!(h.controller.elapsed(), Duration::from_secs(4));
}

#[tokio::test]
async fn test_emptied_feed_releases_the_resource() {
    let mut h = Harness::new(10, 2);
    let command = h.sequencer.set_feed(vec![article("a")]);
    h.apply(command).await;
    assert_eq!(h.backend.live.load(Ordering::SeqCst), 1);

    let command = h.sequencer.set_feed(Vec::new());
    assert_eq!(command, SeqCommand::Release);
    h.apply(command).await;
    assert_eq!(h.backend.live.load(Ordering::SeqCst), 0);
    assert!(!h.controller.is_loaded());
}

#[tokio::test]
async fn test_identical_feed_identity_keeps_playback_untouched() {
    let mut h = Harness::new(10, 2);
    let command = h.sequencer.set_feed(vec![article("a"), article("b")]);
    h.apply(command).await;

    let tick = PollTick {
        generation: h.controller.poll_generation(),
    };
    h.controller.on_poll(tick);
    let elapsed = h.controller.elapsed();

    // Refiltering to the same id sequence is a no-op.
    let command = h.sequencer.set_feed(vec![article("a"), article("b")]);
    assert_eq!(command, SeqCommand::Idle);
    h.apply(command).await;
    assert_eq!(h.controller.elapsed(), elapsed);
    assert_eq!(h.backend.total_loads.load(Ordering::SeqCst), 1);
}
