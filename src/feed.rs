//! Feed sequencer: the ordered, filtered list of feed items, the active
//! index, and the auto-replay policy.
//!
//! The sequencer is a pure state machine. It never touches the playback
//! controller directly; every transition returns a [`SeqCommand`] that the
//! app layer applies to the controller. This keeps the replay/advance
//! policy testable without any media resources in play.
//!
//! Policy: each item auto-plays `replay_limit` times (default 2) before
//! the sequencer advances. Advancing is circular — the item after the last
//! one is item 0 — so a single-item feed repeats indefinitely.

use crate::gateway::Article;

/// Default number of times an item plays before the feed advances.
pub const DEFAULT_REPLAY_LIMIT: u32 = 2;

/// Controller command emitted by a sequencer transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeqCommand {
    /// Release any current resource, acquire the item at `index`, and
    /// schedule auto-play after the configured delay.
    Bind { index: usize },
    /// Restart playback of the already-bound item at `index` after the
    /// configured delay (no resource reacquisition).
    Replay { index: usize },
    /// The feed is empty: release any held resource.
    Release,
    /// No controller action required.
    Idle,
}

/// Sequencer over the filtered feed.
///
/// Invariant: whenever the feed is nonempty, `active` is in
/// `[0, items.len() - 1]`.
#[derive(Debug)]
pub struct FeedSequencer {
    items: Vec<Article>,
    active: usize,
    repeats: u32,
    replay_limit: u32,
}

impl FeedSequencer {
    pub fn new(replay_limit: u32) -> Self {
        Self {
            items: Vec::new(),
            active: 0,
            repeats: 0,
            // A limit of 0 would never advance; treat it as "play once".
            replay_limit: replay_limit.max(1),
        }
    }

    pub fn items(&self) -> &[Article] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn replay_limit(&self) -> u32 {
        self.replay_limit
    }

    pub fn repeat_count(&self) -> u32 {
        self.repeats
    }

    pub fn active_item(&self) -> Option<&Article> {
        self.items.get(self.active)
    }

    /// Replace the filtered feed.
    ///
    /// A feed with the same item identity (same ids in the same order) is
    /// a no-op: scrolling position and repeat count survive a refetch that
    /// returned identical content. Any identity change is a fresh
    /// activation: the active index resets to 0; this also covers the
    /// case where the previous index would fall outside the new bounds.
    /// An empty feed always releases, even when it was already empty.
    pub fn set_feed(&mut self, items: Vec<Article>) -> SeqCommand {
        // An empty feed always releases, bypassing the identity shortcut:
        // zero items must never leave a resource bound.
        if items.is_empty() {
            self.items = items;
            self.active = 0;
            self.repeats = 0;
            return SeqCommand::Release;
        }

        let same_identity = self.items.len() == items.len()
            && self.items.iter().zip(&items).all(|(a, b)| a.id == b.id);
        if same_identity {
            return SeqCommand::Idle;
        }

        self.items = items;
        self.active = 0;
        self.repeats = 0;
        SeqCommand::Bind { index: 0 }
    }

    /// A scroll settled on item `index`.
    ///
    /// Settling on the already-active item, or on an out-of-range index
    /// (a settle event raced a filter change), does nothing.
    pub fn on_scroll_settle(&mut self, index: usize) -> SeqCommand {
        if index == self.active || index >= self.items.len() {
            return SeqCommand::Idle;
        }
        self.active = index;
        self.repeats = 0;
        SeqCommand::Bind { index }
    }

    /// The active item's playback ended.
    ///
    /// Below the replay limit the same item replays; at the limit the feed
    /// advances circularly and the repeat counter resets.
    pub fn on_ended(&mut self) -> SeqCommand {
        if self.items.is_empty() {
            return SeqCommand::Idle;
        }
        self.repeats += 1;
        if self.repeats < self.replay_limit {
            SeqCommand::Replay { index: self.active }
        } else {
            self.active = (self.active + 1) % self.items.len();
            self.repeats = 0;
            SeqCommand::Bind { index: self.active }
        }
    }
}

impl Default for FeedSequencer {
    fn default() -> Self {
        Self::new(DEFAULT_REPLAY_LIMIT)
    }
}
