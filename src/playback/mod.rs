//! Audio playback: the media backend seam and the per-item controller.
//!
//! The controller owns at most one media resource at a time and a
//! cancellable 1-second poll task that drives elapsed time. Backends are
//! pluggable behind [`backend::MediaBackend`]:
//!
//! - `HttpMediaBackend` (default): probes the media URL over HTTP and
//!   leaves position tracking to the controller's poll.
//! - `RodioBackend` (`audio` feature): real device output via rodio.

pub mod backend;
pub mod controller;

#[cfg(feature = "audio")]
pub mod rodio;

pub use backend::{HttpMediaBackend, MediaBackend, MediaError, MediaHandle};
pub use controller::{PlaybackController, PollOutcome, PollTick};

#[cfg(feature = "audio")]
pub use rodio::RodioBackend;
