//! hark — terminal client for a short-form audio news feed.
//!
//! The library crate exists so integration tests can exercise the
//! application layers directly; the `hark` binary in `main.rs` is a thin
//! wrapper around [`ui::run`].

pub mod app;
pub mod categories;
pub mod config;
pub mod feed;
pub mod gateway;
pub mod playback;
pub mod session;
pub mod theme;
pub mod ui;
