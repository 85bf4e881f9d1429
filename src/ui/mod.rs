//! Terminal User Interface module.
//!
//! - `loop_runner` - Main event loop and terminal management
//! - `input` - Keyboard input handling
//! - `events` - Background task event processing and task spawning
//! - `render` - Screen rendering dispatch
//! - `login` / `register` - Auth form widgets
//! - `categories` - Category picker widget
//! - `player` - Feed card stack and playback bar
//! - `status` - Status bar widget
//! - `help` - Help overlay

mod categories;
mod events;
mod help;
mod input;
mod login;
mod loop_runner;
mod player;
mod register;
mod render;
mod status;

pub use loop_runner::{run, Action};
