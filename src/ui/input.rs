//! Keyboard input handling.
//!
//! Dispatches on the current screen, with the alert and help overlays
//! intercepting input first.

use crate::app::{App, AppEvent, Screen, Tab};
use crate::playback::PollTick;
use crate::theme::ThemeVariant;
use crossterm::event::{KeyCode, KeyModifiers};
use std::time::Duration;
use tokio::sync::mpsc;

use super::events::{
    apply_seq_command, spawn_bootstrap_fetch, spawn_login, spawn_media_load, spawn_register,
};
use super::Action;

/// Seek step for the left/right arrow keys.
const SEEK_STEP: Duration = Duration::from_secs(5);

/// Main input dispatch function.
pub(super) fn handle_input(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
    poll_tx: &mpsc::Sender<PollTick>,
) -> Action {
    // Ctrl+C always quits, whatever is on screen.
    if modifiers.contains(KeyModifiers::CONTROL) && code == KeyCode::Char('c') {
        return Action::Quit;
    }

    // The alert overlay swallows everything except dismissal.
    if app.alert.is_some() {
        if matches!(code, KeyCode::Enter | KeyCode::Esc) {
            app.dismiss_alert();
        }
        return Action::Continue;
    }

    if app.show_help {
        if matches!(code, KeyCode::Char('?') | KeyCode::Esc | KeyCode::Char('q')) {
            app.show_help = false;
        }
        return Action::Continue;
    }

    match app.screen {
        Screen::Loading => handle_loading(code),
        Screen::Login => handle_login(app, code, modifiers, event_tx),
        Screen::Register => handle_register(app, code, event_tx),
        Screen::Categories => handle_category_picker(app, code, event_tx, poll_tx),
        Screen::Home => handle_home(app, code, event_tx, poll_tx),
    }
}

fn handle_loading(code: KeyCode) -> Action {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        _ => Action::Continue,
    }
}

// ============================================================================
// Auth forms
// ============================================================================

fn handle_login(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    event_tx: &mpsc::Sender<AppEvent>,
) -> Action {
    if modifiers.contains(KeyModifiers::CONTROL) {
        match code {
            KeyCode::Char('r') => app.screen = Screen::Register,
            KeyCode::Char('v') => app.login_form.show_password = !app.login_form.show_password,
            _ => {}
        }
        return Action::Continue;
    }

    match code {
        KeyCode::Esc => return Action::Quit,
        KeyCode::Tab | KeyCode::Down | KeyCode::Up => app.login_form.next_field(),
        KeyCode::Backspace => app.login_form.backspace(),
        KeyCode::Enter => {
            if app.login_form.submitting {
                return Action::Continue;
            }
            // Invalid fields block submission; no request leaves the app.
            if app.login_form.validate() {
                spawn_login(app, event_tx);
            } else {
                app.set_status("Fix the highlighted fields");
            }
        }
        KeyCode::Char(c) if !c.is_control() => app.login_form.push_char(c),
        _ => {}
    }
    Action::Continue
}

fn handle_register(app: &mut App, code: KeyCode, event_tx: &mpsc::Sender<AppEvent>) -> Action {
    match code {
        KeyCode::Esc => {
            app.register_form = Default::default();
            app.screen = Screen::Login;
        }
        KeyCode::Tab | KeyCode::Down | KeyCode::Up => app.register_form.next_field(),
        KeyCode::Backspace => app.register_form.backspace(),
        KeyCode::Enter => {
            if app.register_form.submitting {
                return Action::Continue;
            }
            if app.register_form.validate() {
                spawn_register(app, event_tx);
            } else {
                app.set_status("Fix the highlighted fields");
            }
        }
        KeyCode::Char(c) if !c.is_control() => app.register_form.push_char(c),
        _ => {}
    }
    Action::Continue
}

// ============================================================================
// Category picking
// ============================================================================

/// First-run picker: choose categories, then Enter mounts the feed.
fn handle_category_picker(
    app: &mut App,
    code: KeyCode,
    event_tx: &mpsc::Sender<AppEvent>,
    poll_tx: &mpsc::Sender<PollTick>,
) -> Action {
    match code {
        KeyCode::Char('q') => return Action::Quit,
        KeyCode::Char('?') => app.show_help = true,
        KeyCode::Down | KeyCode::Char('j') => move_category_cursor(app, 1),
        KeyCode::Up | KeyCode::Char('k') => move_category_cursor(app, -1),
        KeyCode::Char(' ') => toggle_category_under_cursor(app),
        KeyCode::Enter => {
            if app.selection.is_empty() {
                app.set_status("Select at least one category");
            } else {
                app.screen = Screen::Home;
                app.tab = Tab::Feed;
                let command = app.remount_feed();
                apply_seq_command(app, command, event_tx, poll_tx);
            }
        }
        _ => {}
    }
    Action::Continue
}

fn move_category_cursor(app: &mut App, delta: isize) {
    let len = app.categories.len();
    if len == 0 {
        return;
    }
    let cursor = app.category_cursor as isize + delta;
    app.category_cursor = cursor.clamp(0, len as isize - 1) as usize;
}

fn toggle_category_under_cursor(app: &mut App) {
    if let Some(category) = app.categories.get(app.category_cursor) {
        let id = category.id.clone();
        app.selection.toggle(&id);
    }
}

// ============================================================================
// Home
// ============================================================================

fn handle_home(
    app: &mut App,
    code: KeyCode,
    event_tx: &mpsc::Sender<AppEvent>,
    poll_tx: &mpsc::Sender<PollTick>,
) -> Action {
    // Screen-wide keys first.
    match code {
        KeyCode::Char('q') => return Action::Quit,
        KeyCode::Char('?') => {
            app.show_help = true;
            return Action::Continue;
        }
        KeyCode::Tab => {
            app.switch_tab(app.tab.next());
            return Action::Continue;
        }
        KeyCode::BackTab => {
            app.switch_tab(app.tab.prev());
            return Action::Continue;
        }
        KeyCode::Char('1') => {
            app.switch_tab(Tab::Feed);
            return Action::Continue;
        }
        KeyCode::Char('2') => {
            app.switch_tab(Tab::Saved);
            return Action::Continue;
        }
        KeyCode::Char('3') => {
            app.switch_tab(Tab::Categories);
            return Action::Continue;
        }
        KeyCode::Char('4') => {
            app.switch_tab(Tab::Settings);
            return Action::Continue;
        }
        // Logout works from any tab.
        KeyCode::Char('o') => {
            app.logout();
            return Action::Continue;
        }
        _ => {}
    }

    match app.tab {
        Tab::Feed => handle_feed_tab(app, code, event_tx, poll_tx),
        Tab::Categories => handle_categories_tab(app, code, event_tx, poll_tx),
        Tab::Settings => handle_settings_tab(app, code),
        Tab::Saved => {}
    }
    Action::Continue
}

fn handle_feed_tab(
    app: &mut App,
    code: KeyCode,
    event_tx: &mpsc::Sender<AppEvent>,
    poll_tx: &mpsc::Sender<PollTick>,
) {
    match code {
        KeyCode::Down | KeyCode::Char('j') => settle_on(app, next_index(app, 1), event_tx, poll_tx),
        KeyCode::Up | KeyCode::Char('k') => settle_on(app, next_index(app, -1), event_tx, poll_tx),
        KeyCode::Char('g') => settle_on(app, 0, event_tx, poll_tx),
        KeyCode::Char('G') => {
            settle_on(app, app.sequencer.len().saturating_sub(1), event_tx, poll_tx)
        }
        KeyCode::Char(' ') => toggle_playback(app, poll_tx),
        KeyCode::Left => {
            let target = app.controller.elapsed().saturating_sub(SEEK_STEP);
            app.controller.seek(target);
        }
        KeyCode::Right => {
            let target = app.controller.elapsed() + SEEK_STEP;
            app.controller.seek(target);
        }
        KeyCode::Char('l') => app.like_active(),
        KeyCode::Char('s') => app.share_active(),
        KeyCode::Char('r') => {
            if app.fetch_in_flight {
                app.set_status("Refresh already running");
            } else {
                app.set_status("Refreshing...");
                spawn_bootstrap_fetch(app, event_tx);
            }
        }
        KeyCode::Enter => {
            // Retry a failed media load for the current item.
            if !app.controller.is_loaded() {
                if let Some(article) = app.sequencer.active_item() {
                    let url = article.audio_url.clone();
                    spawn_media_load(app, url, event_tx);
                }
            }
        }
        _ => {}
    }
}

fn next_index(app: &App, delta: isize) -> usize {
    let len = app.sequencer.len();
    if len == 0 {
        return 0;
    }
    let target = app.sequencer.active_index() as isize + delta;
    target.clamp(0, len as isize - 1) as usize
}

fn settle_on(
    app: &mut App,
    index: usize,
    event_tx: &mpsc::Sender<AppEvent>,
    poll_tx: &mpsc::Sender<PollTick>,
) {
    let command = app.sequencer.on_scroll_settle(index);
    apply_seq_command(app, command, event_tx, poll_tx);
}

fn toggle_playback(app: &mut App, poll_tx: &mpsc::Sender<PollTick>) {
    if app.controller.is_playing() {
        app.controller.pause();
    } else if app.controller.is_loaded() {
        // An early space cancels the pending delayed auto-play so it
        // cannot fire on top of a manual start (or a manual pause).
        app.pending_autoplay = None;
        app.controller.play(poll_tx);
    }
}

/// Live multi-select: every toggle refilters and remounts the feed.
fn handle_categories_tab(
    app: &mut App,
    code: KeyCode,
    event_tx: &mpsc::Sender<AppEvent>,
    poll_tx: &mpsc::Sender<PollTick>,
) {
    match code {
        KeyCode::Down | KeyCode::Char('j') => move_category_cursor(app, 1),
        KeyCode::Up | KeyCode::Char('k') => move_category_cursor(app, -1),
        KeyCode::Char(' ') => {
            toggle_category_under_cursor(app);
            let command = app.remount_feed();
            apply_seq_command(app, command, event_tx, poll_tx);
        }
        KeyCode::Enter => app.switch_tab(Tab::Feed),
        _ => {}
    }
}

fn handle_settings_tab(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Char('t') => {
            let next = match app.theme_variant {
                ThemeVariant::Dark => ThemeVariant::Light,
                ThemeVariant::Light => ThemeVariant::Dark,
            };
            app.set_theme(next);
            app.set_status(format!("Theme: {}", next.name()));
        }
        _ => {}
    }
}
