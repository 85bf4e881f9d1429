//! Main event loop for the TUI.
//!
//! Multiplexes terminal input, background task events, playback poll
//! ticks, and a periodic timer.

use crate::app::{App, AppEvent, Screen, Tab};
use crate::playback::PollTick;
use anyhow::Result;
use crossterm::{
    event::Event,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use futures::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io::{self, Stdout};
use std::time::Duration;
use tokio::sync::mpsc;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

use super::events::{apply_seq_command, handle_app_event, spawn_session_resolve};
use super::input::handle_input;
use super::render::render;

/// Number of frames in the loading spinner animation.
const SPINNER_FRAMES: usize = 10;

/// Result of handling a key press event.
pub enum Action {
    /// Continue the event loop and process more events.
    Continue,
    /// Exit the application and restore the terminal.
    Quit,
}

/// Runs the TUI application event loop.
///
/// Uses `tokio::select!` to multiplex four event sources:
/// - **Terminal input**: key presses from crossterm's async event stream
/// - **Background tasks**: gateway fetches and media loads via `AppEvent`
/// - **Playback polls**: 1-second elapsed ticks from the controller's task
/// - **Periodic tick**: 250ms timer for status expiry, spinner animation,
///   and delayed auto-play
///
/// # Panic Safety
///
/// Installs a panic hook that restores terminal state before unwinding,
/// ensuring the terminal is not left in raw mode on panic.
pub async fn run(
    app: &mut App,
    event_tx: mpsc::Sender<AppEvent>,
    mut event_rx: mpsc::Receiver<AppEvent>,
) -> Result<()> {
    // Install panic hook BEFORE setting up terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic_info);
    }));

    let mut terminal = setup_terminal()?;
    let mut event_stream = crossterm::event::EventStream::new();

    // Resolve the stored session off the UI task; the Loading screen
    // shows until SessionResolved arrives.
    spawn_session_resolve(app, &event_tx);

    // Elapsed-time ticks from the playback controller's poll task.
    let (poll_tx, mut poll_rx) = mpsc::channel::<PollTick>(16);

    let mut tick_interval = tokio::time::interval(Duration::from_millis(250));

    // Signal handlers for graceful shutdown (Unix only)
    #[cfg(unix)]
    let mut sigterm = signal(SignalKind::terminate())?;
    #[cfg(unix)]
    let mut sigint = signal(SignalKind::interrupt())?;

    loop {
        if app.needs_redraw {
            terminal.draw(|f| render(f, app))?;
            app.needs_redraw = false;
        }

        // Drain all pending app events before handling more input, so
        // fetch and media-load results are processed promptly even during
        // rapid key repeat.
        while let Ok(event) = event_rx.try_recv() {
            app.needs_redraw = true;
            handle_app_event(app, event, &event_tx, &poll_tx);
        }

        #[cfg(unix)]
        let sigterm_fut = sigterm.recv();
        #[cfg(not(unix))]
        let sigterm_fut = std::future::pending::<Option<()>>();

        #[cfg(unix)]
        let sigint_fut = sigint.recv();
        #[cfg(not(unix))]
        let sigint_fut = std::future::pending::<Option<()>>();

        tokio::select! {
            biased;  // Process in order listed for predictable behavior

            _ = sigterm_fut => {
                tracing::info!("Received SIGTERM, shutting down gracefully");
                break;
            }

            _ = sigint_fut => {
                tracing::info!("Received SIGINT, shutting down gracefully");
                break;
            }

            maybe_event = event_stream.next() => {
                if let Some(Ok(Event::Key(key))) = maybe_event {
                    app.needs_redraw = true;
                    match handle_input(app, key.code, key.modifiers, &event_tx, &poll_tx) {
                        Action::Quit => break,
                        Action::Continue => {}
                    }
                    if app.should_quit {
                        break;
                    }
                }
            }

            Some(event) = event_rx.recv() => {
                app.needs_redraw = true;
                handle_app_event(app, event, &event_tx, &poll_tx);
            }

            Some(tick) = poll_rx.recv() => {
                handle_poll(app, tick, &event_tx, &poll_tx);
            }

            _ = tick_interval.tick() => {
                handle_tick(app, &poll_tx);
            }
        }
    }

    restore_terminal(terminal)?;
    Ok(())
}

/// Apply one playback poll tick and drive the sequencer on track end.
fn handle_poll(
    app: &mut App,
    tick: PollTick,
    event_tx: &mpsc::Sender<AppEvent>,
    poll_tx: &mpsc::Sender<PollTick>,
) {
    use crate::playback::PollOutcome;

    match app.controller.on_poll(tick) {
        PollOutcome::Stale => {}
        PollOutcome::Progress => {
            app.needs_redraw = true;
        }
        PollOutcome::Ended => {
            app.needs_redraw = true;
            let command = app.sequencer.on_ended();
            tracing::debug!(?command, "Track ended");
            apply_seq_command(app, command, event_tx, poll_tx);
        }
    }
}

/// Handle the periodic tick: status expiry, spinner animation, and the
/// delayed auto-play deadline.
fn handle_tick(app: &mut App, poll_tx: &mpsc::Sender<PollTick>) {
    app.clear_expired_status();

    if app.fetch_in_flight || app.screen == Screen::Loading {
        app.spinner_frame = (app.spinner_frame + 1) % SPINNER_FRAMES;
        app.needs_redraw = true;
    }

    if let Some(deadline) = app.pending_autoplay {
        if tokio::time::Instant::now() >= deadline {
            app.pending_autoplay = None;
            // The user may have navigated away while the delay ran.
            if app.screen == Screen::Home && app.tab == Tab::Feed {
                app.controller.play(poll_tx);
            }
            app.needs_redraw = true;
        }
    }
}

/// Set up the terminal for TUI rendering.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

/// Restore terminal to normal state.
fn restore_terminal(mut terminal: Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
