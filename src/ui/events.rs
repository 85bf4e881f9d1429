//! Background task event processing and task spawning.
//!
//! All gateway calls and media loads run as spawned tasks that report
//! back through the `AppEvent` channel; nothing here blocks the event
//! loop. Responses carry the generation counter from spawn time and are
//! dropped when a newer epoch has started.

use crate::app::{App, AppEvent, Screen, Tab};
use crate::feed::SeqCommand;
use crate::playback::PollTick;
use crate::session::Session;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Run a future, converting a panic into an error message instead of
/// tearing down the runtime.
async fn catch_task_panic<F, T>(future: F) -> Result<T, String>
where
    F: std::future::Future<Output = T>,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|panic| {
            if let Some(s) = panic.downcast_ref::<&'static str>() {
                s.to_string()
            } else if let Some(s) = panic.downcast_ref::<String>() {
                s.clone()
            } else {
                "Unknown panic".to_string()
            }
        })
}

// ============================================================================
// Event handling
// ============================================================================

pub(super) fn handle_app_event(
    app: &mut App,
    event: AppEvent,
    event_tx: &mpsc::Sender<AppEvent>,
    poll_tx: &mpsc::Sender<PollTick>,
) {
    match event {
        AppEvent::SessionResolved(Some(session)) => {
            app.enter_session(session);
            spawn_bootstrap_fetch(app, event_tx);
        }
        AppEvent::SessionResolved(None) => {
            app.screen = Screen::Login;
        }

        AppEvent::LoginCompleted(Ok(session)) => {
            if let Err(e) = app.session_store.save(&session) {
                tracing::warn!(error = %e, "Failed to persist session");
                app.set_status("Signed in (session not saved)");
            }
            app.enter_session(session);
            spawn_bootstrap_fetch(app, event_tx);
        }
        AppEvent::LoginCompleted(Err(e)) => {
            tracing::warn!(error = %e, "Login failed");
            app.login_form.submitting = false;
            app.show_alert(format!("Login failed: {e}"));
        }

        AppEvent::RegisterCompleted(Ok(())) => {
            app.register_form = Default::default();
            app.screen = Screen::Login;
            app.set_status("Account created. Log in to continue.");
        }
        AppEvent::RegisterCompleted(Err(e)) => {
            tracing::warn!(error = %e, "Registration failed");
            app.register_form.submitting = false;
            app.show_alert(format!("Registration failed: {e}"));
        }

        AppEvent::CategoriesLoaded { generation, result } => {
            if generation != app.fetch_generation {
                tracing::debug!(generation, current = app.fetch_generation, "Dropping stale category response");
                return;
            }
            match result {
                Ok(categories) => {
                    app.category_cursor = app.category_cursor.min(categories.len().saturating_sub(1));
                    app.categories = std::sync::Arc::new(categories);
                }
                Err(e) => {
                    app.fetch_in_flight = false;
                    app.show_alert(format!("Could not load categories: {e}"));
                }
            }
        }

        AppEvent::ArticlesLoaded { generation, result } => {
            if generation != app.fetch_generation {
                tracing::debug!(generation, current = app.fetch_generation, "Dropping stale article response");
                return;
            }
            app.fetch_in_flight = false;
            match result {
                Ok(articles) => {
                    tracing::info!(count = articles.len(), "Articles loaded");
                    app.articles = std::sync::Arc::new(articles);
                    // On the Home screen this is a refresh: remount so a
                    // changed feed rebinds and an unchanged one is left
                    // alone.
                    if app.screen == Screen::Home {
                        let command = app.remount_feed();
                        apply_seq_command(app, command, event_tx, poll_tx);
                    }
                }
                Err(e) => {
                    app.show_alert(format!("Could not load articles: {e}"));
                }
            }
        }

        AppEvent::MediaLoaded { generation, result } => {
            if generation != app.media_load_generation {
                tracing::debug!(generation, current = app.media_load_generation, "Dropping stale media load");
                return;
            }
            app.media_load_handle = None;
            match result {
                Ok(handle) => {
                    app.controller.attach(handle);
                    if app.screen == Screen::Home && app.tab == Tab::Feed {
                        app.pending_autoplay = Some(Instant::now() + app.autoplay_delay);
                    }
                }
                Err(e) => {
                    // The item stays mounted; the user can retry or scroll
                    // past it.
                    tracing::warn!(error = %e, "Media load failed");
                    app.set_status(format!("Audio unavailable: {e}"));
                }
            }
        }

        AppEvent::TaskPanicked { task, error } => {
            tracing::error!(task, error = %error, "Background task panicked");
            app.fetch_in_flight = false;
            app.show_alert(format!("Internal error in {task}: {error}"));
        }
    }
}

/// Drive the playback controller from a sequencer verdict.
pub(super) fn apply_seq_command(
    app: &mut App,
    command: SeqCommand,
    event_tx: &mpsc::Sender<AppEvent>,
    _poll_tx: &mpsc::Sender<PollTick>,
) {
    match command {
        SeqCommand::Idle => {}
        SeqCommand::Release => {
            app.pending_autoplay = None;
            app.cancel_media_load();
            app.controller.unload();
        }
        SeqCommand::Bind { index } => {
            app.pending_autoplay = None;
            // Silence the outgoing item right away; the new resource
            // arrives via MediaLoaded.
            app.controller.unload();
            if let Some(article) = app.sequencer.items().get(index) {
                let url = article.audio_url.clone();
                spawn_media_load(app, url, event_tx);
            }
        }
        SeqCommand::Replay { index } => {
            tracing::debug!(index, repeat = app.sequencer.repeat_count(), "Replaying item");
            app.pending_autoplay = Some(Instant::now() + app.autoplay_delay);
        }
    }
}

// ============================================================================
// Task spawning
// ============================================================================

/// Fetch categories then articles for the active session.
pub(super) fn spawn_bootstrap_fetch(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) {
    let Some(session) = &app.session else {
        tracing::warn!("Fetch requested with no active session");
        return;
    };
    let token = session.token().clone();
    let generation = app.next_fetch_generation();
    let gateway = app.gateway.clone();
    let tx = event_tx.clone();
    app.fetch_in_flight = true;

    tokio::spawn(async move {
        let tx_panic = tx.clone();
        let outcome = catch_task_panic(async {
            let result = gateway.categories(&token).await;
            if tx
                .send(AppEvent::CategoriesLoaded { generation, result })
                .await
                .is_err()
            {
                return;
            }
            let result = gateway.articles(&token).await;
            let _ = tx.send(AppEvent::ArticlesLoaded { generation, result }).await;
        })
        .await;

        if let Err(error) = outcome {
            let _ = tx_panic
                .send(AppEvent::TaskPanicked { task: "fetch", error })
                .await;
        }
    });
}

pub(super) fn spawn_login(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) {
    app.login_form.submitting = true;
    let phone = app.login_form.phone.clone();
    let password = app.login_form.password.clone();
    let gateway = app.gateway.clone();
    let tx = event_tx.clone();

    tokio::spawn(async move {
        let tx_panic = tx.clone();
        let outcome = catch_task_panic(async {
            let result = gateway
                .login(&phone, &password)
                .await
                .map(|token| Session::new(phone, token));
            let _ = tx.send(AppEvent::LoginCompleted(result)).await;
        })
        .await;

        if let Err(error) = outcome {
            let _ = tx_panic
                .send(AppEvent::TaskPanicked { task: "login", error })
                .await;
        }
    });
}

pub(super) fn spawn_register(app: &mut App, event_tx: &mpsc::Sender<AppEvent>) {
    app.register_form.submitting = true;
    let name = app.register_form.name.trim().to_string();
    let phone = app.register_form.phone.clone();
    let password = app.register_form.password.clone();
    let gateway = app.gateway.clone();
    let tx = event_tx.clone();

    tokio::spawn(async move {
        let tx_panic = tx.clone();
        let outcome = catch_task_panic(async {
            let result = gateway.register(&name, &phone, &password).await;
            let _ = tx.send(AppEvent::RegisterCompleted(result)).await;
        })
        .await;

        if let Err(error) = outcome {
            let _ = tx_panic
                .send(AppEvent::TaskPanicked { task: "register", error })
                .await;
        }
    });
}

/// Acquire the media resource for `url` in the background. Any in-flight
/// load for a previous item is aborted and its response superseded.
pub(super) fn spawn_media_load(app: &mut App, url: String, event_tx: &mpsc::Sender<AppEvent>) {
    let generation = app.next_media_load_generation();
    let backend = app.media_backend.clone();
    let tx = event_tx.clone();

    tracing::debug!(url = %url, generation, "Spawning media load");

    app.media_load_handle = Some(tokio::spawn(async move {
        let result = backend.load(&url).await;
        if tx
            .send(AppEvent::MediaLoaded { generation, result })
            .await
            .is_err()
        {
            tracing::warn!("Failed to deliver media load result (receiver dropped)");
        }
    }));
}

/// Resolve the stored session off the UI task at startup.
pub(super) fn spawn_session_resolve(app: &App, event_tx: &mpsc::Sender<AppEvent>) {
    let store = app.session_store.clone();
    let tx = event_tx.clone();

    tokio::task::spawn_blocking(move || {
        let session = match store.load() {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read stored session");
                None
            }
        };
        let _ = tx.blocking_send(AppEvent::SessionResolved(session));
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::gateway::{build_client, Article, Gateway};
    use crate::playback::HttpMediaBackend;
    use crate::session::SessionStore;
    use secrecy::SecretString;
    use std::sync::Arc;
    use std::time::Duration;
    use url::Url;

    fn test_app() -> App {
        let config = Config::default();
        let client = build_client().expect("client");
        let base = Url::parse("https://api.example.com").expect("url");
        let gateway = Gateway::new(client.clone(), base.clone(), Duration::from_secs(5));
        let dir = std::env::temp_dir().join(format!("hark_events_test_{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("test dir");
        let store = SessionStore::new(&dir, &base);
        let backend = Arc::new(HttpMediaBackend::new(client, Duration::from_secs(5), 128));
        App::new(&config, gateway, store, backend)
    }

    #[tokio::test]
    async fn logout_discards_in_flight_fetch_responses() {
        let mut app = test_app();
        app.enter_session(Session::new(
            "9876543210".to_string(),
            SecretString::from("jwt"),
        ));
        let generation = app.next_fetch_generation();
        app.fetch_in_flight = true;

        app.logout();

        let (event_tx, _event_rx) = mpsc::channel(4);
        let (poll_tx, _poll_rx) = mpsc::channel(4);
        let articles = vec![Article {
            id: "a1".to_string(),
            category_id: "c1".to_string(),
            title: "Late arrival".to_string(),
            audio_url: "https://cdn.example.com/a1.mp3".to_string(),
            thumbnail_url: String::new(),
        }];
        handle_app_event(
            &mut app,
            AppEvent::ArticlesLoaded {
                generation,
                result: Ok(articles),
            },
            &event_tx,
            &poll_tx,
        );

        assert!(app.articles.is_empty());
        assert!(!app.fetch_in_flight);
        assert_eq!(app.screen, Screen::Login);
    }
}
