use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use url::Url;

use hark::app::{App, AppEvent};
use hark::config::Config;
use hark::gateway::{build_client, Gateway};
use hark::playback::{HttpMediaBackend, MediaBackend};
use hark::session::SessionStore;
use hark::ui;

/// Get the config directory path (~/.config/hark/)
fn get_config_dir() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".config").join("hark"))
}

#[derive(Parser, Debug)]
#[command(name = "hark", about = "Terminal client for the hark audio news feed")]
struct Args {
    /// Override the backend origin from config
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Clear the stored session before starting
    #[arg(long)]
    logout: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for debug logging (set RUST_LOG to enable)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    // Set up config directory
    let config_dir = get_config_dir()?;
    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;
        println!("Created config directory: {}", config_dir.display());
    }

    // User-only access: the directory holds the session token.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        match std::fs::metadata(&config_dir) {
            Ok(metadata) => {
                let mut perms = metadata.permissions();
                perms.set_mode(0o700);
                if let Err(e) = std::fs::set_permissions(&config_dir, perms) {
                    tracing::warn!(
                        path = %config_dir.display(),
                        error = %e,
                        "Failed to set config directory permissions to 0700"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(
                    path = %config_dir.display(),
                    error = %e,
                    "Failed to read config directory metadata"
                );
            }
        }
    }

    let config = Config::load(&config_dir.join("config.toml")).context("Failed to load config")?;

    let base_url = args.base_url.as_deref().unwrap_or(&config.base_url);
    let base_url = Url::parse(base_url)
        .with_context(|| format!("Invalid base URL '{base_url}'"))?;

    let session_store = SessionStore::new(&config_dir, &base_url);

    if args.logout {
        session_store.clear().context("Failed to clear session")?;
        println!("Session cleared.");
    }

    let timeout = Duration::from_secs(config.request_timeout_secs);
    let client = build_client().context("Failed to build HTTP client")?;
    let gateway = Gateway::new(client.clone(), base_url, timeout);

    let media_backend = build_media_backend(&config, client, timeout);

    let mut app = App::new(&config, gateway, session_store, media_backend);

    // Create event channel for background tasks
    let (event_tx, event_rx) = mpsc::channel::<AppEvent>(32);

    // Run the TUI
    ui::run(&mut app, event_tx, event_rx).await?;

    println!("Goodbye!");
    Ok(())
}

#[cfg(feature = "audio")]
fn build_media_backend(
    config: &Config,
    client: reqwest::Client,
    timeout: Duration,
) -> Arc<dyn MediaBackend> {
    match hark::playback::RodioBackend::new(client.clone(), timeout) {
        Ok(backend) => Arc::new(backend),
        Err(e) => {
            tracing::warn!(error = %e, "Audio device unavailable, falling back to silent playback");
            Arc::new(HttpMediaBackend::new(
                client,
                timeout,
                config.assumed_bitrate_kbps,
            ))
        }
    }
}

#[cfg(not(feature = "audio"))]
fn build_media_backend(
    config: &Config,
    client: reqwest::Client,
    timeout: Duration,
) -> Arc<dyn MediaBackend> {
    Arc::new(HttpMediaBackend::new(
        client,
        timeout,
        config.assumed_bitrate_kbps,
    ))
}
