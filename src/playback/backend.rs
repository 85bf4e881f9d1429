//! Media backend seam.
//!
//! The playback controller talks to audio resources exclusively through
//! these traits, never through a concrete audio stack. That keeps the
//! replay/advance machinery testable with a scripted backend and lets the
//! default build run without an audio device at all.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Fallback track length when the media server reports neither a duration
/// header nor a Content-Length.
pub const FALLBACK_DURATION: Duration = Duration::from_secs(30);

// ============================================================================
// Error Types
// ============================================================================

/// Failure to acquire a media resource. The controller stays unloaded on
/// any of these; there is no automatic retry.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Media request timed out")]
    Timeout,
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Media unavailable: status {0}")]
    HttpStatus(u16),
    #[error("Undecodable media: {0}")]
    Decode(String),
    #[error("Audio device unavailable: {0}")]
    Device(String),
}

// ============================================================================
// Traits
// ============================================================================

/// Acquires media resources. `load` is the only acquisition path; a
/// returned handle is the live resource, released on drop.
#[async_trait]
pub trait MediaBackend: Send + Sync {
    async fn load(&self, url: &str) -> Result<Box<dyn MediaHandle>, MediaError>;
}

/// One acquired media resource.
///
/// Implementations must tolerate any call order the controller produces
/// (e.g. `stop` on a never-started handle). Dropping a handle releases the
/// underlying resource; the controller guarantees it stops playback first.
pub trait MediaHandle: Send {
    /// Track length, known or estimated at load time.
    fn duration(&self) -> Duration;

    fn play(&mut self);

    fn pause(&mut self);

    /// Halt and rewind to the start.
    fn stop(&mut self);

    /// Reposition. The controller clamps `position` to `[0, duration]`
    /// before calling.
    fn seek(&mut self, position: Duration);

    /// The resource's own playback clock, when it has one. Backends
    /// without a clock return `None` and the controller counts seconds
    /// itself.
    fn position(&self) -> Option<Duration> {
        None
    }

    /// The resource's own completion signal, for backends that can detect
    /// the end of the track themselves. The controller also watches its
    /// polled elapsed time crossing `duration`, so `false` here is always
    /// safe.
    fn finished(&self) -> bool {
        false
    }
}

// ============================================================================
// HTTP Probe Backend
// ============================================================================

/// Default backend: validates the media reference with a GET and derives a
/// duration, leaving the playback clock to the controller's poll.
///
/// Duration comes from an `X-Content-Duration` header (seconds) when the
/// server sends one, otherwise it is estimated from Content-Length at the
/// configured bitrate. The response body is not downloaded.
pub struct HttpMediaBackend {
    client: reqwest::Client,
    timeout: Duration,
    assumed_bitrate_kbps: u32,
}

impl HttpMediaBackend {
    pub fn new(client: reqwest::Client, timeout: Duration, assumed_bitrate_kbps: u32) -> Self {
        Self {
            client,
            timeout,
            // Avoid a divide-by-zero on a nonsense config value.
            assumed_bitrate_kbps: assumed_bitrate_kbps.max(8),
        }
    }

    fn estimate_duration(&self, response: &reqwest::Response) -> Duration {
        if let Some(value) = response
            .headers()
            .get("x-content-duration")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<f64>().ok())
        {
            if value.is_finite() && value > 0.0 {
                return Duration::from_secs_f64(value);
            }
        }

        match response.content_length() {
            Some(len) if len > 0 => {
                let secs = (len * 8) / (u64::from(self.assumed_bitrate_kbps) * 1000);
                Duration::from_secs(secs.max(1))
            }
            _ => {
                tracing::debug!("Media response carries no length, using fallback duration");
                FALLBACK_DURATION
            }
        }
    }
}

#[async_trait]
impl MediaBackend for HttpMediaBackend {
    async fn load(&self, url: &str) -> Result<Box<dyn MediaHandle>, MediaError> {
        let response = tokio::time::timeout(self.timeout, self.client.get(url).send())
            .await
            .map_err(|_| MediaError::Timeout)?
            .map_err(MediaError::Network)?;

        if !response.status().is_success() {
            return Err(MediaError::HttpStatus(response.status().as_u16()));
        }

        let duration = self.estimate_duration(&response);
        tracing::debug!(url = %url, duration_secs = duration.as_secs(), "Media probe succeeded");

        // Headers are all we need; the body is dropped unread.
        Ok(Box::new(ProbedMedia {
            duration,
            playing: false,
        }))
    }
}

/// Handle produced by [`HttpMediaBackend`]. Tracks play state only; the
/// controller's poll is the clock.
struct ProbedMedia {
    duration: Duration,
    playing: bool,
}

impl MediaHandle for ProbedMedia {
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
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_backend() -> HttpMediaBackend {
        HttpMediaBackend::new(reqwest::Client::new(), Duration::from_secs(5), 128)
    }

    #[tokio::test]
    async fn test_load_success_estimates_from_content_length() {
        let server = MockServer::start().await;
        // 160_000 bytes at 128 kbps = 10 seconds
        Mock::given(method("GET"))
            .and(path("/a.mp3"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 160_000]))
            .mount(&server)
            .await;

        let backend = test_backend();
        let handle = backend
            .load(&format!("{}/a.mp3", server.uri()))
            .await
            .unwrap();
        assert_eq!(handle.duration(), Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_load_prefers_duration_header() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/a.mp3"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("x-content-duration", "42.5")
                    .set_body_bytes(vec![0u8; 160_000]),
            )
            .mount(&server)
            .await;

        let backend = test_backend();
        let handle = backend
            .load(&format!("{}/a.mp3", server.uri()))
            .await
            .unwrap();
        assert_eq!(handle.duration(), Duration::from_secs_f64(42.5));
    }

    #[tokio::test]
    async fn test_load_missing_media_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let backend = test_backend();
        let err = backend
            .load(&format!("{}/gone.mp3", server.uri()))
            .await
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(err, MediaError::HttpStatus(404)));
    }

    #[tokio::test]
    async fn test_load_unreachable_host_fails() {
        let backend = test_backend();
        // Reserved TEST-NET address; connection refused or timeout either way.
        let err = backend
            .load("http://127.0.0.1:1/a.mp3")
            .await
            .map(|_| ())
            .unwrap_err();
        assert!(matches!(
            err,
            MediaError::Network(_) | MediaError::Timeout
        ));
    }
}
