//! Remote content gateway: typed wrappers over the backend's REST surface.
//!
//! Four endpoints exist — login, register, list categories, list articles.
//! The gateway attaches the `Authorization: Token <jwt>` header on the
//! authenticated reads, enforces a hard per-request timeout and a response
//! body size cap, and extracts the server's `{message}` error body when a
//! request fails. There is deliberately no retry or backoff: failures are
//! surfaced to the user, who re-initiates the action.

use futures::StreamExt;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Hard cap on any response body. The largest real payload is the article
/// list (a few hundred small JSON objects).
const MAX_BODY_SIZE: usize = 2 * 1024 * 1024; // 2MB

/// Default per-request timeout, overridable via config.
pub const DEFAULT_TIMEOUT_SECS: u64 = 20;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Request timed out")]
    Timeout,
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    /// Non-2xx response. `message` is the server's `{message}` body when
    /// one was sent, otherwise the HTTP status line.
    #[error("{message}")]
    Status { status: u16, message: String },
    #[error("Malformed response body: {0}")]
    InvalidBody(String),
    #[error("Response too large (exceeds {0} bytes)")]
    ResponseTooLarge(usize),
}

// ============================================================================
// Wire Types
// ============================================================================

/// A content category as returned by `GET /get-all-categorys`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(rename = "image")]
    pub image_url: String,
}

/// A feed item as returned by `GET /get-all-articles`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Article {
    #[serde(rename = "_id")]
    pub id: String,
    pub category_id: String,
    pub title: String,
    #[serde(rename = "audio_file")]
    pub audio_url: String,
    #[serde(rename = "thumbnail")]
    pub thumbnail_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    phone_number: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    jwt_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterRequest<'a> {
    name: &'a str,
    phone_number: &'a str,
    password: &'a str,
}

/// Error payload the backend sends alongside non-2xx statuses.
#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

// ============================================================================
// HTTP Client Construction
// ============================================================================

/// Create a custom redirect policy with loop detection and limited hops.
///
/// - Limits redirects to 3 hops maximum
/// - Detects redirect loops (same URL appearing twice in chain)
/// - Logs redirect chain for debugging
fn create_redirect_policy() -> reqwest::redirect::Policy {
    reqwest::redirect::Policy::custom(|attempt| {
        if attempt.previous().len() >= 3 {
            return attempt.error("Too many redirects (max 3)");
        }

        let url = attempt.url();
        for prev in attempt.previous() {
            if prev.as_str() == url.as_str() {
                return attempt.error("Redirect loop detected");
            }
        }

        tracing::debug!(
            from = %attempt.previous().last().map(|u| u.as_str()).unwrap_or("initial"),
            to = %url,
            hop = attempt.previous().len() + 1,
            "Following redirect"
        );

        attempt.follow()
    })
}

/// Build the shared HTTP client used for all gateway calls.
pub fn build_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .redirect(create_redirect_policy())
        .user_agent(concat!("hark/", env!("CARGO_PKG_VERSION")))
        .build()
}

// ============================================================================
// Gateway
// ============================================================================

/// Handle to the remote backend. Cheap to clone (reqwest clients share a
/// connection pool internally).
#[derive(Clone)]
pub struct Gateway {
    client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl Gateway {
    pub fn new(client: reqwest::Client, base_url: Url, timeout: Duration) -> Self {
        Self {
            client,
            base_url,
            timeout,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `POST /user-login-post` — exchange phone number + password for a JWT.
    pub async fn login(
        &self,
        phone_number: &str,
        password: &str,
    ) -> Result<SecretString, GatewayError> {
        let url = self.endpoint("user-login-post");
        let request = self.client.post(url).json(&LoginRequest {
            phone_number,
            password,
        });

        let body = self.execute(request).await?;
        let response: LoginResponse = serde_json::from_str(&body)
            .map_err(|e| GatewayError::InvalidBody(e.to_string()))?;
        tracing::info!("Login succeeded");
        Ok(SecretString::from(response.jwt_token))
    }

    /// `POST /user-registration` — create an account. The success body is
    /// empty; only the status matters.
    pub async fn register(
        &self,
        name: &str,
        phone_number: &str,
        password: &str,
    ) -> Result<(), GatewayError> {
        let url = self.endpoint("user-registration");
        let request = self.client.post(url).json(&RegisterRequest {
            name,
            phone_number,
            password,
        });

        self.execute(request).await?;
        tracing::info!("Registration succeeded");
        Ok(())
    }

    /// `GET /get-all-categorys` (sic — the backend route is misspelled).
    ///
    /// Category image URLs that point at the backend's development host
    /// are rewritten to the configured origin.
    pub async fn categories(&self, token: &SecretString) -> Result<Vec<Category>, GatewayError> {
        let url = self.endpoint("get-all-categorys");
        let request = self.authorized(self.client.get(url), token);

        let body = self.execute(request).await?;
        let mut categories: Vec<Category> = serde_json::from_str(&body)
            .map_err(|e| GatewayError::InvalidBody(e.to_string()))?;
        for category in &mut categories {
            category.image_url = normalize_asset_url(&self.base_url, &category.image_url);
        }
        tracing::debug!(count = categories.len(), "Fetched categories");
        Ok(categories)
    }

    /// `GET /get-all-articles` — the unfiltered feed, in server order.
    pub async fn articles(&self, token: &SecretString) -> Result<Vec<Article>, GatewayError> {
        let url = self.endpoint("get-all-articles");
        let request = self.authorized(self.client.get(url), token);

        let body = self.execute(request).await?;
        let articles: Vec<Article> = serde_json::from_str(&body)
            .map_err(|e| GatewayError::InvalidBody(e.to_string()))?;
        tracing::debug!(count = articles.len(), "Fetched articles");
        Ok(articles)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), path)
    }

    /// Attach the backend's auth header scheme: `Authorization: Token <jwt>`.
    fn authorized(
        &self,
        request: reqwest::RequestBuilder,
        token: &SecretString,
    ) -> reqwest::RequestBuilder {
        request.header(
            "Authorization",
            format!("Token {}", token.expose_secret()),
        )
    }

    /// Send a request with the gateway timeout, map non-2xx statuses to
    /// [`GatewayError::Status`], and return the size-capped body text.
    async fn execute(&self, request: reqwest::RequestBuilder) -> Result<String, GatewayError> {
        let response = tokio::time::timeout(self.timeout, request.send())
            .await
            .map_err(|_| GatewayError::Timeout)?
            .map_err(GatewayError::Network)?;

        let status = response.status();
        let body = read_limited_text(response, MAX_BODY_SIZE).await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.message)
                .unwrap_or_else(|| format!("Request failed with status {}", status.as_u16()));
            tracing::warn!(status = status.as_u16(), message = %message, "Gateway request failed");
            return Err(GatewayError::Status {
                status: status.as_u16(),
                message,
            });
        }

        Ok(body)
    }
}

/// Read a response body as UTF-8 text, aborting once it exceeds `limit`.
async fn read_limited_text(
    response: reqwest::Response,
    limit: usize,
) -> Result<String, GatewayError> {
    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(GatewayError::Network)?;
        if bytes.len() + chunk.len() > limit {
            return Err(GatewayError::ResponseTooLarge(limit));
        }
        bytes.extend_from_slice(&chunk);
    }

    String::from_utf8(bytes).map_err(|_| GatewayError::InvalidBody("invalid UTF-8".to_string()))
}

/// Rewrite asset URLs recorded against the backend's development host to
/// the configured origin. Anything else passes through untouched.
fn normalize_asset_url(base: &Url, asset: &str) -> String {
    const DEV_HOST: &str = "http://localhost:4000";
    if let Some(rest) = asset.strip_prefix(DEV_HOST) {
        format!("{}{}", base.as_str().trim_end_matches('/'), rest)
    } else {
        asset.to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================
