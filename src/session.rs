//! Cookie-style session store.
//!
//! The backend's web client keeps `jwtToken` and `username` in cookies
//! scoped to the backend origin; this client keeps the same pair in a
//! single TOML record under the config directory, scoped to the configured
//! origin. The store is read exactly once at startup — screens receive the
//! resolved [`Session`] value and never re-read the file — and cleared
//! exactly once, on logout.
//!
//! Presence of a token is treated as authenticated. There is no local
//! expiry check; an invalid token simply fails at the gateway.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use url::Url;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Failed to read session file: {0}")]
    Read(std::io::Error),
    #[error("Failed to write session file: {0}")]
    Write(std::io::Error),
    #[error("Failed to clear session file: {0}")]
    Clear(std::io::Error),
    #[error("Failed to serialize session: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ============================================================================
// Session
// ============================================================================

/// The authenticated user's identity, immutable once read.
#[derive(Clone)]
pub struct Session {
    username: String,
    token: SecretString,
}

impl Session {
    pub fn new(username: String, token: SecretString) -> Self {
        Self { username, token }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn token(&self) -> &SecretString {
        &self.token
    }
}

/// Mask the token in Debug output to prevent secret leakage in logs.
impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("username", &self.username)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

/// On-disk shape of the session file.
#[derive(Serialize, Deserialize)]
struct SessionRecord {
    /// Origin the session was issued against; a record for a different
    /// backend is ignored on load (cookie scoping).
    origin: String,
    jwt_token: String,
    username: String,
    issued_at: DateTime<Utc>,
}

// ============================================================================
// Store
// ============================================================================

/// File-backed store for the session record.
#[derive(Clone)]
pub struct SessionStore {
    path: PathBuf,
    origin: String,
}

impl SessionStore {
    pub fn new(config_dir: &Path, origin: &Url) -> Self {
        Self {
            path: config_dir.join("session.toml"),
            origin: origin.as_str().trim_end_matches('/').to_string(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the stored session, if any.
    ///
    /// A missing file, a corrupt file, or a record scoped to a different
    /// origin all yield `None` — only a real I/O failure is an error.
    pub fn load(&self) -> Result<Option<Session>, SessionError> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(SessionError::Read(e)),
        };

        let record: SessionRecord = match toml::from_str(&content) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Corrupt session file, treating as logged out");
                return Ok(None);
            }
        };

        if record.origin != self.origin {
            tracing::warn!(
                stored = %record.origin,
                configured = %self.origin,
                "Session file is scoped to a different backend, ignoring"
            );
            return Ok(None);
        }

        tracing::info!(username = %record.username, "Restored session");
        Ok(Some(Session::new(
            record.username,
            SecretString::from(record.jwt_token),
        )))
    }

    /// Persist the session atomically (write-to-temp-then-rename) with
    /// user-only permissions on Unix.
    pub fn save(&self, session: &Session) -> Result<(), SessionError> {
        let record = SessionRecord {
            origin: self.origin.clone(),
            jwt_token: session.token().expose_secret().to_string(),
            username: session.username().to_string(),
            issued_at: Utc::now(),
        };
        let content = toml::to_string_pretty(&record)?;

        // Randomized temp filename: the destination is never left in a
        // partial state and the temp path cannot be predicted.
        use std::time::{SystemTime, UNIX_EPOCH};
        let random_suffix = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let temp_path = self.path.with_extension(format!("tmp.{:016x}", random_suffix));

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut temp_file = options.open(&temp_path).map_err(SessionError::Write)?;
        if let Err(e) = temp_file.write_all(content.as_bytes()) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(SessionError::Write(e));
        }
        if let Err(e) = temp_file.sync_all() {
            let _ = std::fs::remove_file(&temp_path);
            return Err(SessionError::Write(e));
        }
        drop(temp_file);

        if let Err(e) = std::fs::rename(&temp_path, &self.path) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(SessionError::Write(e));
        }

        tracing::info!(username = %session.username(), "Session saved");
        Ok(())
    }

    /// Destroy the stored session. The only teardown path; idempotent.
    pub fn clear(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!("Session cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SessionError::Clear(e)),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_store(name: &str) -> (SessionStore, PathBuf) {
        let dir = std::env::temp_dir().join(format!("hark_session_test_{}", name));
        std::fs::create_dir_all(&dir).unwrap();
        let origin = Url::parse("https://backend.example.com").unwrap();
        (SessionStore::new(&dir, &origin), dir)
    }

    fn test_session() -> Session {
        Session::new("asha".to_string(), SecretString::from("jwt-abc"))
    }

    #[test]
    fn test_load_missing_file_is_none() {
        let (store, dir) = test_store("missing");
        assert!(store.load().unwrap().is_none());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_save_then_load_round_trip() {
        let (store, dir) = test_store("roundtrip");
        store.save(&test_session()).unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.username(), "asha");
        assert_eq!(loaded.token().expose_secret(), "jwt-abc");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_save_overwrites_previous_session() {
        let (store, dir) = test_store("overwrite");
        store.save(&test_session()).unwrap();
        store
            .save(&Session::new(
                "ravi".to_string(),
                SecretString::from("jwt-new"),
            ))
            .unwrap();

        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.username(), "ravi");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_clear_removes_session() {
        let (store, dir) = test_store("clear");
        store.save(&test_session()).unwrap();
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_clear_is_idempotent() {
        let (store, dir) = test_store("clear_idem");
        store.clear().unwrap();
        store.clear().unwrap();
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_corrupt_file_treated_as_logged_out() {
        let (store, dir) = test_store("corrupt");
        std::fs::write(store.path(), "not valid toml [[[").unwrap();
        assert!(store.load().unwrap().is_none());
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_different_origin_ignored() {
        let (store, dir) = test_store("origin");
        store.save(&test_session()).unwrap();

        let other_origin = Url::parse("https://other.example.com").unwrap();
        let other_store = SessionStore::new(&dir, &other_origin);
        assert!(other_store.load().unwrap().is_none());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_debug_masks_token() {
        let session = test_session();
        let debug_output = format!("{:?}", session);
        assert!(!debug_output.contains("jwt-abc"));
        assert!(debug_output.contains("[REDACTED]"));
    }

    #[cfg(unix)]
    #[test]
    fn test_session_file_is_user_only() {
        use std::os::unix::fs::PermissionsExt;
        let (store, dir) = test_store("perms");
        store.save(&test_session()).unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);

        std::fs::remove_dir_all(&dir).ok();
    }
}
