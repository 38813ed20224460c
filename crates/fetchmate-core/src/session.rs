//! Session persistence and in-memory session state.
//!
//! Stores the authenticated identity in `<home>/session.json` with
//! restricted permissions (0600). Tokens are never logged. All reads and
//! writes go through [`SessionStore`]; disk and memory are kept consistent
//! by every mutating call, and observers can subscribe to state changes.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::config::paths;

/// The authenticated user as returned by the backend.
///
/// Opaque beyond display: server-assigned fields (e.g. `role`) are carried
/// along without interpretation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub username: String,
    pub email: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// The client's record of the authenticated identity and its credentials.
///
/// All three fields travel together: a session is either fully present or
/// absent. The persisted shape makes partially-authenticated states
/// unrepresentable — a payload missing any field fails to parse and is
/// treated as no session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub user: UserRecord,
    pub access: String,
    pub refresh: String,
}

/// Owns the session state and its on-disk copy.
pub struct SessionStore {
    path: PathBuf,
    state: watch::Sender<Option<Session>>,
}

impl SessionStore {
    /// Opens the store at the default session path.
    pub fn open() -> Self {
        Self::open_at(paths::session_path())
    }

    /// Opens a store backed by `path`, restoring any persisted session.
    pub fn open_at(path: PathBuf) -> Self {
        let initial = restore(&path);
        let (state, _) = watch::channel(initial);
        Self { path, state }
    }

    /// Current in-memory session, if any.
    pub fn current(&self) -> Option<Session> {
        self.state.borrow().clone()
    }

    /// Whether a session is present.
    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_some()
    }

    /// Subscribes to session state changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<Session>> {
        self.state.subscribe()
    }

    /// Persists `session` — all fields together — and publishes it.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written. In-memory state is
    /// only updated once the write succeeds.
    pub fn save(&self, session: Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let contents =
            serde_json::to_string_pretty(&session).context("Failed to serialize session")?;

        // Write with restricted permissions
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600)
                .open(&self.path)
                .with_context(|| format!("Failed to open {} for writing", self.path.display()))?;
            file.write_all(contents.as_bytes())
                .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        }

        #[cfg(not(unix))]
        {
            fs::write(&self.path, contents)
                .with_context(|| format!("Failed to write to {}", self.path.display()))?;
        }

        self.state.send_replace(Some(session));
        Ok(())
    }

    /// Removes the persisted session and resets in-memory state to absent.
    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("Failed to remove {}", self.path.display()))?;
        }
        self.state.send_replace(None);
        Ok(())
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Reads the persisted session, treating anything malformed as absent.
fn restore(path: &Path) -> Option<Session> {
    let contents = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&contents) {
        Ok(session) => Some(session),
        Err(e) => {
            tracing::warn!(
                "Discarding malformed session file {}: {e}",
                path.display()
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_session() -> Session {
        Session {
            user: UserRecord {
                username: "dana".to_string(),
                email: "dana@example.com".to_string(),
                extra: serde_json::Map::new(),
            },
            access: "access-token".to_string(),
            refresh: "refresh-token".to_string(),
        }
    }

    #[test]
    fn test_open_without_file_is_unauthenticated() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open_at(dir.path().join("session.json"));
        assert!(store.current().is_none());
        assert!(!store.is_authenticated());
    }

    /// Malformed persisted payloads always restore as absent, never error.
    #[test]
    fn test_malformed_payloads_restore_as_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        for payload in [
            "",
            "not json",
            "{",
            "[1, 2, 3]",
            r#"{"user": null, "access": "a", "refresh": "r"}"#,
            // Partial session: missing access token
            r#"{"user": {"username": "u", "email": "e"}, "refresh": "r"}"#,
            // Partial session: tokens without a user
            r#"{"access": "a", "refresh": "r"}"#,
        ] {
            fs::write(&path, payload).unwrap();
            let store = SessionStore::open_at(path.clone());
            assert!(store.current().is_none(), "payload {payload:?} restored");
        }
    }

    /// Save followed by a fresh open (simulating reload) yields the same session.
    #[test]
    fn test_save_then_reopen_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let store = SessionStore::open_at(path.clone());
        let session = sample_session();
        store.save(session.clone()).unwrap();

        let reopened = SessionStore::open_at(path);
        assert_eq!(reopened.current(), Some(session));
    }

    #[test]
    fn test_server_assigned_fields_survive_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let mut session = sample_session();
        session
            .user
            .extra
            .insert("role".to_string(), serde_json::json!("user"));
        let store = SessionStore::open_at(path.clone());
        store.save(session).unwrap();

        let reopened = SessionStore::open_at(path);
        let user = reopened.current().unwrap().user;
        assert_eq!(user.extra.get("role"), Some(&serde_json::json!("user")));
    }

    #[test]
    fn test_clear_removes_file_and_memory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");

        let store = SessionStore::open_at(path.clone());
        store.save(sample_session()).unwrap();
        assert!(path.exists());

        store.clear().unwrap();
        assert!(!path.exists());
        assert!(store.current().is_none());

        // Clearing an already-clear store is fine.
        store.clear().unwrap();
    }

    #[test]
    fn test_subscribers_observe_changes() {
        let dir = tempfile::tempdir().unwrap();
        let store = SessionStore::open_at(dir.path().join("session.json"));
        let receiver = store.subscribe();

        store.save(sample_session()).unwrap();
        assert!(receiver.borrow().is_some());

        store.clear().unwrap();
        assert!(receiver.borrow().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_session_file_has_restricted_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        let store = SessionStore::open_at(path.clone());
        store.save(sample_session()).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
