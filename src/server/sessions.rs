//! In-memory session storage.
//!
//! Each browser gets a random session id in a cookie. The id maps to the
//! signed-in username (if any) and a one-shot flash message. Sessions expire
//! after a period of inactivity and are lost on restart.

use crate::cms::SessionView;
use rand::Rng;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "flatcms_session";

/// State held for one browser client.
#[derive(Debug, Clone)]
pub struct SessionData {
    /// Signed-in username. Presence means signed in.
    pub username: Option<String>,
    /// Flash message for the next rendered page.
    pub message: Option<String>,
    /// When the session expires unless touched again.
    pub expires_at: Instant,
}

impl SessionView for SessionData {
    fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }
}

/// In-memory session store with sliding expiry.
///
/// Thread-safe via internal RwLock.
#[derive(Debug)]
pub struct SessionStore {
    /// Sessions indexed by id.
    sessions: RwLock<HashMap<String, SessionData>>,
    /// Idle time before a session expires.
    idle_expiry: Duration,
}

impl SessionStore {
    /// Creates a new session store with the specified idle expiry in minutes.
    pub fn new(expiry_minutes: u64) -> Self {
        Self::with_expiry(Duration::from_secs(expiry_minutes * 60))
    }

    /// Creates a new session store with a custom idle expiry.
    pub fn with_expiry(idle_expiry: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            idle_expiry,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, SessionData>> {
        self.sessions.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, SessionData>> {
        self.sessions.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Creates an empty session and returns its id.
    pub fn create(&self) -> String {
        let id = generate_session_id();
        let data = SessionData {
            username: None,
            message: None,
            expires_at: Instant::now() + self.idle_expiry,
        };

        self.write().insert(id.clone(), data);
        id
    }

    /// Returns a snapshot of a live session, extending its expiry.
    ///
    /// Expired sessions are removed and reported as unknown.
    pub fn touch(&self, id: &str) -> Option<SessionData> {
        let mut sessions = self.write();
        let now = Instant::now();

        match sessions.get_mut(id) {
            Some(data) if data.expires_at > now => {
                data.expires_at = now + self.idle_expiry;
                Some(data.clone())
            }
            Some(_) => {
                sessions.remove(id);
                None
            }
            None => None,
        }
    }

    /// Returns the signed-in username for a session.
    pub fn username(&self, id: &str) -> Option<String> {
        self.read().get(id).and_then(|data| data.username.clone())
    }

    /// Marks a session as signed in.
    pub fn sign_in(&self, id: &str, username: &str) {
        if let Some(data) = self.write().get_mut(id) {
            data.username = Some(username.to_string());
        }
    }

    /// Moves a session's state to a fresh id and returns it.
    ///
    /// The old id stops working. An unknown id gets a new empty session.
    pub fn rotate(&self, id: &str) -> String {
        let new_id = generate_session_id();
        let mut sessions = self.write();
        let mut data = sessions.remove(id).unwrap_or(SessionData {
            username: None,
            message: None,
            expires_at: Instant::now(),
        });
        data.expires_at = Instant::now() + self.idle_expiry;
        sessions.insert(new_id.clone(), data);
        new_id
    }

    /// Clears the signed-in username of a session.
    pub fn sign_out(&self, id: &str) {
        if let Some(data) = self.write().get_mut(id) {
            data.username = None;
        }
    }

    /// Sets the flash message shown on the next rendered page.
    pub fn set_message(&self, id: &str, message: impl Into<String>) {
        if let Some(data) = self.write().get_mut(id) {
            data.message = Some(message.into());
        }
    }

    /// Returns and clears the flash message.
    pub fn take_message(&self, id: &str) -> Option<String> {
        self.write().get_mut(id).and_then(|data| data.message.take())
    }

    /// Removes all expired sessions.
    ///
    /// Returns the number of sessions removed.
    pub fn cleanup_expired(&self) -> usize {
        let mut sessions = self.write();
        let now = Instant::now();

        let before = sessions.len();
        sessions.retain(|_, data| data.expires_at > now);
        let after = sessions.len();

        before - after
    }

    /// Returns the number of sessions currently stored.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.read().len()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(24 * 60)
    }
}

/// Generates a secure random session id.
///
/// Returns 32 random bytes encoded as base64url (no padding).
fn generate_session_id() -> String {
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
