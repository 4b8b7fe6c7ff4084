//! Cookie sessions with sliding idle expiry

use std::collections::HashMap;
use std::fmt::Write;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use rand::rngs::OsRng;
use rand::RngCore;

/// Random bytes per session id (192 bits)
const SESSION_ID_BYTES: usize = 24;

/// Tracks live sessions and their last use
#[derive(Debug)]
pub struct SessionManager {
    sessions: Mutex<HashMap<String, Instant>>,
    timeout: Duration,
}

impl SessionManager {
    pub fn new(timeout: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    /// Idle timeout; also the cookie max-age
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Start a new session and return its id
    pub fn create(&self) -> String {
        self.create_at(Instant::now())
    }

    pub(crate) fn create_at(&self, now: Instant) -> String {
        let id = new_session_id();
        self.lock().insert(id.clone(), now);
        id
    }

    /// Check a session id, refreshing it on success
    ///
    /// A session idle for longer than the timeout is removed.
    pub fn validate(&self, id: &str) -> bool {
        self.validate_at(id, Instant::now())
    }

    pub(crate) fn validate_at(&self, id: &str, now: Instant) -> bool {
        let mut sessions = self.lock();
        let Some(last_seen) = sessions.get_mut(id) else {
            return false;
        };

        if now.saturating_duration_since(*last_seen) > self.timeout {
            sessions.remove(id);
            return false;
        }

        *last_seen = now;
        true
    }

    /// Drop every idle session, returning how many were removed
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub(crate) fn sweep_at(&self, now: Instant) -> usize {
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, last_seen| now.saturating_duration_since(*last_seen) <= self.timeout);
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Instant>> {
        // The map stays consistent even if a holder panicked.
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn new_session_id() -> String {
    let mut bytes = [0u8; SESSION_ID_BYTES];
    OsRng.fill_bytes(&mut bytes);

    let mut id = String::with_capacity(SESSION_ID_BYTES * 2);
    for byte in bytes {
        let _ = write!(id, "{:02x}", byte);
    }
    id
}
