//! Live chat sessions, keyed by id.
//!
//! Each session sits behind its own async mutex, which doubles as the
//! session's lane: a turn holds the lock for its whole duration, so turns
//! for one session never interleave while other sessions run freely.

use crate::models::ChatSession;
use dashmap::DashMap;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedMutexGuard};

/// A turn holding a session longer than this is logged
const LANE_HOLD_WARNING_SECS: u64 = 120;

/// Unattached sessions idle longer than this are dropped by `prune_idle`
pub const SESSION_IDLE_TIMEOUT: Duration = Duration::from_secs(6 * 3600);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    NotFound(String),
    /// A turn is already running for this session
    Busy(String),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::NotFound(id) => write!(f, "Session {} not found", id),
            SessionError::Busy(id) => write!(f, "Session {} is already handling a turn", id),
        }
    }
}

impl std::error::Error for SessionError {}

struct SessionEntry {
    session: Arc<Mutex<ChatSession>>,
    last_used: std::sync::Mutex<Instant>,
    /// Set while a live connection owns the session
    attached: AtomicBool,
}

impl SessionEntry {
    fn touch(&self) {
        if let Ok(mut last) = self.last_used.lock() {
            *last = Instant::now();
        }
    }

    fn idle_for(&self) -> Duration {
        self.last_used
            .lock()
            .map(|last| last.elapsed())
            .unwrap_or_default()
    }
}

/// Exclusive access to one session for the duration of a turn
pub struct SessionGuard {
    session: OwnedMutexGuard<ChatSession>,
    acquired_at: Instant,
}

impl std::ops::Deref for SessionGuard {
    type Target = ChatSession;

    fn deref(&self) -> &ChatSession {
        &self.session
    }
}

impl std::ops::DerefMut for SessionGuard {
    fn deref_mut(&mut self) -> &mut ChatSession {
        &mut self.session
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        let held = self.acquired_at.elapsed();
        if held.as_secs() > LANE_HOLD_WARNING_SECS {
            log::warn!(
                "[SESSION] Session {} held for {} seconds (unusually long)",
                self.session.id,
                held.as_secs()
            );
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionRegistryStats {
    pub total_sessions: usize,
    pub active_sessions: usize,
    pub attached_sessions: usize,
}

#[derive(Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, SessionEntry>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session and return its id. It starts unattached.
    pub fn insert(&self, session: ChatSession) -> String {
        let id = session.id.clone();
        self.sessions.insert(
            id.clone(),
            SessionEntry {
                session: Arc::new(Mutex::new(session)),
                last_used: std::sync::Mutex::new(Instant::now()),
                attached: AtomicBool::new(false),
            },
        );
        log::info!("[SESSION] Created session {} ({} live)", id, self.sessions.len());
        id
    }

    /// Wait for exclusive access to a session
    pub async fn acquire(&self, session_id: &str) -> Result<SessionGuard, SessionError> {
        let session = self.handle(session_id)?;
        let guard = session.lock_owned().await;
        Ok(SessionGuard {
            session: guard,
            acquired_at: Instant::now(),
        })
    }

    /// Exclusive access without waiting; `Busy` if a turn is in progress
    pub fn try_acquire(&self, session_id: &str) -> Result<SessionGuard, SessionError> {
        let session = self.handle(session_id)?;
        let guard = session
            .try_lock_owned()
            .map_err(|_| SessionError::Busy(session_id.to_string()))?;
        Ok(SessionGuard {
            session: guard,
            acquired_at: Instant::now(),
        })
    }

    fn handle(&self, session_id: &str) -> Result<Arc<Mutex<ChatSession>>, SessionError> {
        let entry = self
            .sessions
            .get(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
        entry.touch();
        Ok(entry.session.clone())
    }

    /// Bind a session to a live connection; attached sessions are never pruned
    pub fn attach(&self, session_id: &str) -> bool {
        self.set_attached(session_id, true)
    }

    /// Release a session from its connection so the idle sweep may collect it
    pub fn detach(&self, session_id: &str) -> bool {
        self.set_attached(session_id, false)
    }

    fn set_attached(&self, session_id: &str, attached: bool) -> bool {
        match self.sessions.get(session_id) {
            Some(entry) => {
                entry.attached.store(attached, Ordering::Relaxed);
                entry.touch();
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    pub fn contains(&self, session_id: &str) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub fn is_busy(&self, session_id: &str) -> bool {
        self.sessions
            .get(session_id)
            .map(|e| e.session.try_lock().is_err())
            .unwrap_or(false)
    }

    /// Drop a session. A turn still holding it finishes against its own copy.
    pub fn remove(&self, session_id: &str) -> bool {
        let removed = self.sessions.remove(session_id).is_some();
        if removed {
            log::info!(
                "[SESSION] Dropped session {} ({} live)",
                session_id,
                self.sessions.len()
            );
        }
        removed
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn stats(&self) -> SessionRegistryStats {
        SessionRegistryStats {
            total_sessions: self.sessions.len(),
            active_sessions: self
                .sessions
                .iter()
                .filter(|e| e.session.try_lock().is_err())
                .count(),
            attached_sessions: self
                .sessions
                .iter()
                .filter(|e| e.attached.load(Ordering::Relaxed))
                .count(),
        }
    }

    /// Drop sessions that no connection owns, have been idle longer than
    /// `max_idle` and are not mid-turn. Returns how many were removed.
    pub fn prune_idle(&self, max_idle: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| {
            entry.attached.load(Ordering::Relaxed)
                || entry.idle_for() <= max_idle
                || entry.session.try_lock().is_err()
        });
        let pruned = before.saturating_sub(self.sessions.len());
        if pruned > 0 {
            log::info!("[SESSION] Pruned {} idle session(s)", pruned);
        }
        pruned
    }
}
