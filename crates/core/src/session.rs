//! In-memory browser sessions.
//!
//! A session is created when the browser starts a sign-in. It holds the pending
//! authorization `state` nonce until the callback consumes it, and then the access token
//! and patient id obtained from the token exchange. Sessions are keyed by a random UUID
//! carried in an HttpOnly cookie, live only in process memory, and expire after the
//! configured TTL. A session that has not yet completed sign-in expires after at most
//! [`PENDING_SIGN_IN_TTL`], and at most [`MAX_PENDING_SIGN_INS`] of them are kept.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::RwLock;
use uuid::Uuid;

/// Longest a sign-in may stay pending before its session expires.
pub const PENDING_SIGN_IN_TTL: Duration = Duration::from_secs(10 * 60);

/// Pending sign-ins kept at once; the one closest to expiry is evicted beyond this.
pub const MAX_PENDING_SIGN_INS: usize = 10_000;

/// Credentials obtained from a completed sign-in.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: String,
    pub patient_id: String,
}

// Keep tokens out of logs.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"<redacted>")
            .field("patient_id", &self.patient_id)
            .finish()
    }
}

#[derive(Clone, Debug)]
struct Session {
    pending_state: Option<String>,
    credentials: Option<Credentials>,
    expires_at: Instant,
}

impl Session {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }

    fn is_pending(&self) -> bool {
        self.credentials.is_none()
    }
}

/// Generate a fresh authorization `state` nonce (128 random bits, hex).
pub fn new_state_nonce() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Shared session store.
///
/// Cloning is cheap; clones share the same map.
#[derive(Clone, Debug)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<Uuid, Session>>>,
    ttl: Duration,
    pending_limit: usize,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
            pending_limit: MAX_PENDING_SIGN_INS,
        }
    }

    #[cfg(test)]
    fn with_pending_limit(mut self, limit: usize) -> Self {
        self.pending_limit = limit.max(1);
        self
    }

    /// Record a new sign-in attempt and return the session id and its state nonce.
    ///
    /// A live `existing` session is reused (keeping any credentials until the new
    /// sign-in completes); otherwise a new session is allocated. Expired sessions are
    /// purged here, and the oldest pending sign-ins are evicted once the limit is reached.
    pub async fn begin_sign_in(&self, existing: Option<Uuid>) -> (Uuid, String) {
        let now = Instant::now();
        let state = new_state_nonce();

        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, session| session.is_live(now));

        let id = match existing.filter(|id| sessions.contains_key(id)) {
            Some(id) => id,
            None => {
                evict_pending(&mut sessions, self.pending_limit - 1);
                Uuid::new_v4()
            }
        };

        let session = sessions.entry(id).or_insert_with(|| Session {
            pending_state: None,
            credentials: None,
            expires_at: now,
        });
        session.pending_state = Some(state.clone());
        session.expires_at = if session.is_pending() {
            now + self.ttl.min(PENDING_SIGN_IN_TTL)
        } else {
            now + self.ttl
        };

        tracing::debug!(live_sessions = sessions.len(), "sign-in started");
        (id, state)
    }

    /// Remove and return the pending state nonce of a live session.
    pub async fn take_pending_state(&self, id: Uuid) -> Option<String> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        sessions
            .get_mut(&id)
            .filter(|session| session.is_live(now))
            .and_then(|session| session.pending_state.take())
    }

    /// Store credentials against a live session. Returns `false` if the session is gone.
    pub async fn complete_sign_in(&self, id: Uuid, credentials: Credentials) -> bool {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(&id).filter(|session| session.is_live(now)) {
            Some(session) => {
                session.credentials = Some(credentials);
                session.pending_state = None;
                session.expires_at = now + self.ttl;
                true
            }
            None => false,
        }
    }

    /// Credentials of a live, signed-in session.
    pub async fn credentials(&self, id: Uuid) -> Option<Credentials> {
        let now = Instant::now();
        let sessions = self.sessions.read().await;
        sessions
            .get(&id)
            .filter(|session| session.is_live(now))
            .and_then(|session| session.credentials.clone())
    }

    /// Drop a session. Returns `true` if it existed.
    pub async fn end(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    /// Number of stored sessions, including expired ones not yet purged.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

// Drop pending-only sessions closest to expiry until at most `keep` remain.
fn evict_pending(sessions: &mut HashMap<Uuid, Session>, keep: usize) {
    let mut pending: Vec<(Instant, Uuid)> = sessions
        .iter()
        .filter(|(_, session)| session.is_pending())
        .map(|(id, session)| (session.expires_at, *id))
        .collect();
    if pending.len() <= keep {
        return;
    }

    pending.sort_unstable();
    let excess = pending.len() - keep;
    for (_, id) in pending.into_iter().take(excess) {
        sessions.remove(&id);
    }
    tracing::warn!(evicted = excess, "pending sign-in limit reached");
}
