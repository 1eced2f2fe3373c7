//! Session registry
//!
//! Process-wide map from session id to session, shared by every carrier
//! and send handler. Lookups are concurrent; removal is conditional on the
//! entry still being the same session instance, so a timed-out session
//! never evicts a fresh one that reused its id.

use super::session::Session;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;

/// All live sessions
pub struct SessionRegistry {
    sessions: DashMap<String, Arc<Session>>,
    heartbeat_delay: Duration,
    disconnect_delay: Duration,
}

impl SessionRegistry {
    #[must_use]
    pub fn new(heartbeat_delay: Duration, disconnect_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            sessions: DashMap::new(),
            heartbeat_delay,
            disconnect_delay,
        })
    }

    /// Look up a session without creating it
    pub fn get(&self, session_id: &str) -> Option<Arc<Session>> {
        self.sessions.get(session_id).map(|entry| entry.clone())
    }

    /// Look up a session, creating it if absent.
    ///
    /// Returns the session and whether this call created it.
    pub fn get_or_create(self: &Arc<Self>, session_id: &str) -> (Arc<Session>, bool) {
        let mut created = false;
        let session = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| {
                created = true;
                tracing::debug!(session_id = %session_id, "Session created");
                Session::new(
                    session_id,
                    Arc::downgrade(self),
                    self.heartbeat_delay,
                    self.disconnect_delay,
                )
            })
            .clone();
        (session, created)
    }

    /// Remove `session_id` only if it still maps to this exact session.
    pub fn remove(&self, session_id: &str, session: &Arc<Session>) -> bool {
        let removed = self
            .sessions
            .remove_if(session_id, |_, held| Arc::ptr_eq(held, session))
            .is_some();
        if removed {
            tracing::debug!(session_id = %session_id, "Session removed");
        }
        removed
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.sessions.len())
            .finish()
    }
}
