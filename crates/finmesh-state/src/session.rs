//! Session lifecycle with lazy TTL eviction.

use chrono::Duration;
use finmesh_store::{FallbackMap, RemoteKv, SESSION_REMOTE_TTL};
use finmesh_types::{DataMap, Session, SessionId, TaskId};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session {0} not found")]
    NotFound(SessionId),
}

/// Creates, reads and mutates sessions. Expired sessions are evicted on the
/// next access rather than by a background sweeper.
pub struct SessionManager {
    sessions: FallbackMap<Session>,
    ttl: Duration,
}

impl SessionManager {
    pub const DEFAULT_TTL_HOURS: i64 = 24;

    pub async fn connect(remote: Option<Arc<dyn RemoteKv>>) -> Self {
        Self {
            sessions: FallbackMap::connect("session", remote, Some(SESSION_REMOTE_TTL)).await,
            ttl: Duration::hours(Self::DEFAULT_TTL_HOURS),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            sessions: FallbackMap::in_memory("session"),
            ttl: Duration::hours(Self::DEFAULT_TTL_HOURS),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub async fn create(
        &self,
        user_id: impl Into<String>,
        channel: impl Into<String>,
        context: DataMap,
    ) -> Session {
        let session = Session::new(user_id, channel, self.ttl).with_context(context);
        info!(session_id = %session.session_id, user_id = %session.user_id, "session created");
        self.sessions
            .put(session.session_id.as_str(), session.clone())
            .await;
        session
    }

    /// Fetch a live session; expired sessions are evicted and read as absent.
    pub async fn get(&self, session_id: &SessionId) -> Result<Session, SessionError> {
        match self.sessions.get(session_id.as_str()).await {
            Some(session) if session.is_expired() => {
                debug!(session_id = %session_id, "session expired, evicting");
                self.sessions.remove(session_id.as_str()).await;
                Err(SessionError::NotFound(session_id.clone()))
            }
            Some(session) => Ok(session),
            None => Err(SessionError::NotFound(session_id.clone())),
        }
    }

    /// Reuse the referenced session when it is live, otherwise create one.
    pub async fn resolve(
        &self,
        session_id: Option<SessionId>,
        user_id: &str,
        channel: &str,
    ) -> Session {
        if let Some(id) = session_id {
            if let Ok(session) = self.get(&id).await {
                return session;
            }
            debug!(session_id = %id, "referenced session unknown or expired, creating fresh");
        }
        self.create(user_id, channel, DataMap::new()).await
    }

    /// Append a task id to the session history. Best-effort: an unknown
    /// session is reported but never blocks task submission.
    pub async fn record_task(
        &self,
        session_id: &SessionId,
        task_id: TaskId,
    ) -> Result<(), SessionError> {
        self.sessions
            .update(session_id.as_str(), |session| session.record_task(task_id))
            .await
            .ok_or_else(|| SessionError::NotFound(session_id.clone()))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_then_get_returns_the_session_untouched() {
        let manager = SessionManager::in_memory();
        let created = manager.create("U1", "MB", DataMap::new()).await;
        let fetched = manager.get(&created.session_id).await.unwrap();
        assert_eq!(fetched.user_id, created.user_id);
        assert_eq!(fetched.task_history, created.task_history);
        assert_eq!(fetched.created_at, created.created_at);
    }

    #[tokio::test]
    async fn expired_sessions_are_evicted_on_access() {
        let manager = SessionManager::in_memory().with_ttl(Duration::zero());
        let created = manager.create("U1", "MB", DataMap::new()).await;
        assert!(manager.get(&created.session_id).await.is_err());
        assert_eq!(manager.len(), 0);
    }

    #[tokio::test]
    async fn resolve_creates_when_reference_is_stale() {
        let manager = SessionManager::in_memory();
        let stale = SessionId::generate();
        let session = manager.resolve(Some(stale.clone()), "U1", "NB").await;
        assert_ne!(session.session_id, stale);
        assert_eq!(session.channel, "NB");
    }

    #[tokio::test]
    async fn task_history_reflects_submission_order() {
        let manager = SessionManager::in_memory();
        let session = manager.create("U1", "MB", DataMap::new()).await;
        let first = TaskId::generate();
        let second = TaskId::generate();
        manager
            .record_task(&session.session_id, first.clone())
            .await
            .unwrap();
        manager
            .record_task(&session.session_id, second.clone())
            .await
            .unwrap();
        let fetched = manager.get(&session.session_id).await.unwrap();
        assert_eq!(fetched.task_history, vec![first, second]);
    }
}
