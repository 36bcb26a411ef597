//! Conversation sessions grouping tasks for one user on one channel.

use crate::ids::{SessionId, TaskId};
use crate::value::DataMap;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// A user-scoped conversation context with a TTL.
///
/// `task_history` is append-only for the session's lifetime; expiry is
/// checked lazily on access and evicts the session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: SessionId,
    pub user_id: String,
    pub channel: String,
    pub context: DataMap,
    pub task_history: Vec<TaskId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: impl Into<String>, channel: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            session_id: SessionId::generate(),
            user_id: user_id.into(),
            channel: channel.into(),
            context: DataMap::new(),
            task_history: Vec::new(),
            created_at: now,
            updated_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn with_context(mut self, context: DataMap) -> Self {
        self.context = context;
        self
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    /// Append a task id to the history and bump `updated_at`.
    pub fn record_task(&mut self, task_id: TaskId) {
        self.task_history.push(task_id);
        self.updated_at = Utc::now();
    }
}
