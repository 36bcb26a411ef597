//! Per-session conversation buffer.
//!
//! Keeps the most recent turns for prompt context; the durable record lives
//! in the document store. Trimmed to the last 20 messages per session.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use finmesh_types::SessionId;
use serde::{Deserialize, Serialize};

const MAX_TURNS: usize = 20;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: String,
    pub text: String,
    pub at: DateTime<Utc>,
}

#[derive(Default)]
pub struct ConversationBuffer {
    sessions: DashMap<SessionId, Vec<ConversationTurn>>,
}

impl ConversationBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, session_id: &SessionId, role: impl Into<String>, text: impl Into<String>) {
        let mut turns = self.sessions.entry(session_id.clone()).or_default();
        turns.push(ConversationTurn {
            role: role.into(),
            text: text.into(),
            at: Utc::now(),
        });
        let excess = turns.len().saturating_sub(MAX_TURNS);
        if excess > 0 {
            turns.drain(..excess);
        }
    }

    pub fn history(&self, session_id: &SessionId) -> Vec<ConversationTurn> {
        self.sessions
            .get(session_id)
            .map(|turns| turns.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_trims_to_recent_twenty() {
        let buffer = ConversationBuffer::new();
        let session = SessionId::generate();
        for i in 0..25 {
            buffer.append(&session, "user", format!("turn {i}"));
        }
        let history = buffer.history(&session);
        assert_eq!(history.len(), 20);
        assert_eq!(history[0].text, "turn 5");
        assert_eq!(history[19].text, "turn 24");
    }

    #[test]
    fn sessions_are_isolated() {
        let buffer = ConversationBuffer::new();
        let a = SessionId::generate();
        let b = SessionId::generate();
        buffer.append(&a, "user", "hello");
        assert!(buffer.history(&b).is_empty());
    }
}
