//! Retrievable memory documents.

use chrono::{DateTime, Utc};
use finmesh_types::{DataMap, SessionId};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Owner id used for knowledge-base documents.
pub const SYSTEM_USER: &str = "system";

/// Classification of a stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Conversation,
    Transaction,
    Account,
    Policy,
    Faq,
}

impl DocumentType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Conversation => "conversation",
            Self::Transaction => "transaction",
            Self::Account => "account",
            Self::Policy => "policy",
            Self::Faq => "faq",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One retrievable unit of memory. Content is immutable after insertion and
/// the embedding is computed before the document enters the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub document_id: String,
    pub content: String,
    pub embedding: Vec<f32>,
    pub doc_type: DocumentType,
    pub user_id: String,
    pub session_id: Option<SessionId>,
    pub timestamp: DateTime<Utc>,
    pub metadata: DataMap,
    /// Transient retrieval score, populated on query results only.
    #[serde(default)]
    pub relevance: f32,
}

impl Document {
    pub fn new(
        content: impl Into<String>,
        embedding: Vec<f32>,
        doc_type: DocumentType,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            document_id: Uuid::new_v4().to_string(),
            content: content.into(),
            embedding,
            doc_type,
            user_id: user_id.into(),
            session_id: None,
            timestamp: Utc::now(),
            metadata: DataMap::new(),
            relevance: 0.0,
        }
    }

    pub fn with_session(mut self, session_id: SessionId) -> Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn with_metadata(mut self, metadata: DataMap) -> Self {
        self.metadata = metadata;
        self
    }
}
