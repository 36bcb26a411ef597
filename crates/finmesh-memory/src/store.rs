//! User-scoped document store with cosine retrieval.
//!
//! Write paths: conversation turns (chunked), transactions, profile
//! snapshots. Read path: top-K cosine retrieval filtered on the owning
//! user. Knowledge-base documents are owned by `system` and served only
//! through the dedicated search path, so user retrieval can never leak
//! across owners.

use crate::document::{Document, DocumentType, SYSTEM_USER};
use crate::embed::{cosine_similarity, Embedder};
use crate::knowledge;
use finmesh_llm::LlmClient;
use finmesh_types::{DataMap, SessionId};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// Words per conversation chunk.
const CHUNK_WORDS: usize = 500;

/// A user's document count above which history is compressed.
const SUMMARIZE_THRESHOLD: usize = 10;

pub struct MemoryStore {
    docs: RwLock<HashMap<String, Document>>,
    embedder: Embedder,
    llm: Option<Arc<LlmClient>>,
}

impl MemoryStore {
    pub fn new(llm: Option<Arc<LlmClient>>) -> Self {
        Self {
            docs: RwLock::new(HashMap::new()),
            embedder: Embedder::new(llm.clone()),
            llm: llm.filter(|client| client.is_enabled()),
        }
    }

    /// Build the store and seed the system knowledge base.
    pub async fn with_knowledge_base(llm: Option<Arc<LlmClient>>) -> Self {
        let store = Self::new(llm);
        let mut seeded = Vec::new();
        for (doc_type, tag, content) in knowledge::seed_entries() {
            let embedding = store.embedder.embed(content).await;
            let mut metadata = DataMap::new();
            metadata.insert("tag".to_string(), Value::from(tag));
            seeded.push(
                Document::new(content, embedding, doc_type, SYSTEM_USER).with_metadata(metadata),
            );
        }
        {
            // Single write-lock pass for the whole seed set.
            let mut docs = store.docs.write().expect("memory lock poisoned");
            for doc in seeded {
                docs.insert(doc.document_id.clone(), doc);
            }
        }
        info!(documents = store.len(), "knowledge base seeded");
        store
    }

    /// Store one conversation turn, chunking messages over 500 words.
    /// Returns the ids of the inserted documents.
    pub async fn store_conversation(
        &self,
        user_id: &str,
        session_id: Option<SessionId>,
        role: &str,
        message: &str,
    ) -> Vec<String> {
        let mut ids = Vec::new();
        for (index, chunk) in chunk_words(message, CHUNK_WORDS).into_iter().enumerate() {
            let content = format!("{role}: {chunk}");
            let embedding = self.embedder.embed(&content).await;
            let mut metadata = DataMap::new();
            metadata.insert("role".to_string(), Value::from(role));
            if index > 0 {
                metadata.insert("chunk".to_string(), Value::from(index as u64));
            }
            let mut doc = Document::new(content, embedding, DocumentType::Conversation, user_id)
                .with_metadata(metadata);
            if let Some(session_id) = &session_id {
                doc = doc.with_session(session_id.clone());
            }
            ids.push(self.insert(doc));
        }
        ids
    }

    /// Store a transaction record for later context retrieval.
    pub async fn store_transaction(&self, user_id: &str, details: &DataMap) -> String {
        let content = render_map("transaction", details);
        let embedding = self.embedder.embed(&content).await;
        let doc = Document::new(content, embedding, DocumentType::Transaction, user_id)
            .with_metadata(details.clone());
        self.insert(doc)
    }

    /// Store a user profile snapshot.
    pub async fn store_profile(&self, user_id: &str, profile: &DataMap) -> String {
        let content = render_map("account profile", profile);
        let embedding = self.embedder.embed(&content).await;
        let doc = Document::new(content, embedding, DocumentType::Account, user_id)
            .with_metadata(profile.clone());
        self.insert(doc)
    }

    fn insert(&self, doc: Document) -> String {
        let id = doc.document_id.clone();
        let mut docs = self.docs.write().expect("memory lock poisoned");
        docs.insert(id.clone(), doc);
        id
    }

    /// Top-K documents for this user, scored by cosine similarity.
    pub async fn retrieve(&self, user_id: &str, query: &str, top_k: usize) -> Vec<Document> {
        let query_embedding = self.embedder.embed(query).await;
        self.ranked(&query_embedding, top_k, |doc| doc.user_id == user_id)
    }

    /// Top-K knowledge-base documents, regardless of user.
    pub async fn search_knowledge(&self, query: &str, top_k: usize) -> Vec<Document> {
        let query_embedding = self.embedder.embed(query).await;
        self.ranked(&query_embedding, top_k, |doc| doc.user_id == SYSTEM_USER)
    }

    fn ranked(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        owner_filter: impl Fn(&Document) -> bool,
    ) -> Vec<Document> {
        let docs = self.docs.read().expect("memory lock poisoned");
        let mut scored: Vec<Document> = docs
            .values()
            .filter(|doc| owner_filter(doc))
            .map(|doc| {
                let mut hit = doc.clone();
                hit.relevance = cosine_similarity(query_embedding, &doc.embedding);
                hit
            })
            .collect();
        scored.sort_by(|a, b| {
            b.relevance
                .partial_cmp(&a.relevance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);
        scored
    }

    /// Compress a user's oldest documents into one summary when the history
    /// exceeds the threshold, keeping the most recent `keep_recent` verbatim.
    /// Returns the number of documents compressed.
    pub async fn summarize_history(&self, user_id: &str, keep_recent: usize) -> usize {
        let Some(llm) = &self.llm else {
            return 0;
        };

        let mut user_docs: Vec<Document> = {
            let docs = self.docs.read().expect("memory lock poisoned");
            docs.values()
                .filter(|doc| doc.user_id == user_id)
                .cloned()
                .collect()
        };
        if user_docs.len() <= SUMMARIZE_THRESHOLD {
            return 0;
        }
        user_docs.sort_by_key(|doc| doc.timestamp);
        let split = user_docs.len().saturating_sub(keep_recent);
        let oldest = &user_docs[..split];
        if oldest.is_empty() {
            return 0;
        }

        let combined = oldest
            .iter()
            .map(|doc| doc.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let prompt = format!(
            "Summarize the following banking interaction history into a short \
             paragraph preserving amounts, beneficiaries and decisions:\n\n{combined}"
        );
        let summary = match llm.complete(None, &prompt).await {
            Ok(summary) => summary,
            Err(err) => {
                warn!(error = %err, "history summarization failed, keeping originals");
                return 0;
            }
        };

        let embedding = self.embedder.embed(&summary).await;
        let mut metadata = DataMap::new();
        metadata.insert("summary".to_string(), Value::Bool(true));
        metadata.insert("compressed".to_string(), Value::from(oldest.len() as u64));
        let summary_doc = Document::new(summary, embedding, DocumentType::Conversation, user_id)
            .with_metadata(metadata);

        let removed: Vec<String> = oldest.iter().map(|doc| doc.document_id.clone()).collect();
        {
            let mut docs = self.docs.write().expect("memory lock poisoned");
            for id in &removed {
                docs.remove(id);
            }
            docs.insert(summary_doc.document_id.clone(), summary_doc);
        }
        debug!(user_id, compressed = removed.len(), "history summarized");
        removed.len()
    }

    /// Remove every document owned by the user. Returns the removed count.
    pub fn clear_user(&self, user_id: &str) -> usize {
        let mut docs = self.docs.write().expect("memory lock poisoned");
        let before = docs.len();
        docs.retain(|_, doc| doc.user_id != user_id);
        before - docs.len()
    }

    pub fn count_for(&self, user_id: &str) -> usize {
        self.docs
            .read()
            .expect("memory lock poisoned")
            .values()
            .filter(|doc| doc.user_id == user_id)
            .count()
    }

    pub fn len(&self) -> usize {
        self.docs.read().expect("memory lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn chunk_words(message: &str, chunk_size: usize) -> Vec<String> {
    let words: Vec<&str> = message.split_whitespace().collect();
    if words.len() <= chunk_size {
        return vec![message.trim().to_string()];
    }
    words
        .chunks(chunk_size)
        .map(|chunk| chunk.join(" "))
        .collect()
}

fn render_map(label: &str, map: &DataMap) -> String {
    let fields = map
        .iter()
        .map(|(key, value)| match value {
            Value::String(s) => format!("{key}={s}"),
            other => format!("{key}={other}"),
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("{label}: {fields}")
}
