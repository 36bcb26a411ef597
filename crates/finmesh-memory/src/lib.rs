//! Retrieval-augmented memory for the orchestrator.
//!
//! Conversation turns, transactions and profile snapshots persist as
//! embedded documents scoped to their owning user; a fixed knowledge base
//! of policies and FAQs is owned by `system`. Retrieval is cosine top-K
//! with an Ollama-preferred, term-frequency-fallback embedding path.

pub mod augment;
pub mod conversation;
pub mod document;
pub mod embed;
pub mod knowledge;
pub mod store;

pub use augment::augment_prompt;
pub use conversation::{ConversationBuffer, ConversationTurn};
pub use document::{Document, DocumentType, SYSTEM_USER};
pub use embed::{cosine_similarity, fallback_embedding, Embedder, FALLBACK_DIMS};
pub use store::MemoryStore;

/// Default retrieval depth.
pub const DEFAULT_TOP_K: usize = 5;
