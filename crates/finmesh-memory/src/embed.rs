//! Embedding generation with a deterministic fallback.
//!
//! Vectors come from the LLM embedding endpoint when it is enabled and
//! reachable; otherwise a 128-dimension normalized word-frequency vector is
//! computed locally. The cache is keyed by exact text so repeated turns and
//! queries never re-embed.

use dashmap::DashMap;
use finmesh_llm::LlmClient;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use tracing::warn;

/// Dimensionality of locally-computed fallback vectors.
pub const FALLBACK_DIMS: usize = 128;

pub struct Embedder {
    llm: Option<Arc<LlmClient>>,
    cache: DashMap<String, Vec<f32>>,
}

impl Embedder {
    pub fn new(llm: Option<Arc<LlmClient>>) -> Self {
        Self {
            llm: llm.filter(|client| client.is_enabled()),
            cache: DashMap::new(),
        }
    }

    /// Local-only embedder, used when the LLM is disabled.
    pub fn local() -> Self {
        Self::new(None)
    }

    pub async fn embed(&self, text: &str) -> Vec<f32> {
        if let Some(cached) = self.cache.get(text) {
            return cached.clone();
        }
        let vector = match &self.llm {
            Some(llm) => match llm.embed(text).await {
                Ok(vector) => vector,
                Err(err) => {
                    warn!(error = %err, "embedding endpoint failed, using term-frequency fallback");
                    fallback_embedding(text)
                }
            },
            None => fallback_embedding(text),
        };
        self.cache.insert(text.to_string(), vector.clone());
        vector
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

/// Normalized word-frequency vector: each word hashes to one of
/// [`FALLBACK_DIMS`] buckets, counts are L2-normalized.
pub fn fallback_embedding(text: &str) -> Vec<f32> {
    let mut buckets = vec![0.0f32; FALLBACK_DIMS];
    for word in text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let mut hasher = DefaultHasher::new();
        word.hash(&mut hasher);
        let bucket = (hasher.finish() % FALLBACK_DIMS as u64) as usize;
        buckets[bucket] += 1.0;
    }
    let norm = buckets.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in &mut buckets {
            *value /= norm;
        }
    }
    buckets
}

/// Cosine similarity; zero for mismatched dimensions or zero vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn identical_text_embeds_identically_and_caches() {
        let embedder = Embedder::local();
        let first = embedder.embed("transfer five thousand to ravi").await;
        let second = embedder.embed("transfer five thousand to ravi").await;
        assert_eq!(first, second);
        assert_eq!(embedder.cache_len(), 1);
    }

    #[test]
    fn fallback_vectors_are_normalized() {
        let vector = fallback_embedding("check my account balance please");
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
        assert_eq!(vector.len(), FALLBACK_DIMS);
    }

    #[test]
    fn related_text_scores_above_unrelated() {
        let balance_a = fallback_embedding("what is my account balance");
        let balance_b = fallback_embedding("show my account balance today");
        let loan = fallback_embedding("apply home loan interest rate tenure");
        assert!(
            cosine_similarity(&balance_a, &balance_b) > cosine_similarity(&balance_a, &loan)
        );
    }

    #[test]
    fn zero_and_mismatched_vectors_score_zero() {
        assert_eq!(cosine_similarity(&[0.0; 4], &[1.0, 0.0, 0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
    }
}
