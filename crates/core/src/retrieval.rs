//! Retrieval seams — query encoder and nearest-neighbour index.
//!
//! Both are built outside the question-answering path and injected at
//! construction. Neither is mutated after startup, so one instance can be
//! shared read-only by every session.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::RetrievalError;

/// Text → fixed-length vector. Must be deterministic for identical input.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// A human-readable name (e.g., "hashing", "mistral-embed").
    fn name(&self) -> &str;

    /// Encode one text.
    async fn encode(&self, text: &str) -> std::result::Result<Vec<f32>, RetrievalError>;

    /// Encode a batch. Default implementation encodes one by one.
    async fn encode_batch(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, RetrievalError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.encode(text).await?);
        }
        Ok(out)
    }
}

/// One nearest-neighbour candidate: a chunk position and its distance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexHit {
    /// Squared Euclidean distance (lower is better).
    pub distance: f32,
    /// Position of the chunk in the index's chunk table.
    pub chunk: usize,
}

/// Nearest-neighbour search over chunk vectors.
pub trait VectorIndex: Send + Sync {
    /// Up to `k` hits for `query`. Ordering is not required to be sorted.
    fn search(&self, query: &[f32], k: usize) -> std::result::Result<Vec<IndexHit>, RetrievalError>;

    /// Number of indexed vectors.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A retrieved passage attributed to its source record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    pub publication_number: String,
    pub title: String,
    pub text: String,
}

impl Passage {
    /// `[id] "title" || text`, the form handed to the summarizer.
    pub fn to_context_line(&self) -> String {
        format!("[{}] \"{}\" || {}", self.publication_number, self.title, self.text)
    }
}

/// Token counting. One implementation must be used for every budget decision.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
}
