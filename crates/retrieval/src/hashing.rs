//! Offline encoder: signed feature hashing of lowercase word tokens.
//!
//! Each token is hashed with SHA-256; the first eight bytes pick a bucket and
//! the ninth byte picks the sign. The bag-of-words vector is L2-normalised,
//! so squared-L2 distance ranks like cosine similarity. Identical text
//! always yields the identical vector.

use async_trait::async_trait;
use patentrag_core::error::RetrievalError;
use patentrag_core::retrieval::Encoder;
use sha2::{Digest, Sha256};

pub struct HashEncoder {
    dimensions: usize,
}

impl HashEncoder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Synchronous encoding, used directly by the index builder and tests.
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimensions];
        if self.dimensions == 0 {
            return vector;
        }

        for token in tokens(text) {
            let digest = Sha256::digest(token.as_bytes());
            let mut head = [0u8; 8];
            head.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(head) % self.dimensions as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

/// Lowercase alphanumeric runs.
pub fn tokens(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
}

#[async_trait]
impl Encoder for HashEncoder {
    fn name(&self) -> &str {
        "hashing"
    }

    async fn encode(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        Ok(self.embed(text))
    }
}
