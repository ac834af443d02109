//! Exhaustive nearest-neighbour search and the persisted chunk index.
//!
//! The on-disk form is one JSON document holding every chunk next to its
//! vector. At load time it is split into the chunk table (metadata) and a
//! [`FlatIndex`] (vectors only), which are shared read-only afterwards.

use patentrag_core::error::{CorpusError, RetrievalError};
use patentrag_core::record::Chunk;
use patentrag_core::retrieval::{IndexHit, VectorIndex};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Squared Euclidean distance. Lower is closer.
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Brute-force squared-L2 index over fixed-length vectors.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    dimensions: usize,
    vectors: Vec<Vec<f32>>,
}

impl FlatIndex {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions,
            vectors: Vec::new(),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Append a vector; its position is the chunk id reported by searches.
    pub fn add(&mut self, vector: Vec<f32>) -> Result<usize, RetrievalError> {
        self.check_dimensions(&vector)?;
        self.vectors.push(vector);
        Ok(self.vectors.len() - 1)
    }

    fn check_dimensions(&self, vector: &[f32]) -> Result<(), RetrievalError> {
        if vector.len() != self.dimensions {
            return Err(RetrievalError::DimensionMismatch {
                expected: self.dimensions,
                actual: vector.len(),
            });
        }
        Ok(())
    }
}

impl VectorIndex for FlatIndex {
    fn search(&self, query: &[f32], k: usize) -> Result<Vec<IndexHit>, RetrievalError> {
        self.check_dimensions(query)?;

        let mut hits: Vec<IndexHit> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(chunk, v)| IndexHit {
                distance: squared_l2(query, v),
                chunk,
            })
            .collect();

        hits.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(k);
        Ok(hits)
    }

    fn len(&self) -> usize {
        self.vectors.len()
    }
}

/// One persisted chunk with its embedding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedChunk {
    #[serde(flatten)]
    pub chunk: Chunk,
    pub vector: Vec<f32>,
}

/// The persisted chunk index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChunkIndex {
    pub dimensions: usize,
    pub chunks: Vec<IndexedChunk>,
}

impl ChunkIndex {
    pub fn load(path: &Path) -> Result<Self, CorpusError> {
        let content = std::fs::read_to_string(path).map_err(|e| CorpusError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let index: Self = serde_json::from_str(&content).map_err(|e| CorpusError::Parse {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        debug!(path = %path.display(), chunks = index.chunks.len(), "Chunk index loaded");
        Ok(index)
    }

    pub fn save(&self, path: &Path) -> Result<(), CorpusError> {
        let write_err = |reason: String| CorpusError::Write {
            path: path.to_path_buf(),
            reason,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| write_err(e.to_string()))?;
        }
        let content = serde_json::to_string(self).map_err(|e| write_err(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| write_err(e.to_string()))
    }

    /// Split into the chunk table and a searchable index with matching positions.
    pub fn into_parts(self) -> Result<(Vec<Chunk>, FlatIndex), RetrievalError> {
        let mut index = FlatIndex::new(self.dimensions);
        let mut chunks = Vec::with_capacity(self.chunks.len());
        for entry in self.chunks {
            index.add(entry.vector)?;
            chunks.push(entry.chunk);
        }
        Ok((chunks, index))
    }
}
