//! Word-window chunking and chunk-index construction.

use crate::corpus::Corpus;
use crate::flat_index::{ChunkIndex, IndexedChunk};
use patentrag_core::error::{CorpusError, Result, RetrievalError};
use patentrag_core::record::Chunk;
use patentrag_core::retrieval::Encoder;
use tracing::{debug, info};

/// Split `text` into windows of `max_words` whitespace-separated words,
/// starting a new window every `max_words - overlap` words.
pub fn word_windows(text: &str, max_words: usize, overlap: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    let step = max_words.saturating_sub(overlap).max(1);
    (0..words.len())
        .step_by(step)
        .map(|start| {
            let end = (start + max_words).min(words.len());
            words[start..end].join(" ")
        })
        .collect()
}

/// Chunking parameters for [`build_index`].
#[derive(Debug, Clone, Copy)]
pub struct ChunkingOptions {
    pub max_words: usize,
    pub overlap: usize,
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self {
            max_words: 512,
            overlap: 64,
        }
    }
}

/// Chunk every record's concatenated text and encode each window.
///
/// Records without text are skipped. A corpus with no text at all is an error.
pub async fn build_index(
    corpus: &Corpus,
    encoder: &dyn Encoder,
    options: ChunkingOptions,
) -> Result<ChunkIndex> {
    let mut index = ChunkIndex::default();

    for record in corpus.records() {
        let text = record.concat_text();
        if text.trim().is_empty() {
            debug!(id = %record.publication_number, "Skipping record without text");
            continue;
        }

        let windows = word_windows(&text, options.max_words, options.overlap);
        let vectors = encoder.encode_batch(&windows).await?;

        for (sequence, (text, vector)) in windows.into_iter().zip(vectors).enumerate() {
            if index.chunks.is_empty() {
                index.dimensions = vector.len();
            } else if vector.len() != index.dimensions {
                return Err(RetrievalError::DimensionMismatch {
                    expected: index.dimensions,
                    actual: vector.len(),
                }
                .into());
            }
            index.chunks.push(IndexedChunk {
                chunk: Chunk {
                    publication_number: record.publication_number.clone(),
                    sequence,
                    text,
                },
                vector,
            });
        }
    }

    if index.chunks.is_empty() {
        return Err(CorpusError::NothingToIndex.into());
    }

    info!(
        encoder = encoder.name(),
        records = corpus.len(),
        chunks = index.chunks.len(),
        dimensions = index.dimensions,
        "Chunk index built"
    );
    Ok(index)
}
