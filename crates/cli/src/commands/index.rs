//! `patentrag index` — Chunk, embed and persist the patent records.

use super::{build_encoder, load_config, require_api_key};
use anyhow::Context;
use patentrag_providers::build_from_config;
use patentrag_retrieval::{build_index, ChunkingOptions, Corpus};
use std::path::PathBuf;
use tracing::info;

pub async fn run(records: Option<PathBuf>, output: Option<PathBuf>) -> anyhow::Result<()> {
    let config = load_config()?;
    let records_path = records.unwrap_or_else(|| config.data.records_path.clone());
    let index_path = output.unwrap_or_else(|| config.data.index_path.clone());

    if config.embedding.provider != "hashing" {
        require_api_key(&config)?;
    }

    let corpus = Corpus::load(&records_path)
        .with_context(|| format!("Cannot load records from {}", records_path.display()))?;
    info!(records = corpus.len(), path = %records_path.display(), "Corpus loaded");

    let router = build_from_config(&config);
    let encoder = build_encoder(&config, &router)?;
    let options = ChunkingOptions {
        max_words: config.retrieval.chunk_words,
        overlap: config.retrieval.chunk_overlap,
    };

    let index = build_index(&corpus, encoder.as_ref(), options).await?;
    index.save(&index_path)?;

    println!(
        "Indexed {} chunks from {} records ({} dimensions, encoder: {})",
        index.chunks.len(),
        corpus.len(),
        index.dimensions,
        encoder.name()
    );
    println!("Index written to {}", index_path.display());
    Ok(())
}
