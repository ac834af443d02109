//! Token counting.
//!
//! Every budget decision in the orchestrator goes through one shared
//! [`TokenCounter`]. The default is the cl100k BPE tokenizer, so the
//! configured window sizes are real model tokens; a 4-characters-per-token
//! heuristic is kept for offline use and tests.

use patentrag_core::error::{Error, Result};
use patentrag_core::retrieval::TokenCounter;
use std::sync::Arc;
use tiktoken_rs::CoreBPE;

/// Estimate the token count for a string.
///
/// Heuristic: 1 token ≈ 4 characters. Rounds up.
pub fn estimate_tokens(text: &str) -> usize {
    if text.is_empty() {
        return 0;
    }
    text.len().div_ceil(4)
}

/// [`estimate_tokens`] as a [`TokenCounter`].
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicTokenCounter;

impl TokenCounter for HeuristicTokenCounter {
    fn count(&self, text: &str) -> usize {
        estimate_tokens(text)
    }
}

/// Exact counts with tiktoken's `cl100k_base` encoding.
#[derive(Clone)]
pub struct Cl100kTokenCounter {
    bpe: Arc<CoreBPE>,
}

impl Cl100kTokenCounter {
    pub fn new() -> Result<Self> {
        let bpe = tiktoken_rs::cl100k_base()
            .map_err(|e| Error::Internal(format!("failed to load cl100k_base tokenizer: {e}")))?;
        Ok(Self { bpe: Arc::new(bpe) })
    }
}

impl TokenCounter for Cl100kTokenCounter {
    fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}

/// The counter named by `context.tokenizer`.
pub fn counter_for(name: &str) -> Result<Arc<dyn TokenCounter>> {
    match name {
        "cl100k" => Ok(Arc::new(Cl100kTokenCounter::new()?)),
        "heuristic" => Ok(Arc::new(HeuristicTokenCounter)),
        other => Err(Error::Config {
            message: format!("unknown tokenizer '{other}'"),
        }),
    }
}
