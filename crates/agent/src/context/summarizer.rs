//! Context-budgeted summarization of retrieved passages.
//!
//! Passages arrive as `[id] "title" || body`. When their total size is under
//! the ceiling they are returned joined by blank lines with no generation
//! call. Otherwise the bodies are map-reduced into one synthesis and every
//! original header is re-attached to it, so each cited patent still has its
//! own line.

use crate::llm::{Generator, Sampling};
use patentrag_core::error::ProviderError;
use patentrag_core::message::Message;
use patentrag_core::retrieval::TokenCounter;
use std::sync::Arc;
use tracing::{debug, info};

const HEADER_SEPARATOR: &str = "||";

/// Size limits for [`ContextSummarizer`].
#[derive(Debug, Clone, Copy)]
pub struct SummaryLimits {
    /// Totals at or above this many tokens trigger map-reduce.
    pub ceiling: usize,
    /// Token budget for the bodies packed into one map call.
    pub chunk_tokens: usize,
}

impl Default for SummaryLimits {
    fn default() -> Self {
        Self {
            ceiling: 60_000,
            chunk_tokens: 4_096,
        }
    }
}

pub struct ContextSummarizer {
    generator: Generator,
    counter: Arc<dyn TokenCounter>,
    limits: SummaryLimits,
}

impl ContextSummarizer {
    pub fn new(generator: Generator, counter: Arc<dyn TokenCounter>, limits: SummaryLimits) -> Self {
        Self {
            generator,
            counter,
            limits,
        }
    }

    pub async fn summarize(&self, query: &str, passages: &[String]) -> Result<String, ProviderError> {
        let total: usize = passages.iter().map(|p| self.counter.count(p)).sum();
        if total < self.limits.ceiling {
            debug!(passages = passages.len(), tokens = total, "Context fits, no summarization");
            return Ok(passages.join("\n\n"));
        }

        let (headers, bodies): (Vec<&str>, Vec<&str>) = passages.iter().map(|p| split_header(p)).unzip();
        let chunks = pack_bodies(&bodies, self.counter.as_ref(), self.limits.chunk_tokens);
        info!(
            passages = passages.len(),
            tokens = total,
            chunks = chunks.len(),
            "Context over ceiling, map-reducing"
        );

        let mut partials = Vec::with_capacity(chunks.len());
        for (i, chunk) in chunks.iter().enumerate() {
            let messages = vec![
                Message::system(format!(
                    "Summarise chunk {}/{} relevant to: '{}'.",
                    i + 1,
                    chunks.len(),
                    query
                )),
                Message::user(chunk.clone()),
            ];
            partials.push(self.generator.complete(messages, Sampling::MAP).await?);
        }

        let combined = self
            .generator
            .complete(
                vec![
                    Message::system("Combine the following partial summaries into one coherent passage."),
                    Message::user(partials.join("\n\n")),
                ],
                Sampling::REDUCE,
            )
            .await?;

        Ok(headers
            .iter()
            .map(|h| format!("{h} {HEADER_SEPARATOR} {combined}"))
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

/// `(header, body)` around the first `||`; no separator means header only.
fn split_header(passage: &str) -> (&str, &str) {
    match passage.split_once(HEADER_SEPARATOR) {
        Some((head, body)) => (head.trim(), body.trim()),
        None => (passage.trim(), ""),
    }
}

/// Greedy in-order packing. A body is never split; one that exceeds the
/// budget on its own becomes its own chunk.
fn pack_bodies(bodies: &[&str], counter: &dyn TokenCounter, budget: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut buf: Vec<&str> = Vec::new();
    let mut buf_tokens = 0;

    for &body in bodies {
        let tokens = counter.count(body);
        if !buf.is_empty() && buf_tokens + tokens > budget {
            chunks.push(buf.join("\n\n"));
            buf.clear();
            buf_tokens = 0;
        }
        buf.push(body);
        buf_tokens += tokens;
    }
    if !buf.is_empty() {
        chunks.push(buf.join("\n\n"));
    }
    chunks
}
