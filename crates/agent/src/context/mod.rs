//! Context assembly for the final answer.
//!
//! | Step | Module | Limit |
//! |------|--------|-------|
//! | 1. Pack retrieved passages | `budget` | max context tokens − prompt overhead |
//! | 2. Compress oversized context | `summarizer` | summary ceiling, per-chunk budget |
//!
//! Both steps count tokens with the same [`TokenCounter`](patentrag_core::TokenCounter).

pub mod budget;
pub mod summarizer;
pub mod token;

pub use budget::{pack_passages, PackedPassages};
pub use summarizer::{ContextSummarizer, SummaryLimits};
pub use token::{counter_for, estimate_tokens, Cl100kTokenCounter, HeuristicTokenCounter};
