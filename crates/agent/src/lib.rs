//! The conversation orchestrator — the heart of PatentRAG.
//!
//! Every user turn follows a **Rewrite → Route → Answer** cycle:
//!
//! 1. **Receive** a user message with the conversation's [`ConversationState`]
//! 2. **Shortcut** improvement requests before any rewriting
//! 3. **Rewrite** the question into a [`QueryPlan`](patentrag_core::QueryPlan)
//!    with filters, column priority and an optional aggregation
//! 4. **Route** through the handler cascade: metadata lookups, claims,
//!    prior art, families, timelines, aggregation
//! 5. **Retrieve** with progressively relaxed filters, pack and summarize
//!    the passages, and generate a citation-constrained answer
//!
//! The session is only updated once a handler has answered.

pub mod context;
pub mod handlers;
pub mod intent;
pub mod llm;
pub mod orchestrator;
pub mod rewriter;
pub mod session;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use context::{
    counter_for, estimate_tokens, pack_passages, Cl100kTokenCounter, ContextSummarizer,
    HeuristicTokenCounter, PackedPassages, SummaryLimits,
};
pub use handlers::{RetrievalLimits, Turn, TurnHandler, CITATION_REFUSAL, NOT_ENOUGH_INFO};
pub use llm::{Generator, Sampling};
pub use orchestrator::{Orchestrator, OrchestratorSettings};
pub use rewriter::{parse_plan, LlmQueryRewriter, QueryRewriter};
pub use session::ConversationState;
