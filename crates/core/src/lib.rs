//! # PatentRAG Core
//!
//! Domain types, traits, and error definitions for the PatentRAG
//! question-answering engine. This crate has **no I/O** — it defines the
//! domain model that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external capability (generation service, query encoder, vector
//! index, token counter) is a trait here. Implementations live in their
//! respective crates, so tests can swap in scripted mocks.

pub mod date;
pub mod error;
pub mod filter;
pub mod message;
pub mod provider;
pub mod record;
pub mod retrieval;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use filter::{AggregationSpec, Filter, FilterOp, QueryPlan};
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse};
pub use record::{Chunk, PatentRecord, COLUMN_WHITELIST};
pub use retrieval::{Encoder, IndexHit, Passage, TokenCounter, VectorIndex};
