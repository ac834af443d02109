//! Retrieval for PatentRAG: record table, filter evaluation, frequency
//! tables, the chunk index and passage search.

pub mod chunker;
pub mod corpus;
pub mod filter;
pub mod flat_index;
pub mod hashing;
pub mod retriever;
pub mod stats;

pub use chunker::{build_index, word_windows, ChunkingOptions};
pub use corpus::Corpus;
pub use filter::{apply_filters, evaluate, record_matches};
pub use flat_index::{ChunkIndex, FlatIndex, IndexedChunk};
pub use hashing::HashEncoder;
pub use retriever::{PassageRetriever, PassageSearch, SearchRequest};
pub use stats::{group_by_year, top_k_groups};
