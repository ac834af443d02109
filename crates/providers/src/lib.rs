//! Generation-service and embedding clients for PatentRAG.
//!
//! All providers implement the `patentrag_core::Provider` trait.
//! The router builds them from configuration, wrapped in the rate-limit
//! retry policy.

pub mod encoder;
pub mod openai_compat;
pub mod retry;
pub mod router;

pub use encoder::ProviderEncoder;
pub use openai_compat::OpenAiCompatProvider;
pub use retry::RateLimitRetry;
pub use router::{build_from_config, ProviderRouter};
