//! Configuration loading, validation, and management for PatentRAG.
//!
//! Loads configuration from `~/.patentrag/config.toml` with `.env` and
//! environment variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.patentrag/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key (can be overridden per-provider)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default LLM provider
    #[serde(default = "default_provider")]
    pub default_provider: String,

    /// Default chat model
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Provider-specific configurations
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,

    /// Query encoder configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Record table and chunk index locations
    #[serde(default)]
    pub data: DataConfig,

    /// Passage retrieval limits and chunking
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Token budgets for context assembly and summarization
    #[serde(default)]
    pub context: ContextConfig,

    /// Conversation memory
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Rate-limit retry policy
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

fn default_provider() -> String {
    "mistral".into()
}
fn default_model() -> String {
    "open-mixtral-8x22b".into()
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("default_provider", &self.default_provider)
            .field("default_model", &self.default_model)
            .field("providers", &self.providers)
            .field("embedding", &self.embedding)
            .field("data", &self.data)
            .field("retrieval", &self.retrieval)
            .field("context", &self.context)
            .field("conversation", &self.conversation)
            .field("rate_limit", &self.rate_limit)
            .finish()
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("api_key", &redact(&self.api_key))
            .field("api_url", &self.api_url)
            .field("default_model", &self.default_model)
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Provider name, or `"hashing"` for the offline feature-hashing encoder.
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Vector size of the hashing encoder.
    #[serde(default = "default_embedding_dimensions")]
    pub dimensions: usize,
}

fn default_embedding_provider() -> String {
    "mistral".into()
}
fn default_embedding_model() -> String {
    "mistral-embed".into()
}
fn default_embedding_dimensions() -> usize {
    384
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: default_embedding_model(),
            dimensions: default_embedding_dimensions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// CSV, JSON array or JSON-lines file of patent records.
    #[serde(default = "default_records_path")]
    pub records_path: PathBuf,

    /// Chunk index written by `patentrag index`.
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,
}

fn default_records_path() -> PathBuf {
    AppConfig::data_dir().join("patents.jsonl")
}
fn default_index_path() -> PathBuf {
    AppConfig::data_dir().join("chunks.index.json")
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            records_path: default_records_path(),
            index_path: default_index_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Nearest chunks requested from the index per search.
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,

    /// Passages returned per search after filtering and re-ranking.
    #[serde(default = "default_top_k_return")]
    pub top_k_return: usize,

    /// Words per indexed chunk.
    #[serde(default = "default_chunk_words")]
    pub chunk_words: usize,

    /// Words shared by consecutive chunks.
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
}

fn default_max_candidates() -> usize {
    400
}
fn default_top_k_return() -> usize {
    60
}
fn default_chunk_words() -> usize {
    512
}
fn default_chunk_overlap() -> usize {
    64
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_candidates: default_max_candidates(),
            top_k_return: default_top_k_return(),
            chunk_words: default_chunk_words(),
            chunk_overlap: default_chunk_overlap(),
        }
    }
}

/// Accepted values of `context.tokenizer`.
pub const TOKENIZERS: &[&str] = &["cl100k", "heuristic"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Model context window used for passage packing.
    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: usize,

    /// Tokens reserved for instructions and history.
    #[serde(default = "default_prompt_overhead")]
    pub prompt_overhead: usize,

    /// Passages totalling fewer tokens than this are passed through verbatim.
    #[serde(default = "default_summary_ceiling")]
    pub summary_ceiling: usize,

    /// Token budget of one map-step chunk.
    #[serde(default = "default_summary_chunk_tokens")]
    pub summary_chunk_tokens: usize,

    /// Tokenizer behind every budget: `cl100k` or `heuristic` (4 chars per token).
    #[serde(default = "default_tokenizer")]
    pub tokenizer: String,
}

fn default_max_context_tokens() -> usize {
    60_000
}
fn default_prompt_overhead() -> usize {
    2_000
}
fn default_summary_ceiling() -> usize {
    60_000
}
fn default_summary_chunk_tokens() -> usize {
    4_096
}
fn default_tokenizer() -> String {
    "cl100k".into()
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_context_tokens: default_max_context_tokens(),
            prompt_overhead: default_prompt_overhead(),
            summary_ceiling: default_summary_ceiling(),
            summary_chunk_tokens: default_summary_chunk_tokens(),
            tokenizer: default_tokenizer(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// User/assistant pairs kept in memory.
    #[serde(default = "default_max_turns")]
    pub max_turns: usize,

    /// Most recent messages shown to the query rewriter.
    #[serde(default = "default_rewriter_history")]
    pub rewriter_history: usize,
}

fn default_max_turns() -> usize {
    5
}
fn default_rewriter_history() -> usize {
    10
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_turns: default_max_turns(),
            rewriter_history: default_rewriter_history(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Sleep used when the service does not send `Retry-After`.
    #[serde(default = "default_retry_secs")]
    pub default_retry_secs: u64,

    /// Give up after this many rate-limited attempts. Unset retries forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<u32>,
}

fn default_retry_secs() -> u64 {
    5
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            default_retry_secs: default_retry_secs(),
            max_retries: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.patentrag/config.toml).
    ///
    /// A `.env` file in the working directory is read first. Environment
    /// variables then override the file:
    /// - `PATENTRAG_API_KEY` (highest priority)
    /// - `MISTRAL_API_KEY`
    /// - `PATENTRAG_PROVIDER`, `PATENTRAG_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!("Loaded environment from {}", path.display());
        }

        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if config.api_key.is_none() {
            config.api_key = std::env::var("PATENTRAG_API_KEY")
                .ok()
                .or_else(|| std::env::var("MISTRAL_API_KEY").ok());
        }

        if let Ok(provider) = std::env::var("PATENTRAG_PROVIDER") {
            config.default_provider = provider;
        }

        if let Ok(model) = std::env::var("PATENTRAG_MODEL") {
            config.default_model = model;
        }

        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".patentrag")
    }

    /// Get the data directory path.
    pub fn data_dir() -> PathBuf {
        Self::config_dir().join("data")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.retrieval.max_candidates == 0 || self.retrieval.top_k_return == 0 {
            return Err(ConfigError::ValidationError(
                "max_candidates and top_k_return must be > 0".into(),
            ));
        }

        if self.retrieval.chunk_overlap >= self.retrieval.chunk_words {
            return Err(ConfigError::ValidationError(
                "chunk_overlap must be smaller than chunk_words".into(),
            ));
        }

        if self.context.prompt_overhead >= self.context.max_context_tokens {
            return Err(ConfigError::ValidationError(
                "prompt_overhead must be smaller than max_context_tokens".into(),
            ));
        }

        if self.context.summary_chunk_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "summary_chunk_tokens must be > 0".into(),
            ));
        }

        if !TOKENIZERS.contains(&self.context.tokenizer.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "unknown tokenizer '{}', expected one of {TOKENIZERS:?}",
                self.context.tokenizer
            )));
        }

        if self.conversation.max_turns == 0 {
            return Err(ConfigError::ValidationError("max_turns must be > 0".into()));
        }

        if self.embedding.provider == "hashing" && self.embedding.dimensions == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.dimensions must be > 0".into(),
            ));
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
            || self
                .providers
                .get(&self.default_provider)
                .is_some_and(|p| p.api_key.is_some())
    }

    /// Passage token budget: context window minus prompt overhead.
    pub fn passage_budget(&self) -> usize {
        self.context
            .max_context_tokens
            .saturating_sub(self.context.prompt_overhead)
    }

    /// Generate a default config TOML string (for the `init` command).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            default_provider: default_provider(),
            default_model: default_model(),
            providers: HashMap::new(),
            embedding: EmbeddingConfig::default(),
            data: DataConfig::default(),
            retrieval: RetrievalConfig::default(),
            context: ContextConfig::default(),
            conversation: ConversationConfig::default(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
