//! Subcommand implementations and the wiring they share.

pub mod chat;
pub mod index;
pub mod init;

use anyhow::{bail, Context};
use patentrag_config::AppConfig;
use patentrag_core::retrieval::Encoder;
use patentrag_providers::{ProviderEncoder, ProviderRouter};
use patentrag_retrieval::HashEncoder;
use std::sync::Arc;

/// The encoder named by `[embedding]`: the offline hashing encoder or an
/// embeddings endpoint of a configured provider.
pub fn build_encoder(config: &AppConfig, router: &ProviderRouter) -> anyhow::Result<Arc<dyn Encoder>> {
    let embedding = &config.embedding;
    if embedding.provider == "hashing" {
        return Ok(Arc::new(HashEncoder::new(embedding.dimensions)));
    }
    let Some(provider) = router.get(&embedding.provider) else {
        bail!(
            "Embedding provider '{}' is not configured. Add [providers.{}] to {}",
            embedding.provider,
            embedding.provider,
            AppConfig::config_dir().join("config.toml").display()
        );
    };
    Ok(Arc::new(ProviderEncoder::new(provider, &embedding.model)))
}

/// Fail early with setup instructions when a remote service needs a key.
pub fn require_api_key(config: &AppConfig) -> anyhow::Result<()> {
    if config.has_api_key() {
        return Ok(());
    }
    eprintln!();
    eprintln!("  ERROR: No API key configured!");
    eprintln!();
    eprintln!("  Set one of these environment variables (or put it in .env):");
    eprintln!("    PATENTRAG_API_KEY=...   (generic)");
    eprintln!("    MISTRAL_API_KEY=...     (Mistral)");
    eprintln!();
    eprintln!("  Or add it to your config file:");
    eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
    eprintln!();
    bail!("No API key found. See above for setup instructions.")
}

/// Load the config, pointing at the config path on failure.
pub fn load_config() -> anyhow::Result<AppConfig> {
    AppConfig::load().context("Failed to load config")
}
