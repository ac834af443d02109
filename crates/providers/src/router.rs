//! Provider router — selects the generation provider based on config.
//!
//! Every provider registered here is wrapped in [`RateLimitRetry`] so
//! callers never see a rate-limit error unless a retry cap is configured.

use std::collections::HashMap;
use std::sync::Arc;
use patentrag_config::AppConfig;
use patentrag_core::provider::Provider;
use crate::openai_compat::OpenAiCompatProvider;
use crate::retry::RateLimitRetry;

/// Routes LLM requests to the correct provider.
pub struct ProviderRouter {
    providers: HashMap<String, Arc<dyn Provider>>,
    default_provider: String,
}

impl ProviderRouter {
    /// Create a new router with a default provider.
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            providers: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    /// Register a provider.
    pub fn register(&mut self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        self.providers.insert(name.into(), provider);
    }

    /// Get the default provider.
    pub fn default(&self) -> Option<Arc<dyn Provider>> {
        self.providers.get(&self.default_provider).cloned()
    }

    /// Get a specific provider by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }
}

/// Build providers from configuration.
pub fn build_from_config(config: &AppConfig) -> ProviderRouter {
    let mut router = ProviderRouter::new(&config.default_provider);

    for (name, provider_config) in &config.providers {
        let api_key = provider_config
            .api_key
            .clone()
            .or_else(|| config.api_key.clone())
            .unwrap_or_default();

        let base_url = provider_config
            .api_url
            .clone()
            .unwrap_or_else(|| default_base_url(name));

        router.register(name.clone(), with_retry(config, name, &base_url, &api_key));
    }

    // Ensure the default provider exists (even if not explicitly configured)
    if router.get(&config.default_provider).is_none() {
        let api_key = config.api_key.clone().unwrap_or_default();
        let base_url = default_base_url(&config.default_provider);
        router.register(
            config.default_provider.clone(),
            with_retry(config, &config.default_provider, &base_url, &api_key),
        );
    }

    router
}

fn with_retry(config: &AppConfig, name: &str, base_url: &str, api_key: &str) -> Arc<dyn Provider> {
    let http = OpenAiCompatProvider::new(name, base_url, api_key)
        .with_default_retry_secs(config.rate_limit.default_retry_secs);
    Arc::new(RateLimitRetry::new(Arc::new(http)).with_max_retries(config.rate_limit.max_retries))
}

/// Get the default base URL for well-known providers.
fn default_base_url(provider_name: &str) -> String {
    match provider_name {
        "mistral" => "https://api.mistral.ai/v1".into(),
        "openai" => "https://api.openai.com/v1".into(),
        "openrouter" => "https://openrouter.ai/api/v1".into(),
        "ollama" => "http://localhost:11434/v1".into(),
        "together" => "https://api.together.xyz/v1".into(),
        "vllm" => "http://localhost:8000/v1".into(),
        _ => format!("https://{provider_name}.api.example.com/v1"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patentrag_config::ProviderConfig;

    #[test]
    fn default_provider_always_registered() {
        let router = build_from_config(&AppConfig::default());
        let provider = router.default().unwrap();
        assert_eq!(provider.name(), "mistral+retry");
    }

    #[test]
    fn configured_providers_are_registered() {
        let mut config = AppConfig::default();
        config.providers.insert(
            "ollama".into(),
            ProviderConfig {
                api_key: None,
                api_url: Some("http://gpu-box:11434/v1".into()),
                default_model: None,
            },
        );
        let router = build_from_config(&config);
        assert!(router.get("mistral").is_some());
        assert_eq!(router.get("ollama").unwrap().name(), "ollama+retry");
        assert!(router.get("anthropic").is_none());
    }

    #[test]
    fn known_base_urls() {
        assert_eq!(default_base_url("mistral"), "https://api.mistral.ai/v1");
        assert!(default_base_url("acme").contains("acme"));
    }
}
