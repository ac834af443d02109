//! Thin chat helper over a [`Provider`]: one model, per-call sampling.

use patentrag_core::error::ProviderError;
use patentrag_core::message::Message;
use patentrag_core::provider::{Provider, ProviderRequest};
use std::sync::Arc;
use tracing::debug;

/// Sampling settings for one kind of generation call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sampling {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Sampling {
    pub const REWRITE: Self = Self { temperature: 0.0, max_tokens: 512 };
    pub const BRAINSTORM: Self = Self { temperature: 0.7, max_tokens: 512 };
    pub const CLAIMS: Self = Self { temperature: 0.0, max_tokens: 512 };
    pub const MAP: Self = Self { temperature: 0.2, max_tokens: 512 };
    pub const REDUCE: Self = Self { temperature: 0.2, max_tokens: 768 };
    pub const ANSWER: Self = Self { temperature: 0.0, max_tokens: 512 };
}

/// A provider bound to a model name.
#[derive(Clone)]
pub struct Generator {
    provider: Arc<dyn Provider>,
    model: String,
}

impl Generator {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send `messages` and return the completion text.
    pub async fn complete(
        &self,
        messages: Vec<Message>,
        sampling: Sampling,
    ) -> Result<String, ProviderError> {
        let request = ProviderRequest {
            model: self.model.clone(),
            messages,
            temperature: sampling.temperature,
            max_tokens: Some(sampling.max_tokens),
        };
        let response = self.provider.complete(request).await?;
        if let Some(usage) = &response.usage {
            debug!(
                model = %response.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Generation complete"
            );
        }
        Ok(response.message.content)
    }
}
