//! Query encoder backed by a provider's `/embeddings` endpoint.

use async_trait::async_trait;
use patentrag_core::error::RetrievalError;
use patentrag_core::provider::{EmbeddingRequest, Provider};
use patentrag_core::retrieval::Encoder;
use std::sync::Arc;

/// Encodes text with a remote embedding model.
pub struct ProviderEncoder {
    provider: Arc<dyn Provider>,
    model: String,
}

impl ProviderEncoder {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Encoder for ProviderEncoder {
    fn name(&self) -> &str {
        &self.model
    }

    async fn encode(&self, text: &str) -> Result<Vec<f32>, RetrievalError> {
        let mut vectors = self.encode_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| RetrievalError::Embedding("provider returned no embedding".into()))
    }

    async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        let response = self
            .provider
            .embed(EmbeddingRequest {
                model: self.model.clone(),
                inputs: texts.to_vec(),
            })
            .await
            .map_err(|e| RetrievalError::Embedding(e.to_string()))?;

        if response.embeddings.len() != texts.len() {
            return Err(RetrievalError::Embedding(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                response.embeddings.len()
            )));
        }
        Ok(response.embeddings)
    }
}
