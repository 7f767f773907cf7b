//! Embedding service backed by a provider's embeddings endpoint.

use async_trait::async_trait;
use folio_core::error::SearchError;
use folio_core::provider::{EmbeddingRequest, Provider};
use folio_core::search::Embedder;
use std::sync::Arc;
use tracing::debug;

/// Embeds text with one fixed model so that stored passages and queries
/// share a vector space.
pub struct ProviderEmbedder {
    provider: Arc<dyn Provider>,
    model: String,
}

impl ProviderEmbedder {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Embedder for ProviderEmbedder {
    fn name(&self) -> &str {
        self.provider.name()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, SearchError> {
        let response = self
            .provider
            .embed(EmbeddingRequest {
                model: self.model.clone(),
                inputs: vec![text.to_string()],
            })
            .await
            .map_err(|e| SearchError::Embedding(e.to_string()))?;

        let vector = response
            .embeddings
            .into_iter()
            .next()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| SearchError::Embedding("provider returned no embedding".into()))?;

        debug!(model = %self.model, dims = vector.len(), "Embedded text");
        Ok(vector)
    }
}
