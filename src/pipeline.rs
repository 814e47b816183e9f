use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::enhancer::PromptEnhancer;
use crate::error::ApiError;
use crate::models::GenerationRequest;
use crate::provider::{ImageProvider, ProviderError};
use crate::store::ImageStore;

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedArtwork {
    pub id: String,
    pub url: String,
    pub prompt: String,
}

/// enhance -> generate -> persist, short-circuiting on the first failure.
pub struct GenerationPipeline {
    enhancer: PromptEnhancer,
    provider: Arc<dyn ImageProvider>,
    store: Arc<ImageStore>,
}

impl GenerationPipeline {
    pub fn new(
        enhancer: PromptEnhancer,
        provider: Arc<dyn ImageProvider>,
        store: Arc<ImageStore>,
    ) -> Self {
        Self { enhancer, provider, store }
    }

    pub async fn generate(&self, request: GenerationRequest) -> Result<GeneratedArtwork, ApiError> {
        info!("🚀 Generating artwork for prompt: {}", request.prompt);

        let enhanced = self.enhancer.enhance(&request.prompt).await;

        let remote_url = self
            .provider
            .generate_image(&enhanced, request.size, request.quality)
            .await
            .map_err(|err| match err {
                ProviderError::Unsupported(message) => ApiError::Unsupported(message),
                other => ApiError::Generation(other.to_string()),
            })?;

        // The stored prompt is the user's original, not the enhanced one.
        let id = self
            .store
            .save(
                &remote_url,
                &request.prompt,
                Some(request.size.as_str().to_string()),
                Some(request.quality.as_str().to_string()),
            )
            .await
            .map_err(|err| ApiError::Storage(err.to_string()))?;

        info!("✅ Artwork {} stored", id);
        Ok(GeneratedArtwork {
            url: format!("/api/images/{id}"),
            id,
            prompt: request.prompt,
        })
    }
}
