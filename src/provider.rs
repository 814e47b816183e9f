use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::{AppConfig, ProviderKind};
use crate::gemini::GeminiClient;
use crate::models::{ImageQuality, ImageSize};
use crate::openai::OpenAiClient;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("{0}")]
    Api(String),
    #[error("{0}")]
    Unsupported(String),
}

/// Turn a text prompt into an image and return a fetchable remote URL.
/// One failed attempt surfaces immediately; no retries.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    async fn generate_image(
        &self,
        prompt: &str,
        size: ImageSize,
        quality: ImageQuality,
    ) -> Result<String, ProviderError>;
}

/// Single-turn chat completion, used for prompt enhancement.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError>;
}

pub fn image_provider(config: &AppConfig) -> Arc<dyn ImageProvider> {
    match config.image_provider {
        ProviderKind::OpenAi => Arc::new(OpenAiClient::new(
            config.settings(ProviderKind::OpenAi),
            config.chat_temperature,
        )),
        ProviderKind::Gemini => Arc::new(GeminiClient::new(
            config.settings(ProviderKind::Gemini),
            config.chat_temperature,
        )),
    }
}

pub fn chat_provider(config: &AppConfig) -> Arc<dyn ChatProvider> {
    match config.chat_provider {
        ProviderKind::OpenAi => Arc::new(OpenAiClient::new(
            config.settings(ProviderKind::OpenAi),
            config.chat_temperature,
        )),
        ProviderKind::Gemini => Arc::new(GeminiClient::new(
            config.settings(ProviderKind::Gemini),
            config.chat_temperature,
        )),
    }
}
