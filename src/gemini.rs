use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::config::ProviderSettings;
use crate::models::{ImageQuality, ImageSize};
use crate::provider::{ChatProvider, ImageProvider, ProviderError};

pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    chat_model: String,
    temperature: f32,
}

impl GeminiClient {
    pub fn new(settings: &ProviderSettings, temperature: f32) -> Self {
        Self {
            client: Client::new(),
            api_key: settings.api_key.clone().unwrap_or_default(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            chat_model: settings.chat_model.clone(),
            temperature,
        }
    }
}

#[async_trait]
impl ImageProvider for GeminiClient {
    async fn generate_image(
        &self,
        _prompt: &str,
        _size: ImageSize,
        _quality: ImageQuality,
    ) -> Result<String, ProviderError> {
        Err(ProviderError::Unsupported(
            "image generation is not implemented for the gemini provider".to_string(),
        ))
    }
}

#[async_trait]
impl ChatProvider for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.chat_model, self.api_key
        );
        let payload = json!({
            "contents": [{
                "parts": [{"text": prompt}]
            }],
            "generationConfig": {
                "temperature": self.temperature,
                "topK": 40,
                "topP": 0.95,
                "maxOutputTokens": 450
            }
        });

        info!(model = %self.chat_model, "Generating text with Gemini API...");
        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;
        if !status.is_success() {
            return Err(ProviderError::Api(format!(
                "Gemini API returned {status}: {response_text}"
            )));
        }

        let parsed: GeminiResponse = serde_json::from_str(&response_text)
            .map_err(|e| ProviderError::Api(format!("failed to parse Gemini response: {e}")))?;

        if let Some(candidate) = parsed.candidates.first() {
            for part in &candidate.content.parts {
                if let Part::Text { text } = part {
                    return Ok(text.trim().to_string());
                }
            }
        }
        Err(ProviderError::Api("no text content found in Gemini response".to_string()))
    }
}

// --- Response Parsing Helpers ---

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Content,
}

#[derive(Debug, Deserialize, Default)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    Other(serde_json::Value),
}
