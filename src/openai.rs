use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::config::ProviderSettings;
use crate::models::{ImageQuality, ImageSize};
use crate::provider::{ChatProvider, ImageProvider, ProviderError};

pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    image_model: String,
    chat_model: String,
    temperature: f32,
}

impl OpenAiClient {
    pub fn new(settings: &ProviderSettings, temperature: f32) -> Self {
        Self {
            client: Client::new(),
            api_key: settings.api_key.clone().unwrap_or_default(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            image_model: settings.image_model.clone(),
            chat_model: settings.chat_model.clone(),
            temperature,
        }
    }
}

#[async_trait]
impl ImageProvider for OpenAiClient {
    async fn generate_image(
        &self,
        prompt: &str,
        size: ImageSize,
        quality: ImageQuality,
    ) -> Result<String, ProviderError> {
        let url = format!("{}/images/generations", self.base_url);
        let body = json!({
            "model": self.image_model,
            "prompt": prompt,
            "n": 1,
            "size": size.as_str(),
            "quality": quality.as_str(),
            "response_format": "url",
        });

        info!(model = %self.image_model, "Generating image with OpenAI API...");
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;
        if !status.is_success() {
            return Err(ProviderError::Api(format!(
                "OpenAI image API returned {status}: {response_text}"
            )));
        }

        let parsed: ImagesResponse = serde_json::from_str(&response_text)
            .map_err(|e| ProviderError::Api(format!("unexpected image response: {e}")))?;
        let image = parsed
            .data
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Api("OpenAI image API returned no images".to_string()))?;
        image
            .url
            .ok_or_else(|| ProviderError::Api("OpenAI image API returned an image without a url".to_string()))
    }
}

#[async_trait]
impl ChatProvider for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.chat_model,
            "messages": [{ "role": "user", "content": prompt }],
            "temperature": self.temperature,
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let response_text = response.text().await?;
        if !status.is_success() {
            return Err(ProviderError::Api(format!(
                "OpenAI chat API returned {status}: {response_text}"
            )));
        }

        let parsed: ChatResponse = serde_json::from_str(&response_text)
            .map_err(|e| ProviderError::Api(format!("unexpected chat response: {e}")))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| ProviderError::Api("OpenAI chat API returned no completion".to_string()))
    }
}

// --- Response Parsing Helpers ---

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> OpenAiClient {
        let settings = ProviderSettings {
            api_key: Some("sk-test".into()),
            base_url: server.uri(),
            image_model: "dall-e-3".into(),
            chat_model: "gpt-4o-mini".into(),
        };
        OpenAiClient::new(&settings, 0.7)
    }

    #[tokio::test]
    async fn generate_image_returns_the_first_url() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/images/generations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "created": 1,
                "data": [{ "url": "https://cdn.example/artwork.png" }]
            })))
            .mount(&server)
            .await;

        let url = client_for(&server)
            .generate_image("a cat", ImageSize::Square, ImageQuality::Standard)
            .await
            .unwrap();
        assert_eq!(url, "https://cdn.example/artwork.png");
    }

    #[tokio::test]
    async fn generate_image_wraps_remote_errors_with_the_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/images/generations"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": { "message": "invalid api key" }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .generate_image("a cat", ImageSize::Square, ImageQuality::Standard)
            .await
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("401"), "got: {message}");
        assert!(message.contains("invalid api key"), "got: {message}");
    }

    #[tokio::test]
    async fn generate_image_rejects_an_empty_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/images/generations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": [] })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .generate_image("a cat", ImageSize::Square, ImageQuality::Standard)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Api(_)));
    }

    #[tokio::test]
    async fn complete_returns_the_trimmed_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{ "message": { "role": "assistant", "content": "  a richer prompt \n" } }]
            })))
            .mount(&server)
            .await;

        let completion = client_for(&server).complete("a cat").await.unwrap();
        assert_eq!(completion, "a richer prompt");
    }

    #[tokio::test]
    async fn complete_rejects_a_response_with_no_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
            .mount(&server)
            .await;

        let err = client_for(&server).complete("a cat").await.unwrap_err();
        assert!(matches!(err, ProviderError::Api(_)));
    }
}
