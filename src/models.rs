use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Persisted per-image metadata. The stored prompt is always the user's
/// original text, never the enhanced one. Records are written once and
/// never updated.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub id: String,
    pub prompt: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum ImageSize {
    #[default]
    #[serde(rename = "1024x1024")]
    Square,
    #[serde(rename = "1792x1024")]
    Landscape,
    #[serde(rename = "1024x1792")]
    Portrait,
}

impl ImageSize {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageSize::Square => "1024x1024",
            ImageSize::Landscape => "1792x1024",
            ImageSize::Portrait => "1024x1792",
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ImageQuality {
    #[default]
    Standard,
    Hd,
}

impl ImageQuality {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageQuality::Standard => "standard",
            ImageQuality::Hd => "hd",
        }
    }
}

/// One generation attempt; lives for a single HTTP call.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub size: ImageSize,
    pub quality: ImageQuality,
}

impl GenerationRequest {
    pub fn new(
        prompt: impl Into<String>,
        size: ImageSize,
        quality: ImageQuality,
    ) -> Result<Self, ApiError> {
        let prompt = prompt.into();
        let prompt = prompt.trim().to_string();
        if prompt.is_empty() {
            return Err(ApiError::Validation("prompt must not be empty".to_string()));
        }
        Ok(Self { prompt, size, quality })
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateBody {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub size: Option<ImageSize>,
    #[serde(default)]
    pub quality: Option<ImageQuality>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub id: String,
    pub url: String,
    pub prompt: String,
}

#[derive(Debug, Serialize)]
pub struct GalleryResponse {
    pub success: bool,
    pub images: Vec<ImageRecord>,
}
