use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::error::ApiError;
use crate::models::{GalleryResponse, GenerateBody, GenerateResponse, GenerationRequest, ImageRecord};
use crate::pipeline::GenerationPipeline;
use crate::store::ImageStore;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<GenerationPipeline>,
    pub store: Arc<ImageStore>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/images/generate", post(generate_artwork))
        .route("/api/images", get(list_images))
        .route("/api/images/:id", get(get_image))
        .route("/api/images/:id/download", get(download_image))
        .with_state(state)
}

pub async fn generate_artwork(
    State(state): State<AppState>,
    Json(body): Json<GenerateBody>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let prompt = body
        .prompt
        .ok_or_else(|| ApiError::Validation("prompt is required".to_string()))?;
    let request = GenerationRequest::new(
        prompt,
        body.size.unwrap_or_default(),
        body.quality.unwrap_or_default(),
    )?;
    let artwork = state.pipeline.generate(request).await?;
    Ok(Json(GenerateResponse {
        success: true,
        id: artwork.id,
        url: artwork.url,
        prompt: artwork.prompt,
    }))
}

pub async fn list_images(
    State(state): State<AppState>,
) -> Result<Json<GalleryResponse>, ApiError> {
    let images = state
        .store
        .find_all()
        .await
        .map_err(|err| ApiError::Storage(err.to_string()))?;
    Ok(Json(GalleryResponse { success: true, images }))
}

pub async fn get_image(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let (_record, bytes) = load_image(&state, &id).await?;
    Ok(([(header::CONTENT_TYPE, "image/png")], bytes).into_response())
}

pub async fn download_image(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let (record, bytes) = load_image(&state, &id).await?;
    let filename = download_filename(&record.prompt, &id);
    Ok((
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

async fn load_image(state: &AppState, id: &str) -> Result<(ImageRecord, Vec<u8>), ApiError> {
    let record = state
        .store
        .find_by_id(id)
        .await
        .map_err(|err| ApiError::Storage(err.to_string()))?
        .ok_or_else(|| ApiError::NotFound(format!("no image with id {id}")))?;
    // Record present but blob missing: the half-written pair gets its own
    // message instead of a generic unknown-id response.
    if !state.store.exists(id).await {
        return Err(ApiError::NotFound(format!("image file for id {id} is missing")));
    }
    let bytes = tokio::fs::read(state.store.image_path(id))
        .await
        .map_err(|err| ApiError::Storage(err.to_string()))?;
    Ok((record, bytes))
}

/// Lowercase slug of the prompt, every non-alphanumeric character mapped to
/// a dash, capped at 50 characters.
pub fn download_filename(prompt: &str, id: &str) -> String {
    let slug: String = prompt
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .take(50)
        .collect();
    format!("artwork-{slug}-{id}.png")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn download_filename_maps_every_non_alphanumeric_to_a_dash() {
        assert_eq!(
            download_filename("A Beautiful!! Sunset@Sea", "abc123"),
            "artwork-a-beautiful---sunset-sea-abc123.png"
        );
    }

    #[test]
    fn download_filename_truncates_the_slug_to_fifty_characters() {
        let prompt = "x".repeat(80);
        let filename = download_filename(&prompt, "abc123");
        assert_eq!(filename, format!("artwork-{}-abc123.png", "x".repeat(50)));
    }

    #[test]
    fn download_filename_is_deterministic() {
        let a = download_filename("a cat", "abc123");
        let b = download_filename("a cat", "abc123");
        assert_eq!(a, b);
        assert_eq!(a, "artwork-a-cat-abc123.png");
    }
}
