use std::path::PathBuf;

use bytes::Bytes;
use chrono::Utc;
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::{Client, Url};
use thiserror::Error;
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::ImageRecord;

const MAX_REDIRECTS: usize = 5;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("download failed: {0}")]
    Download(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("metadata serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Flat directory of `{id}.png` + `{id}.json` pairs.
#[derive(Clone)]
pub struct ImageStore {
    root: PathBuf,
    client: Client,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        // Redirects are followed manually in `download` so a hop without a
        // Location header can be rejected and the chain length capped.
        let client = Client::builder().redirect(Policy::none()).build()?;
        Ok(Self { root: root.into(), client })
    }

    pub fn image_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.png"))
    }

    pub fn record_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }

    /// Presence of the image file only, independent of the metadata file.
    pub async fn exists(&self, id: &str) -> bool {
        fs::metadata(self.image_path(id)).await.is_ok()
    }

    /// Fetches the bytes behind `source_url`, writes them under a fresh id,
    /// then writes the sidecar record. Image first, record second: a crash
    /// in between leaves a stray image file that no lookup will surface.
    pub async fn save(
        &self,
        source_url: &str,
        prompt: &str,
        size: Option<String>,
        quality: Option<String>,
    ) -> Result<String, StoreError> {
        let bytes = self.download(source_url).await?;
        let id = Uuid::new_v4().to_string();

        fs::create_dir_all(&self.root).await?;
        fs::write(self.image_path(&id), &bytes).await?;

        let record = ImageRecord {
            id: id.clone(),
            prompt: prompt.to_string(),
            created_at: Utc::now(),
            size,
            quality,
        };
        fs::write(self.record_path(&id), serde_json::to_vec_pretty(&record)?).await?;

        info!(%id, bytes = bytes.len(), "stored generated image");
        Ok(id)
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<ImageRecord>, StoreError> {
        let path = self.record_path(id);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        match serde_json::from_slice(&bytes) {
            Ok(record) => Ok(Some(record)),
            Err(err) => {
                warn!(%id, "treating malformed record file as absent: {err}");
                Ok(None)
            }
        }
    }

    /// All records, newest first. Unparsable record files are skipped.
    pub async fn find_all(&self) -> Result<Vec<ImageRecord>, StoreError> {
        let mut records = Vec::new();
        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(records),
            Err(err) => return Err(err.into()),
        };
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let bytes = fs::read(&path).await?;
            match serde_json::from_slice::<ImageRecord>(&bytes) {
                Ok(record) => records.push(record),
                Err(err) => {
                    warn!(path = %path.display(), "skipping malformed record file: {err}");
                }
            }
        }
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    async fn download(&self, source_url: &str) -> Result<Bytes, StoreError> {
        let mut url = Url::parse(source_url)
            .map_err(|err| StoreError::Download(format!("invalid source url {source_url}: {err}")))?;
        for _ in 0..=MAX_REDIRECTS {
            let response = self.client.get(url.clone()).send().await?;
            let status = response.status();
            if status.is_redirection() {
                let location = response
                    .headers()
                    .get(LOCATION)
                    .and_then(|value| value.to_str().ok())
                    .ok_or_else(|| {
                        StoreError::Download(format!("redirect from {url} carried no Location header"))
                    })?;
                url = url.join(location).map_err(|err| {
                    StoreError::Download(format!("invalid redirect target {location}: {err}"))
                })?;
                continue;
            }
            if !status.is_success() {
                return Err(StoreError::Download(format!(
                    "unexpected status {status} fetching {url}"
                )));
            }
            return Ok(response.bytes().await?);
        }
        Err(StoreError::Download(format!(
            "more than {MAX_REDIRECTS} redirects fetching {source_url}"
        )))
    }
}
