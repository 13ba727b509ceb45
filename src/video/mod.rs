//! Mux video platform client.
//!
//! Lessons reference a playback id, but the instructor UI only knows the
//! asset id (or, right after upload, the upload id). This client resolves
//! either to a playable asset.

use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::error::{AppError, Result};

#[derive(Debug, Clone)]
pub struct MuxConfig {
    pub token_id: String,
    pub token_secret: String,
}

/// Resolution result for a video reference.
#[derive(Debug)]
pub enum VideoResolution {
    Ready(VideoAsset),
    /// The upload exists but transcoding hasn't produced an asset yet.
    Processing,
}

#[derive(Debug, Clone)]
pub struct VideoAsset {
    pub playback_id: String,
    pub duration_secs: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct AssetResponse {
    data: AssetData,
}

#[derive(Debug, Deserialize)]
struct AssetData {
    #[serde(default)]
    playback_ids: Vec<PlaybackId>,
    duration: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct PlaybackId {
    id: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    data: UploadData,
}

#[derive(Debug, Deserialize)]
struct UploadData {
    asset_id: Option<String>,
}

#[derive(Clone)]
pub struct MuxClient {
    client: Client,
    token_id: String,
    token_secret: String,
}

impl MuxClient {
    pub fn new(config: &MuxConfig) -> Self {
        Self {
            client: Client::new(),
            token_id: config.token_id.clone(),
            token_secret: config.token_secret.clone(),
        }
    }

    async fn get_asset(&self, asset_id: &str) -> Result<Option<AssetData>> {
        let response = self
            .client
            .get(format!("https://api.mux.com/video/v1/assets/{}", asset_id))
            .basic_auth(&self.token_id, Some(&self.token_secret))
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Mux API error: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!("Mux API error: {}", error_text)));
        }

        let asset: AssetResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse Mux response: {}", e)))?;
        Ok(Some(asset.data))
    }

    /// Look up an upload and return its asset id. `Ok(None)` means the
    /// upload exists but transcoding hasn't produced an asset yet.
    async fn get_upload_asset_id(&self, upload_id: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get(format!("https://api.mux.com/video/v1/uploads/{}", upload_id))
            .basic_auth(&self.token_id, Some(&self.token_secret))
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("Mux API error: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(AppError::NotFound(format!(
                "No Mux asset or upload with id {}",
                upload_id
            )));
        }
        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Upstream(format!("Mux API error: {}", error_text)));
        }

        let upload: UploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::Upstream(format!("Failed to parse Mux response: {}", e)))?;
        Ok(upload.data.asset_id)
    }

    /// Resolve an asset id or upload id to a playback id and duration.
    ///
    /// Tries the id as an asset first, then as an upload. An upload with no
    /// asset yet resolves to `Processing` so the caller can tell the
    /// instructor to retry shortly.
    pub async fn resolve_video(&self, video_id: &str) -> Result<VideoResolution> {
        let asset = match self.get_asset(video_id).await? {
            Some(asset) => asset,
            None => {
                let asset_id = match self.get_upload_asset_id(video_id).await? {
                    Some(id) => id,
                    None => {
                        // Upload exists but no asset yet, or unknown id.
                        // Treat a known upload without an asset as processing.
                        return Ok(VideoResolution::Processing);
                    }
                };
                self.get_asset(&asset_id).await?.ok_or_else(|| {
                    AppError::Upstream(format!("Mux asset {} not found for upload", asset_id))
                })?
            }
        };

        let playback_id = asset
            .playback_ids
            .first()
            .map(|p| p.id.clone())
            .ok_or_else(|| AppError::Upstream("No playback ID available for this video".into()))?;

        Ok(VideoResolution::Ready(VideoAsset {
            playback_id,
            duration_secs: asset.duration.map(|d| d.round() as i64),
        }))
    }
}
