// src/clients/image_store.rs

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::common::error::AppError;

/// Largest inline image accepted for upload (5 MiB).
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Uploads an inline (data URL / base64) image and returns its public URL.
    async fn upload(&self, data: &str, public_id: &str) -> Result<String, AppError>;
}

pub fn is_remote_url(image: &str) -> bool {
    image.starts_with("http://") || image.starts_with("https://")
}

#[derive(Serialize)]
struct UploadRequest<'a> {
    file: &'a str,
    upload_preset: &'a str,
    public_id: &'a str,
    overwrite: bool,
}

#[derive(Deserialize)]
struct UploadResponse {
    secure_url: Option<String>,
}

// Unsigned upload against a CDN upload endpoint
pub struct HttpImageStore {
    client: Client,
    endpoint: String,
    upload_preset: String,
}

impl HttpImageStore {
    pub fn new(endpoint: String, upload_preset: String, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, endpoint, upload_preset })
    }
}

#[async_trait]
impl ImageStore for HttpImageStore {
    async fn upload(&self, data: &str, public_id: &str) -> Result<String, AppError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&UploadRequest {
                file: data,
                upload_preset: &self.upload_preset,
                public_id,
                overwrite: true,
            })
            .send()
            .await
            .map_err(|e| AppError::UpstreamFailure(format!("image upload transport: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::UpstreamFailure(format!("image upload answered {status}")));
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| AppError::UpstreamFailure(format!("image upload response: {e}")))?;

        body.secure_url
            .ok_or_else(|| AppError::UpstreamFailure("image upload returned no URL".into()))
    }
}

pub struct DisabledImageStore;

#[async_trait]
impl ImageStore for DisabledImageStore {
    async fn upload(&self, _data: &str, _public_id: &str) -> Result<String, AppError> {
        Err(AppError::UpstreamFailure("image storage is not configured".into()))
    }
}
