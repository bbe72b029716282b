//! Image pinning.
//!
//! Upload credentials are never configured in the client. Each upload asks a
//! server endpoint for a short-lived token scoped to one file and presents it
//! as a bearer token to the pinning API.

use crate::error::UploadError;
use crate::models::ImageFile;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Stores an image and returns the URL it can be fetched from
#[async_trait]
pub trait ImagePinner: Send + Sync {
    async fn pin(&self, image: &ImageFile) -> Result<String, UploadError>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenRequest<'a> {
    purpose: &'a str,
    file_name: &'a str,
    content_type: &'a str,
    size: usize,
}

/// Token handed out by the upload-signing endpoint
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl UploadToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: Option<String>,
}

/// Pinata-compatible pinning client
pub struct PinningClient {
    client: Client,
    api_url: String,
    token_endpoint: String,
    gateway: String,
}

impl PinningClient {
    pub fn new(
        api_url: impl Into<String>,
        token_endpoint: impl Into<String>,
        gateway: impl Into<String>,
        timeout: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token_endpoint: token_endpoint.into(),
            gateway: gateway.into(),
        })
    }

    async fn request_token(&self, image: &ImageFile) -> Result<UploadToken, UploadError> {
        let body = TokenRequest {
            purpose: "property-image",
            file_name: &image.file_name,
            content_type: &image.content_type,
            size: image.len(),
        };

        let response = self
            .client
            .post(&self.token_endpoint)
            .json(&body)
            .send()
            .await
            .map_err(UploadError::Network)?;

        if !response.status().is_success() {
            return Err(UploadError::Credentials(format!(
                "signing endpoint returned {}",
                response.status()
            )));
        }

        let token: UploadToken = response
            .json()
            .await
            .map_err(|e| UploadError::Credentials(format!("malformed token response: {}", e)))?;

        if token.is_expired(Utc::now()) {
            return Err(UploadError::Credentials("token already expired".to_string()));
        }
        Ok(token)
    }

    fn gateway_url(&self, hash: &str) -> String {
        if self.gateway.ends_with('/') {
            format!("{}{}", self.gateway, hash)
        } else {
            format!("{}/{}", self.gateway, hash)
        }
    }
}

/// Metadata attached to every pinned image
pub fn pin_metadata(file_name: &str, now: DateTime<Utc>) -> Value {
    json!({
        "name": format!("Property-{}-{}", now.timestamp_millis(), file_name),
        "keyvalues": {
            "type": "property-image",
            "uploadedAt": now.to_rfc3339()
        }
    })
}

/// Pull a human-readable message out of a pinning-service error body
pub fn error_message(body: &Value) -> String {
    body.pointer("/error/details")
        .and_then(Value::as_str)
        .or_else(|| body.get("message").and_then(Value::as_str))
        .unwrap_or("Unknown error")
        .to_string()
}

#[async_trait]
impl ImagePinner for PinningClient {
    async fn pin(&self, image: &ImageFile) -> Result<String, UploadError> {
        info!("Starting image upload: {} ({} bytes)", image.file_name, image.len());

        let token = self.request_token(image).await?;

        let part = Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(&image.content_type)
            .map_err(UploadError::Network)?;
        let form = Form::new()
            .part("file", part)
            .text("pinataMetadata", pin_metadata(&image.file_name, Utc::now()).to_string());

        let response = self
            .client
            .post(format!("{}/pinning/pinFileToIPFS", self.api_url))
            .bearer_auth(&token.token)
            .multipart(form)
            .send()
            .await
            .map_err(UploadError::Network)?;

        let status = response.status();
        if !status.is_success() {
            let body: Value = response.json().await.unwrap_or(Value::Null);
            warn!("Pinning service returned {}", status);
            return Err(UploadError::from_status(status.as_u16(), error_message(&body)));
        }

        let pinned: PinResponse = response
            .json()
            .await
            .map_err(|_| UploadError::InvalidResponse)?;
        let hash = pinned.ipfs_hash.ok_or(UploadError::InvalidResponse)?;

        let url = self.gateway_url(&hash);
        debug!("Image pinned at {}", url);
        Ok(url)
    }
}
