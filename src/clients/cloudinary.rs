//! Cloudinary signed uploads for profile avatars.

use async_trait::async_trait;
use base64::Engine;
use chrono::Utc;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::{UpstreamError, status_error};
use crate::config::CloudinaryConfig;

const PROVIDER: &str = "cloudinary";

/// Folder every avatar is uploaded into.
pub const AVATAR_FOLDER: &str = "devfolio/avatars";

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UploadedImage {
    pub secure_url: String,
    pub public_id: String,
}

/// Image hosting used by the avatar pipeline.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Uploads `bytes` as `{folder}/{public_id}`, replacing any existing image.
    async fn upload(
        &self,
        bytes: &[u8],
        content_type: &str,
        folder: &str,
        public_id: &str,
    ) -> Result<UploadedImage, UpstreamError>;

    /// Deletes an image by its full public id; a missing image is not an error.
    async fn destroy(&self, public_id: &str) -> Result<(), UpstreamError>;
}

#[derive(Debug, Deserialize)]
struct DestroyResponse {
    result: String,
}

/// reqwest-backed [`ImageStore`] for the Cloudinary upload API.
#[derive(Clone)]
pub struct CloudinaryClient {
    http: reqwest::Client,
    api_base: String,
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

impl CloudinaryClient {
    /// Returns `None` unless cloud name, key and secret are all set.
    pub fn from_config(http: reqwest::Client, config: &CloudinaryConfig) -> Option<Self> {
        Some(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            cloud_name: config.cloud_name.clone()?,
            api_key: config.api_key.clone()?,
            api_secret: config.api_secret.clone()?,
        })
    }

    fn endpoint(&self, action: &str) -> String {
        format!(
            "{}/v1_1/{}/image/{}",
            self.api_base, self.cloud_name, action
        )
    }

    /// Appends `api_key`, `signature` and `signature_algorithm` to the signed params.
    fn signed_form(&self, mut params: Vec<(&'static str, String)>) -> Vec<(&'static str, String)> {
        let signature = sign_params(&params, &self.api_secret);
        params.push(("api_key", self.api_key.clone()));
        params.push(("signature", signature));
        params.push(("signature_algorithm", "sha256".to_string()));
        params
    }
}

/// SHA-256 request signature: params sorted by name, joined as `k=v&k=v`,
/// followed directly by the API secret.
pub fn sign_params(params: &[(&str, String)], api_secret: &str) -> String {
    let mut sorted: Vec<_> = params.iter().collect();
    sorted.sort_by(|a, b| a.0.cmp(b.0));

    let joined = sorted
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&");

    let mut hasher = Sha256::new();
    hasher.update(joined.as_bytes());
    hasher.update(api_secret.as_bytes());
    hex::encode(hasher.finalize())
}

#[async_trait]
impl ImageStore for CloudinaryClient {
    async fn upload(
        &self,
        bytes: &[u8],
        content_type: &str,
        folder: &str,
        public_id: &str,
    ) -> Result<UploadedImage, UpstreamError> {
        let timestamp = Utc::now().timestamp().to_string();
        let mut form = self.signed_form(vec![
            ("folder", folder.to_string()),
            ("overwrite", "true".to_string()),
            ("public_id", public_id.to_string()),
            ("timestamp", timestamp),
        ]);
        form.push((
            "file",
            format!(
                "data:{};base64,{}",
                content_type,
                base64::engine::general_purpose::STANDARD.encode(bytes)
            ),
        ));

        debug!(folder, public_id, size = bytes.len(), "Uploading image");
        let response = self
            .http
            .post(self.endpoint("upload"))
            .form(&form)
            .send()
            .await
            .map_err(UpstreamError::network(PROVIDER))?;

        if !response.status().is_success() {
            return Err(status_error(PROVIDER, response).await);
        }

        response
            .json::<UploadedImage>()
            .await
            .map_err(UpstreamError::decode(PROVIDER))
    }

    async fn destroy(&self, public_id: &str) -> Result<(), UpstreamError> {
        let form = self.signed_form(vec![
            ("invalidate", "true".to_string()),
            ("public_id", public_id.to_string()),
            ("timestamp", Utc::now().timestamp().to_string()),
        ]);

        let response = self
            .http
            .post(self.endpoint("destroy"))
            .form(&form)
            .send()
            .await
            .map_err(UpstreamError::network(PROVIDER))?;

        if !response.status().is_success() {
            return Err(status_error(PROVIDER, response).await);
        }

        let body = response
            .json::<DestroyResponse>()
            .await
            .map_err(UpstreamError::decode(PROVIDER))?;

        match body.result.as_str() {
            "ok" | "not found" => Ok(()),
            other => Err(UpstreamError::Decode {
                provider: PROVIDER,
                message: format!("unexpected destroy result: {}", other),
            }),
        }
    }
}
