//! # Avatar Uploads
//!
//! Validates raw image bodies and stores them on the image host under the
//! caller's profile id, so re-uploading overwrites the previous avatar.

use axum::http::StatusCode;
use metrics::counter;
use sea_orm::DatabaseConnection;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::clients::{ImageStore, cloudinary::AVATAR_FOLDER};
use crate::error::{ApiError, ErrorType, bad_request, not_found, service_unavailable};
use crate::models::profile;
use crate::repositories::ProfileRepository;

/// Image types accepted for avatars.
pub const ALLOWED_IMAGE_TYPES: [&str; 4] = ["image/png", "image/jpeg", "image/webp", "image/gif"];

/// Checks the declared content type and size; returns the bare MIME type.
pub fn validate_image(
    content_type: Option<&str>,
    size: usize,
    max_bytes: usize,
) -> Result<&'static str, ApiError> {
    let declared = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .unwrap_or_default();

    let Some(mime) = ALLOWED_IMAGE_TYPES.iter().copied().find(|t| *t == declared) else {
        return Err(ApiError::new(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ErrorType::UnsupportedMediaType.error_code(),
            format!(
                "Content-Type must be one of {}",
                ALLOWED_IMAGE_TYPES.join(", ")
            ),
        ));
    };

    if size == 0 {
        return Err(bad_request("Image body is required"));
    }
    if size > max_bytes {
        return Err(payload_too_large(max_bytes));
    }

    Ok(mime)
}

pub fn payload_too_large(max_bytes: usize) -> ApiError {
    ApiError::new(
        StatusCode::PAYLOAD_TOO_LARGE,
        ErrorType::PayloadTooLarge.error_code(),
        format!("Image must be at most {} bytes", max_bytes),
    )
    .with_details(serde_json::json!({ "max_bytes": max_bytes }))
}

/// Public id of a profile's avatar on the image host.
pub fn avatar_public_id(profile_id: Uuid) -> String {
    format!("{}/{}", AVATAR_FOLDER, profile_id)
}

pub struct UploadService<'a> {
    db: &'a DatabaseConnection,
    images: Option<&'a dyn ImageStore>,
    max_bytes: usize,
}

impl<'a> UploadService<'a> {
    pub fn new(
        db: &'a DatabaseConnection,
        images: Option<&'a dyn ImageStore>,
        max_bytes: usize,
    ) -> Self {
        Self {
            db,
            images,
            max_bytes,
        }
    }

    #[instrument(skip(self, bytes), fields(%user_id, size = bytes.len()))]
    pub async fn upload_avatar(
        &self,
        user_id: Uuid,
        content_type: Option<&str>,
        bytes: &[u8],
    ) -> Result<profile::Model, ApiError> {
        let mime = validate_image(content_type, bytes.len(), self.max_bytes)?;
        let profile = self.caller_profile(user_id).await?;
        let images = self.store()?;

        let image = images
            .upload(bytes, mime, AVATAR_FOLDER, &profile.id.to_string())
            .await?;

        let updated = ProfileRepository::new(self.db)
            .set_avatar_url(profile.id, Some(image.secure_url))
            .await?;

        counter!("avatar_uploads_total").increment(1);
        info!(profile_id = %profile.id, public_id = %image.public_id, "Avatar uploaded");
        Ok(updated)
    }

    pub async fn remove_avatar(&self, user_id: Uuid) -> Result<profile::Model, ApiError> {
        let profile = self.caller_profile(user_id).await?;
        let images = self.store()?;

        images.destroy(&avatar_public_id(profile.id)).await?;
        let updated = ProfileRepository::new(self.db)
            .set_avatar_url(profile.id, None)
            .await?;

        info!(profile_id = %profile.id, "Avatar removed");
        Ok(updated)
    }

    async fn caller_profile(&self, user_id: Uuid) -> Result<profile::Model, ApiError> {
        ProfileRepository::new(self.db)
            .find_by_user_id(user_id)
            .await?
            .ok_or_else(|| not_found("Create a profile before uploading an avatar"))
    }

    fn store(&self) -> Result<&'a dyn ImageStore, ApiError> {
        self.images
            .ok_or_else(|| service_unavailable("Image uploads are not configured"))
    }
}
