//! # Upload API Handlers
//!
//! Avatar images are sent as the raw request body with their `Content-Type`.

use axum::{
    body::Bytes,
    extract::{State, rejection::BytesRejection},
    http::{HeaderMap, StatusCode, header::CONTENT_TYPE},
    response::Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::{ApiError, bad_request};
use crate::handlers::types::ApiResponse;
use crate::models::profile;
use crate::server::AppState;
use crate::services::{UploadService, upload::payload_too_large};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AvatarResponse {
    pub profile_id: Uuid,
    pub avatar_url: Option<String>,
}

impl From<profile::Model> for AvatarResponse {
    fn from(model: profile::Model) -> Self {
        Self {
            profile_id: model.id,
            avatar_url: model.avatar_url,
        }
    }
}

fn upload_service(state: &AppState) -> UploadService<'_> {
    UploadService::new(&state.db, state.images.as_deref(), state.config.upload_max_bytes)
}

/// Upload your avatar
#[utoipa::path(
    post,
    path = "/api/uploads/avatar",
    request_body(content = Vec<u8>, content_type = "image/png", description = "Raw PNG, JPEG, WebP or GIF bytes"),
    responses(
        (status = 200, description = "Avatar stored", body = ApiResponse<AvatarResponse>),
        (status = 400, description = "Empty body", body = crate::error::ErrorEnvelope),
        (status = 401, description = "Not signed in", body = crate::error::ErrorEnvelope),
        (status = 404, description = "No profile yet", body = crate::error::ErrorEnvelope),
        (status = 413, description = "Image too large", body = crate::error::ErrorEnvelope),
        (status = 415, description = "Unsupported image type", body = crate::error::ErrorEnvelope),
        (status = 503, description = "Uploads are not configured", body = crate::error::ErrorEnvelope)
    ),
    tag = "uploads"
)]
pub async fn upload_avatar(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> Result<Json<ApiResponse<AvatarResponse>>, ApiError> {
    // Bodies over the route limit never reach the service
    let body = body.map_err(|rejection| {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            payload_too_large(state.config.upload_max_bytes)
        } else {
            bad_request(rejection.body_text())
        }
    })?;
    let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());

    let profile = upload_service(&state)
        .upload_avatar(actor.user_id, content_type, &body)
        .await?;
    Ok(Json(ApiResponse::with_message(
        profile.into(),
        "Avatar uploaded",
    )))
}

/// Remove your avatar
#[utoipa::path(
    delete,
    path = "/api/uploads/avatar",
    responses(
        (status = 200, description = "Avatar removed", body = ApiResponse<AvatarResponse>),
        (status = 401, description = "Not signed in", body = crate::error::ErrorEnvelope),
        (status = 404, description = "No profile yet", body = crate::error::ErrorEnvelope),
        (status = 503, description = "Uploads are not configured", body = crate::error::ErrorEnvelope)
    ),
    tag = "uploads"
)]
pub async fn remove_avatar(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
) -> Result<Json<ApiResponse<AvatarResponse>>, ApiError> {
    let profile = upload_service(&state).remove_avatar(actor.user_id).await?;
    Ok(Json(ApiResponse::with_message(
        profile.into(),
        "Avatar removed",
    )))
}
