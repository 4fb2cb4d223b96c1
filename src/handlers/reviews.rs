//! # AI Review API Handlers

use axum::{extract::State, response::Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::handlers::extract::ApiPath;
use crate::handlers::types::ApiResponse;
use crate::models::ai_review;
use crate::server::AppState;
use crate::services::ReviewService;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ReviewResponse {
    pub profile_id: Uuid,
    pub content: String,
    #[schema(example = "gpt-4o-mini")]
    pub model: String,
    pub generated_at: DateTime<Utc>,
}

impl From<ai_review::Model> for ReviewResponse {
    fn from(model: ai_review::Model) -> Self {
        Self {
            profile_id: model.profile_id,
            content: model.content,
            model: model.model,
            generated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

/// Get a profile's AI review
#[utoipa::path(
    get,
    path = "/api/profiles/{id}/review",
    params(("id" = Uuid, Path, description = "Profile ID")),
    responses(
        (status = 200, description = "Latest review", body = ApiResponse<ReviewResponse>),
        (status = 404, description = "Profile or review not found", body = crate::error::ErrorEnvelope)
    ),
    tag = "reviews"
)]
pub async fn get_review(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<ReviewResponse>>, ApiError> {
    let review = ReviewService::new(&state.db, state.reviewer.as_deref())
        .get(id)
        .await?;
    Ok(Json(ApiResponse::ok(review.into())))
}

/// Generate a fresh AI review
///
/// Replaces any earlier review of the profile.
#[utoipa::path(
    post,
    path = "/api/profiles/{id}/review",
    params(("id" = Uuid, Path, description = "Profile ID")),
    responses(
        (status = 200, description = "Review generated", body = ApiResponse<ReviewResponse>),
        (status = 403, description = "Not your profile", body = crate::error::ErrorEnvelope),
        (status = 404, description = "Profile not found", body = crate::error::ErrorEnvelope),
        (status = 502, description = "OpenAI request failed", body = crate::error::ErrorEnvelope),
        (status = 503, description = "AI reviews are not configured", body = crate::error::ErrorEnvelope)
    ),
    tag = "reviews"
)]
pub async fn generate_review(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<ReviewResponse>>, ApiError> {
    let review = ReviewService::new(&state.db, state.reviewer.as_deref())
        .generate(id, &actor)
        .await?;
    Ok(Json(ApiResponse::with_message(
        review.into(),
        "Review generated",
    )))
}
