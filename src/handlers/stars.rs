//! # Star API Handlers
//!
//! Anonymous stars keyed on the caller's IP address.

use axum::{extract::State, response::Json};
use uuid::Uuid;

use crate::auth::ClientIp;
use crate::error::ApiError;
use crate::handlers::extract::ApiPath;
use crate::handlers::types::ApiResponse;
use crate::server::AppState;
use crate::services::{StarService, StarStatus};

/// Star count and whether you have starred
#[utoipa::path(
    get,
    path = "/api/profiles/{id}/stars",
    params(("id" = Uuid, Path, description = "Profile ID")),
    responses(
        (status = 200, description = "Star status", body = ApiResponse<StarStatus>),
        (status = 404, description = "Profile not found", body = crate::error::ErrorEnvelope)
    ),
    tag = "stars"
)]
pub async fn star_status(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<StarStatus>>, ApiError> {
    let status = StarService::new(&state.db, &state.star_salt)
        .status(id, &ip)
        .await?;
    Ok(Json(ApiResponse::ok(status)))
}

/// Star a profile
///
/// Starring twice from the same address is a no-op.
#[utoipa::path(
    post,
    path = "/api/profiles/{id}/stars",
    params(("id" = Uuid, Path, description = "Profile ID")),
    responses(
        (status = 200, description = "Starred", body = ApiResponse<StarStatus>),
        (status = 404, description = "Profile not found", body = crate::error::ErrorEnvelope)
    ),
    tag = "stars"
)]
pub async fn star_profile(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<StarStatus>>, ApiError> {
    let status = StarService::new(&state.db, &state.star_salt)
        .star(id, &ip)
        .await?;
    Ok(Json(ApiResponse::ok(status)))
}

/// Remove your star
#[utoipa::path(
    delete,
    path = "/api/profiles/{id}/stars",
    params(("id" = Uuid, Path, description = "Profile ID")),
    responses(
        (status = 200, description = "Unstarred", body = ApiResponse<StarStatus>),
        (status = 404, description = "Profile not found", body = crate::error::ErrorEnvelope)
    ),
    tag = "stars"
)]
pub async fn unstar_profile(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<StarStatus>>, ApiError> {
    let status = StarService::new(&state.db, &state.star_salt)
        .unstar(id, &ip)
        .await?;
    Ok(Json(ApiResponse::ok(status)))
}
