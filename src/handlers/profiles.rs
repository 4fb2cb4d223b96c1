//! # Profile API Handlers
//!
//! The public profile directory plus owner-only create, update and delete.

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::handlers::extract::{ApiJson, ApiPath, ApiQuery};
use crate::handlers::types::{ApiResponse, PaginatedResponse, PaginationQuery};
use crate::repositories::ProfileFilter;
use crate::server::AppState;
use crate::services::{CreateProfileRequest, ProfileDetails, ProfileService, UpdateProfileRequest};

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListProfilesQuery {
    /// Substring of the username, display name or bio
    #[param(example = "rust")]
    pub search: Option<String>,
    /// Exact skill, case-insensitive
    #[param(example = "Rust")]
    pub skill: Option<String>,
    #[param(minimum = 1)]
    pub page: Option<u64>,
    #[param(minimum = 1, maximum = 100)]
    pub limit: Option<u64>,
}

/// List profiles
#[utoipa::path(
    get,
    path = "/api/profiles",
    params(ListProfilesQuery),
    responses(
        (status = 200, description = "Profiles, newest first", body = PaginatedResponse<ProfileDetails>),
        (status = 400, description = "Invalid pagination", body = crate::error::ErrorEnvelope)
    ),
    tag = "profiles"
)]
pub async fn list_profiles(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListProfilesQuery>,
) -> Result<Json<PaginatedResponse<ProfileDetails>>, ApiError> {
    let page = PaginationQuery {
        page: query.page,
        limit: query.limit,
    }
    .into_request()?;
    let filter = ProfileFilter {
        search: query.search,
        skill: query.skill,
    };

    let profiles = ProfileService::new(&state.db).list(&filter, page).await?;
    Ok(Json(PaginatedResponse::from_page(profiles)))
}

/// Create your profile
#[utoipa::path(
    post,
    path = "/api/profiles",
    request_body = CreateProfileRequest,
    responses(
        (status = 201, description = "Profile created", body = ApiResponse<ProfileDetails>),
        (status = 400, description = "Validation failed", body = crate::error::ErrorEnvelope),
        (status = 401, description = "Not signed in", body = crate::error::ErrorEnvelope),
        (status = 409, description = "Profile exists or username taken", body = crate::error::ErrorEnvelope)
    ),
    tag = "profiles"
)]
pub async fn create_profile(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiJson(request): ApiJson<CreateProfileRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ProfileDetails>>), ApiError> {
    let profile = ProfileService::new(&state.db)
        .create(actor.user_id, request)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(profile, "Profile created")),
    ))
}

/// Get a profile by ID
#[utoipa::path(
    get,
    path = "/api/profiles/{id}",
    params(("id" = Uuid, Path, description = "Profile ID")),
    responses(
        (status = 200, description = "Profile found", body = ApiResponse<ProfileDetails>),
        (status = 404, description = "Profile not found", body = crate::error::ErrorEnvelope)
    ),
    tag = "profiles"
)]
pub async fn get_profile(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<ProfileDetails>>, ApiError> {
    let profile = ProfileService::new(&state.db).get(id).await?;
    Ok(Json(ApiResponse::ok(profile)))
}

/// Get a profile by username
#[utoipa::path(
    get,
    path = "/api/profiles/by-username/{username}",
    params(("username" = String, Path, description = "Profile username")),
    responses(
        (status = 200, description = "Profile found", body = ApiResponse<ProfileDetails>),
        (status = 404, description = "Profile not found", body = crate::error::ErrorEnvelope)
    ),
    tag = "profiles"
)]
pub async fn get_profile_by_username(
    State(state): State<AppState>,
    ApiPath(username): ApiPath<String>,
) -> Result<Json<ApiResponse<ProfileDetails>>, ApiError> {
    let profile = ProfileService::new(&state.db)
        .get_by_username(&username.trim().to_lowercase())
        .await?;
    Ok(Json(ApiResponse::ok(profile)))
}

/// Update a profile
#[utoipa::path(
    put,
    path = "/api/profiles/{id}",
    params(("id" = Uuid, Path, description = "Profile ID")),
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = ApiResponse<ProfileDetails>),
        (status = 400, description = "Validation failed", body = crate::error::ErrorEnvelope),
        (status = 403, description = "Not your profile", body = crate::error::ErrorEnvelope),
        (status = 404, description = "Profile not found", body = crate::error::ErrorEnvelope),
        (status = 409, description = "Username taken", body = crate::error::ErrorEnvelope)
    ),
    tag = "profiles"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<UpdateProfileRequest>,
) -> Result<Json<ApiResponse<ProfileDetails>>, ApiError> {
    let profile = ProfileService::new(&state.db)
        .update(id, &actor, request)
        .await?;
    Ok(Json(ApiResponse::with_message(profile, "Profile updated")))
}

/// Delete a profile
#[utoipa::path(
    delete,
    path = "/api/profiles/{id}",
    params(("id" = Uuid, Path, description = "Profile ID")),
    responses(
        (status = 200, description = "Profile deleted", body = ApiResponse<bool>),
        (status = 403, description = "Not your profile", body = crate::error::ErrorEnvelope),
        (status = 404, description = "Profile not found", body = crate::error::ErrorEnvelope)
    ),
    tag = "profiles"
)]
pub async fn delete_profile(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<bool>>, ApiError> {
    ProfileService::new(&state.db).delete(id, &actor).await?;
    Ok(Json(ApiResponse::with_message(true, "Profile deleted")))
}
