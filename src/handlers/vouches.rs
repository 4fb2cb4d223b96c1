//! # Vouch API Handlers

use axum::{extract::State, http::StatusCode, response::Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::handlers::extract::{ApiJson, ApiPath, ApiQuery};
use crate::handlers::types::{ApiResponse, PaginatedResponse, PaginationQuery};
use crate::models::{user, vouch};
use crate::repositories::UserRepository;
use crate::server::AppState;
use crate::services::{VouchQuota, VouchService};
use crate::validation::validate_vouch_message;

/// Body of `POST /api/profiles/{id}/vouches`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct VouchRequest {
    #[schema(example = "Shipped a great parser with me")]
    pub message: Option<String>,
}

/// Public identity of whoever gave a vouch.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VoucherSummary {
    pub id: Uuid,
    pub name: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VouchResponse {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub voucher_id: Uuid,
    pub message: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Absent only when the voucher row vanished mid-read
    pub voucher: Option<VoucherSummary>,
}

impl VouchResponse {
    fn new(vouch: vouch::Model, voucher: Option<user::Model>) -> Self {
        Self {
            id: vouch.id,
            profile_id: vouch.profile_id,
            voucher_id: vouch.voucher_id,
            message: vouch.message,
            created_at: vouch.created_at.with_timezone(&Utc),
            voucher: voucher.map(|u| VoucherSummary {
                id: u.id,
                name: u.name,
                avatar_url: u.avatar_url,
            }),
        }
    }
}

/// Vouch for a profile
#[utoipa::path(
    post,
    path = "/api/profiles/{id}/vouches",
    params(("id" = Uuid, Path, description = "Profile ID")),
    request_body = VouchRequest,
    responses(
        (status = 201, description = "Vouch recorded", body = ApiResponse<VouchResponse>),
        (status = 400, description = "Self-vouch or invalid message", body = crate::error::ErrorEnvelope),
        (status = 401, description = "Not signed in", body = crate::error::ErrorEnvelope),
        (status = 404, description = "Profile not found", body = crate::error::ErrorEnvelope),
        (status = 409, description = "Already vouched", body = crate::error::ErrorEnvelope),
        (status = 429, description = "Daily limit reached", body = crate::error::ErrorEnvelope)
    ),
    tag = "vouches"
)]
pub async fn create_vouch(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiPath(profile_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<VouchRequest>,
) -> Result<(StatusCode, Json<ApiResponse<VouchResponse>>), ApiError> {
    let message = validate_vouch_message(request.message.as_deref())?;

    let created = VouchService::new(&state.db, state.config.vouch.daily_limit)
        .vouch(profile_id, actor.user_id, message)
        .await?;
    let voucher = UserRepository::new(&state.db)
        .find_by_id(actor.user_id)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            VouchResponse::new(created, voucher),
            "Vouch recorded",
        )),
    ))
}

/// Withdraw your vouch
#[utoipa::path(
    delete,
    path = "/api/profiles/{id}/vouches",
    params(("id" = Uuid, Path, description = "Profile ID")),
    responses(
        (status = 200, description = "Vouch withdrawn", body = ApiResponse<bool>),
        (status = 401, description = "Not signed in", body = crate::error::ErrorEnvelope),
        (status = 404, description = "Profile or vouch not found", body = crate::error::ErrorEnvelope),
        (status = 429, description = "Daily limit reached", body = crate::error::ErrorEnvelope)
    ),
    tag = "vouches"
)]
pub async fn delete_vouch(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiPath(profile_id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<bool>>, ApiError> {
    VouchService::new(&state.db, state.config.vouch.daily_limit)
        .unvouch(profile_id, actor.user_id)
        .await?;
    Ok(Json(ApiResponse::with_message(true, "Vouch withdrawn")))
}

/// List vouches received by a profile
#[utoipa::path(
    get,
    path = "/api/profiles/{id}/vouches",
    params(("id" = Uuid, Path, description = "Profile ID"), PaginationQuery),
    responses(
        (status = 200, description = "Vouches, newest first", body = PaginatedResponse<VouchResponse>),
        (status = 404, description = "Profile not found", body = crate::error::ErrorEnvelope)
    ),
    tag = "vouches"
)]
pub async fn list_vouches(
    State(state): State<AppState>,
    ApiPath(profile_id): ApiPath<Uuid>,
    ApiQuery(pagination): ApiQuery<PaginationQuery>,
) -> Result<Json<PaginatedResponse<VouchResponse>>, ApiError> {
    let page = pagination.into_request()?;
    let vouches = VouchService::new(&state.db, state.config.vouch.daily_limit)
        .list(profile_id, page)
        .await?;

    Ok(Json(PaginatedResponse::from_page(
        vouches.map(|(vouch, voucher)| VouchResponse::new(vouch, voucher)),
    )))
}

/// Your vouch allowance for today
#[utoipa::path(
    get,
    path = "/api/vouches/quota",
    responses(
        (status = 200, description = "Remaining vouch actions today", body = ApiResponse<VouchQuota>),
        (status = 401, description = "Not signed in", body = crate::error::ErrorEnvelope)
    ),
    tag = "vouches"
)]
pub async fn vouch_quota(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
) -> Result<Json<ApiResponse<VouchQuota>>, ApiError> {
    let quota = VouchService::new(&state.db, state.config.vouch.daily_limit)
        .quota(actor.user_id)
        .await?;
    Ok(Json(ApiResponse::ok(quota)))
}
