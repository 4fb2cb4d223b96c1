//! # Onboarding API Handlers

use axum::{extract::State, response::Json};

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::handlers::extract::ApiJson;
use crate::handlers::types::ApiResponse;
use crate::server::AppState;
use crate::services::{OnboardingOutcome, OnboardingRequest, OnboardingService, OnboardingStatus};

fn onboarding_service(state: &AppState) -> OnboardingService<'_> {
    OnboardingService::new(
        &state.db,
        state.github.as_ref(),
        state.config.github.max_repos,
    )
}

/// Your onboarding progress
#[utoipa::path(
    get,
    path = "/api/onboarding",
    responses(
        (status = 200, description = "Wizard status and next step", body = ApiResponse<OnboardingStatus>),
        (status = 401, description = "Not signed in", body = crate::error::ErrorEnvelope)
    ),
    tag = "onboarding"
)]
pub async fn onboarding_status(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
) -> Result<Json<ApiResponse<OnboardingStatus>>, ApiError> {
    let status = onboarding_service(&state).status(actor.user_id).await?;
    Ok(Json(ApiResponse::ok(status)))
}

/// Complete onboarding
///
/// Creates or updates your profile, fills blanks from GitHub and runs a first
/// sync. A failed sync does not fail the request; see `sync_error`.
#[utoipa::path(
    post,
    path = "/api/onboarding",
    request_body = OnboardingRequest,
    responses(
        (status = 200, description = "Profile ready", body = ApiResponse<OnboardingOutcome>),
        (status = 400, description = "Validation failed", body = crate::error::ErrorEnvelope),
        (status = 401, description = "Not signed in", body = crate::error::ErrorEnvelope),
        (status = 404, description = "GitHub user not found", body = crate::error::ErrorEnvelope),
        (status = 409, description = "Username taken", body = crate::error::ErrorEnvelope)
    ),
    tag = "onboarding"
)]
pub async fn complete_onboarding(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiJson(request): ApiJson<OnboardingRequest>,
) -> Result<Json<ApiResponse<OnboardingOutcome>>, ApiError> {
    let outcome = onboarding_service(&state).complete(&actor, request).await?;
    Ok(Json(ApiResponse::with_message(outcome, "Onboarding complete")))
}
