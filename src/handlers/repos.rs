//! # Repo API Handlers
//!
//! Synced GitHub repositories and the sync trigger.

use axum::{extract::State, response::Json};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::CurrentUser;
use crate::error::ApiError;
use crate::handlers::extract::{ApiPath, ApiQuery};
use crate::handlers::types::{ApiResponse, PaginatedResponse, PaginationQuery};
use crate::models::repo;
use crate::repositories::{ProfileRepository, RepoFilter, RepoRepository};
use crate::server::AppState;
use crate::services::{SyncService, SyncSummary, ensure_can_edit};

/// A synced repository as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RepoResponse {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub github_id: i64,
    pub name: String,
    #[schema(example = "ada/analytical-engine")]
    pub full_name: String,
    pub description: Option<String>,
    pub html_url: String,
    pub primary_language: Option<String>,
    /// Language name to bytes of code
    #[schema(value_type = Object)]
    pub languages: serde_json::Value,
    pub stars: i32,
    pub forks: i32,
    pub pushed_at: Option<DateTime<Utc>>,
}

impl From<repo::Model> for RepoResponse {
    fn from(model: repo::Model) -> Self {
        Self {
            id: model.id,
            profile_id: model.profile_id,
            github_id: model.github_id,
            name: model.name,
            full_name: model.full_name,
            description: model.description,
            html_url: model.html_url,
            primary_language: model.primary_language,
            languages: model.languages,
            stars: model.stars,
            forks: model.forks,
            pushed_at: model.pushed_at.map(|t| t.with_timezone(&Utc)),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListReposQuery {
    pub profile_id: Option<Uuid>,
    /// Primary language, case-insensitive
    #[param(example = "Rust")]
    pub language: Option<String>,
    #[param(minimum = 1)]
    pub page: Option<u64>,
    #[param(minimum = 1, maximum = 100)]
    pub limit: Option<u64>,
}

/// Sync a profile's repositories from GitHub
#[utoipa::path(
    post,
    path = "/api/profiles/{id}/sync",
    params(("id" = Uuid, Path, description = "Profile ID")),
    responses(
        (status = 200, description = "Repositories replaced", body = ApiResponse<SyncSummary>),
        (status = 400, description = "Profile has no GitHub username", body = crate::error::ErrorEnvelope),
        (status = 403, description = "Not your profile", body = crate::error::ErrorEnvelope),
        (status = 404, description = "Profile or GitHub user not found", body = crate::error::ErrorEnvelope),
        (status = 502, description = "GitHub request failed", body = crate::error::ErrorEnvelope)
    ),
    tag = "repos"
)]
pub async fn sync_profile(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<SyncSummary>>, ApiError> {
    let profile = ProfileRepository::new(&state.db).get(id).await?;
    ensure_can_edit(&actor, &profile)?;

    let summary = SyncService::new(
        &state.db,
        state.github.as_ref(),
        state.config.github.max_repos,
    )
    .sync_profile(id)
    .await?;

    let message = format!("Synced {} repositories", summary.repo_count);
    Ok(Json(ApiResponse::with_message(summary, message)))
}

/// List a profile's repositories
#[utoipa::path(
    get,
    path = "/api/profiles/{id}/repos",
    params(("id" = Uuid, Path, description = "Profile ID")),
    responses(
        (status = 200, description = "Repositories, most starred first", body = ApiResponse<Vec<RepoResponse>>),
        (status = 404, description = "Profile not found", body = crate::error::ErrorEnvelope)
    ),
    tag = "repos"
)]
pub async fn list_profile_repos(
    State(state): State<AppState>,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<Vec<RepoResponse>>>, ApiError> {
    ProfileRepository::new(&state.db).get(id).await?;
    let repos = RepoRepository::new(&state.db).list_for_profile(id).await?;
    Ok(Json(ApiResponse::ok(
        repos.into_iter().map(RepoResponse::from).collect(),
    )))
}

/// Search repositories
#[utoipa::path(
    get,
    path = "/api/repos",
    params(ListReposQuery),
    responses(
        (status = 200, description = "Repositories, most starred first", body = PaginatedResponse<RepoResponse>),
        (status = 400, description = "Invalid pagination", body = crate::error::ErrorEnvelope)
    ),
    tag = "repos"
)]
pub async fn list_repos(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ListReposQuery>,
) -> Result<Json<PaginatedResponse<RepoResponse>>, ApiError> {
    let page = PaginationQuery {
        page: query.page,
        limit: query.limit,
    }
    .into_request()?;
    let filter = RepoFilter {
        profile_id: query.profile_id,
        language: query.language,
    };

    let repos = RepoRepository::new(&state.db).search(&filter, page).await?;
    Ok(Json(PaginatedResponse::from_page(repos.map(RepoResponse::from))))
}
