//! # User API Handlers
//!
//! Account management. Users read and edit their own account; administrators
//! may list and manage everyone.

use axum::{
    extract::State,
    http::header::SET_COOKIE,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::{AdminUser, CurrentUser, SessionClaims};
use crate::error::{ApiError, forbidden};
use crate::handlers::extract::{ApiJson, ApiPath, ApiQuery};
use crate::handlers::types::{ApiResponse, PaginatedResponse, PaginationQuery};
use crate::models::user;
use crate::repositories::{UserChanges, UserRepository};
use crate::server::AppState;
use crate::services::profile::double_option;
use crate::validation::{validate_display_name, validate_url};

/// A user account as returned by the API. The Google subject is never exposed.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    #[schema(example = "ada@example.com")]
    pub email: String,
    #[schema(example = "Ada Lovelace")]
    pub name: String,
    pub avatar_url: Option<String>,
    #[schema(example = "user")]
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(model: user::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            name: model.name,
            avatar_url: model.avatar_url,
            role: model.role,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListUsersQuery {
    /// Substring of the name or email
    pub search: Option<String>,
    #[param(minimum = 1)]
    pub page: Option<u64>,
    #[param(minimum = 1, maximum = 100)]
    pub limit: Option<u64>,
}

/// Body of `PUT /api/users/{id}`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    /// `null` clears the avatar
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub avatar_url: Option<Option<String>>,
}

impl UpdateUserRequest {
    fn validate(self) -> Result<UserChanges, ApiError> {
        let name = self
            .name
            .map(|n| validate_display_name(&n).map_err(|e| e.renamed("name")))
            .transpose()?;
        let avatar_url = match self.avatar_url {
            Some(Some(url)) if !url.trim().is_empty() => Some(Some(validate_url("avatar_url", &url)?)),
            Some(_) => Some(None),
            None => None,
        };
        Ok(UserChanges { name, avatar_url })
    }
}

fn ensure_self_or_admin(actor: &SessionClaims, user_id: Uuid) -> Result<(), ApiError> {
    if actor.can_act_for(user_id) {
        Ok(())
    } else {
        Err(forbidden(Some("You can only manage your own account")))
    }
}

/// List users
#[utoipa::path(
    get,
    path = "/api/users",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "Users, newest first", body = PaginatedResponse<UserResponse>),
        (status = 401, description = "Not signed in", body = crate::error::ErrorEnvelope),
        (status = 403, description = "Administrator access required", body = crate::error::ErrorEnvelope)
    ),
    tag = "users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    ApiQuery(query): ApiQuery<ListUsersQuery>,
) -> Result<Json<PaginatedResponse<UserResponse>>, ApiError> {
    let page = PaginationQuery {
        page: query.page,
        limit: query.limit,
    }
    .into_request()?;

    let users = UserRepository::new(&state.db)
        .list(query.search.as_deref(), page)
        .await?;

    Ok(Json(PaginatedResponse::from_page(users.map(UserResponse::from))))
}

/// Get a user
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User found", body = ApiResponse<UserResponse>),
        (status = 403, description = "Not your account", body = crate::error::ErrorEnvelope),
        (status = 404, description = "User not found", body = crate::error::ErrorEnvelope)
    ),
    tag = "users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    ensure_self_or_admin(&actor, id)?;
    let user = UserRepository::new(&state.db).get(id).await?;
    Ok(Json(ApiResponse::ok(user.into())))
}

/// Update a user
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "User updated", body = ApiResponse<UserResponse>),
        (status = 400, description = "Validation failed", body = crate::error::ErrorEnvelope),
        (status = 403, description = "Not your account", body = crate::error::ErrorEnvelope),
        (status = 404, description = "User not found", body = crate::error::ErrorEnvelope)
    ),
    tag = "users"
)]
pub async fn update_user(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiError> {
    ensure_self_or_admin(&actor, id)?;
    let changes = request.validate()?;
    let user = UserRepository::new(&state.db).update(id, changes).await?;
    Ok(Json(ApiResponse::with_message(user.into(), "User updated")))
}

/// Delete a user
///
/// Deleting your own account also signs you out.
#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = Uuid, Path, description = "User ID")),
    responses(
        (status = 200, description = "User deleted", body = ApiResponse<bool>),
        (status = 403, description = "Not your account", body = crate::error::ErrorEnvelope),
        (status = 404, description = "User not found", body = crate::error::ErrorEnvelope)
    ),
    tag = "users"
)]
pub async fn delete_user(
    State(state): State<AppState>,
    CurrentUser(actor): CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> Result<Response, ApiError> {
    ensure_self_or_admin(&actor, id)?;
    UserRepository::new(&state.db).delete(id).await?;
    info!(user_id = %id, deleted_by = %actor.user_id, "User deleted");

    let body = Json(ApiResponse::with_message(true, "User deleted"));
    if actor.user_id == id {
        let cookie = state.sealer.clear_cookie()?;
        return Ok(([(SET_COOKIE, cookie)], body).into_response());
    }
    Ok(body.into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_distinguishes_null_from_absent() {
        let absent: UpdateUserRequest = serde_json::from_str(r#"{"name":"Ada"}"#).unwrap();
        let changes = absent.validate().unwrap();
        assert_eq!(changes.name.as_deref(), Some("Ada"));
        assert!(changes.avatar_url.is_none());

        let cleared: UpdateUserRequest = serde_json::from_str(r#"{"avatar_url":null}"#).unwrap();
        assert_eq!(cleared.validate().unwrap().avatar_url, Some(None));
    }

    #[test]
    fn test_update_request_rejects_bad_avatar() {
        let request: UpdateUserRequest =
            serde_json::from_str(r#"{"avatar_url":"ftp://example.com/a.png"}"#).unwrap();
        let error = request.validate().unwrap_err();
        assert_eq!(error.status, axum::http::StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_blank_name_is_reported_as_name() {
        let request: UpdateUserRequest = serde_json::from_str(r#"{"name":"  "}"#).unwrap();
        let error = request.validate().unwrap_err();
        assert_eq!(error.details.as_deref().unwrap()["name"], "is required");
    }
}
