//! # API Handlers
//!
//! HTTP endpoint handlers for the Devfolio API. Handlers extract and validate
//! input, delegate to services or repositories, and wrap results in the
//! success envelope from [`types`].

use axum::{extract::State, http::StatusCode, response::Json};
use serde::Serialize;
use utoipa::ToSchema;

use crate::db;
use crate::error::{ApiError, service_unavailable};
use crate::models::ServiceInfo;
use crate::server::AppState;

pub mod auth;
pub mod extract;
pub mod onboarding;
pub mod profiles;
pub mod repos;
pub mod reviews;
pub mod stars;
pub mod types;
pub mod uploads;
pub mod users;
pub mod vouches;

/// Root handler that returns basic service information
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service information", body = ServiceInfo)
    ),
    tag = "root"
)]
pub async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo::default())
}

/// Health probe body.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthStatus {
    #[schema(example = "ok")]
    pub status: String,
    #[schema(example = "ok")]
    pub database: String,
}

/// Liveness and database connectivity
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service and database are healthy", body = HealthStatus),
        (status = 503, description = "Database unreachable", body = crate::error::ErrorEnvelope)
    ),
    tag = "root"
)]
pub async fn health(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<HealthStatus>), ApiError> {
    db::health_check(&state.db).await.map_err(|error| {
        tracing::warn!(%error, "Health check failed");
        service_unavailable("Database unreachable")
    })?;

    Ok((
        StatusCode::OK,
        Json(HealthStatus {
            status: "ok".to_string(),
            database: "ok".to_string(),
        }),
    ))
}
