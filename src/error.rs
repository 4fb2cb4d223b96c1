//! # Error Handling
//!
//! Unified error handling for the Devfolio API. Every failure leaves the
//! service as the JSON envelope
//! `{success: false, error, message, details?, trace_id, timestamp}`.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use utoipa::ToSchema;

use crate::telemetry;

/// Unified API error
#[derive(Debug, Clone, Serialize)]
pub struct ApiError {
    /// HTTP status code for the response
    #[serde(skip_serializing, skip_deserializing)]
    pub status: StatusCode,
    /// Error code for programmatic handling
    pub code: Box<str>,
    /// Human-readable error message
    pub message: Box<str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Box<serde_json::Value>>,
    /// Suggested retry delay in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
    /// Correlation trace ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<Box<str>>,
}

/// Wire shape of an error response.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorEnvelope {
    /// Always `false`
    pub success: bool,
    /// Machine-readable error code
    #[schema(example = "NOT_FOUND")]
    pub error: String,
    #[schema(example = "Profile not found")]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ApiError {
    /// Create a new API error with the given status code, code and message
    pub fn new(status: StatusCode, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status,
            code: code.into().into_boxed_str(),
            message: message.into().into_boxed_str(),
            details: None,
            retry_after: None,
            trace_id: Self::current_trace_id(),
        }
    }

    /// Add details to the error
    pub fn with_details<V: Into<serde_json::Value>>(mut self, details: V) -> Self {
        self.details = Some(Box::new(details.into()));
        self
    }

    /// Set retry after delay
    pub fn with_retry_after(mut self, seconds: u64) -> Self {
        self.retry_after = Some(seconds);
        self
    }

    /// Maps a free-form error message to a status by inspecting its wording.
    ///
    /// "not found" → 404; "already exists", "unique" or "duplicate" → 409;
    /// "invalid", "required", "must be" or "validation" → 400; anything else → 500.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lowered = message.to_lowercase();

        let error_type = if lowered.contains("not found") {
            ErrorType::NotFound
        } else if ["already exists", "unique", "duplicate"]
            .iter()
            .any(|needle| lowered.contains(needle))
        {
            ErrorType::Conflict
        } else if ["invalid", "required", "must be", "validation"]
            .iter()
            .any(|needle| lowered.contains(needle))
        {
            ErrorType::BadRequest
        } else {
            ErrorType::InternalServerError
        };

        if error_type == ErrorType::InternalServerError {
            tracing::error!(%message, "Unclassified error");
            return error_type.into();
        }

        Self::new(error_type.status_code(), error_type.error_code(), message)
    }

    /// Converts the error into its wire envelope.
    pub fn envelope(&self) -> ErrorEnvelope {
        ErrorEnvelope {
            success: false,
            error: self.code.to_string(),
            message: self.message.to_string(),
            details: self.details.as_deref().cloned(),
            trace_id: self.trace_id.as_deref().map(str::to_string),
            timestamp: Utc::now(),
        }
    }

    fn current_trace_id() -> Option<Box<str>> {
        telemetry::current_trace_id()
            .map(|trace_id| trace_id.into_boxed_str())
            .or_else(|| {
                Some(format!("corr-{}", &uuid::Uuid::new_v4().simple().to_string()[..8]).into_boxed_str())
            })
    }
}

/// Returns true when `error` is a unique-constraint violation on Postgres or SQLite.
pub fn is_unique_violation(error: &sea_orm::DbErr) -> bool {
    use sea_orm::RuntimeErr;

    const PG_UNIQUE: &str = "23505";
    const SQLITE_DUPLICATE_CODES: &[&str] = &["1555", "2067"];

    let runtime_err = match error {
        sea_orm::DbErr::Query(RuntimeErr::SqlxError(sqlx_err))
        | sea_orm::DbErr::Exec(RuntimeErr::SqlxError(sqlx_err)) => sqlx_err,
        _ => return false,
    };

    let Some(db_error) = runtime_err.as_database_error() else {
        return false;
    };

    if db_error.is_unique_violation() {
        return true;
    }

    db_error
        .code()
        .is_some_and(|code| code == PG_UNIQUE || SQLITE_DUPLICATE_CODES.contains(&&*code))
}

/// Start of the UTC day after `now`.
pub fn next_utc_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    (now.date_naive() + Duration::days(1))
        .and_time(NaiveTime::MIN)
        .and_utc()
}

/// Seconds from `now` until the next UTC midnight (always at least 1).
pub fn seconds_until_utc_midnight(now: DateTime<Utc>) -> u64 {
    (next_utc_midnight(now) - now).num_seconds().max(1) as u64
}

/// Standard error types with predefined status codes
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ErrorType {
    #[error("Bad Request")]
    BadRequest,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden")]
    Forbidden,
    #[error("Not Found")]
    NotFound,
    #[error("Conflict")]
    Conflict,
    #[error("Payload Too Large")]
    PayloadTooLarge,
    #[error("Unsupported Media Type")]
    UnsupportedMediaType,
    #[error("Too Many Requests")]
    TooManyRequests,
    #[error("Internal Server Error")]
    InternalServerError,
    #[error("Bad Gateway")]
    BadGateway,
    #[error("Service Unavailable")]
    ServiceUnavailable,
}

impl ErrorType {
    /// Get the appropriate HTTP status code for this error type
    pub fn status_code(&self) -> StatusCode {
        match self {
            ErrorType::BadRequest => StatusCode::BAD_REQUEST,
            ErrorType::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorType::Forbidden => StatusCode::FORBIDDEN,
            ErrorType::NotFound => StatusCode::NOT_FOUND,
            ErrorType::Conflict => StatusCode::CONFLICT,
            ErrorType::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ErrorType::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ErrorType::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ErrorType::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorType::BadGateway => StatusCode::BAD_GATEWAY,
            ErrorType::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Get the SCREAMING_SNAKE_CASE error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            ErrorType::BadRequest => "VALIDATION_FAILED",
            ErrorType::Unauthorized => "UNAUTHORIZED",
            ErrorType::Forbidden => "FORBIDDEN",
            ErrorType::NotFound => "NOT_FOUND",
            ErrorType::Conflict => "CONFLICT",
            ErrorType::PayloadTooLarge => "PAYLOAD_TOO_LARGE",
            ErrorType::UnsupportedMediaType => "UNSUPPORTED_MEDIA_TYPE",
            ErrorType::TooManyRequests => "RATE_LIMITED",
            ErrorType::InternalServerError => "INTERNAL_SERVER_ERROR",
            ErrorType::BadGateway => "PROVIDER_ERROR",
            ErrorType::ServiceUnavailable => "SERVICE_UNAVAILABLE",
        }
    }
}

/// Upstream provider error information
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProviderError {
    /// Provider identifier (e.g., "github", "openai")
    pub provider: String,
    /// HTTP status code from upstream
    pub status: u16,
    /// Response body snippet from upstream (truncated)
    pub body_snippet: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut headers = HeaderMap::new();

        if let Some(retry_after) = self.retry_after
            && let Ok(header_value) = HeaderValue::from_str(&retry_after.to_string())
        {
            headers.insert("retry-after", header_value);
        }

        if self.status.is_server_error() {
            tracing::warn!(status = self.status.as_u16(), code = %self.code, "Request failed");
        }

        (self.status, headers, axum::Json(self.envelope())).into_response()
    }
}

/// Errors raised by the repository layer.
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str },
    #[error("{entity} already exists")]
    AlreadyExists { entity: &'static str },
    #[error("{0}")]
    Validation(String),
    #[error(transparent)]
    Database(#[from] sea_orm::DbErr),
}

impl RepositoryError {
    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    /// Maps unique-constraint violations to `AlreadyExists`; leaves other errors as-is.
    pub fn from_db(entity: &'static str, error: sea_orm::DbErr) -> Self {
        if is_unique_violation(&error) {
            Self::AlreadyExists { entity }
        } else {
            Self::Database(error)
        }
    }
}

impl From<RepositoryError> for ApiError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound { entity } => Self::new(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{} not found", entity),
            ),
            RepositoryError::AlreadyExists { entity } => Self::new(
                StatusCode::CONFLICT,
                "CONFLICT",
                format!("{} already exists", entity),
            ),
            RepositoryError::Validation(message) => {
                Self::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", message)
            }
            RepositoryError::Database(db_err) => db_err.into(),
        }
    }
}

impl From<ErrorType> for ApiError {
    fn from(error_type: ErrorType) -> Self {
        Self::new(
            error_type.status_code(),
            error_type.error_code(),
            error_type.to_string(),
        )
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(error: anyhow::Error) -> Self {
        tracing::error!("Internal error: {:?}", error);

        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_SERVER_ERROR",
            "An internal error occurred",
        )
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        let message = match rejection {
            JsonRejection::JsonDataError(err) => format!("Invalid JSON: {}", err.body_text()),
            JsonRejection::JsonSyntaxError(err) => format!("JSON syntax error: {}", err.body_text()),
            JsonRejection::MissingJsonContentType(_) => {
                "Missing 'Content-Type: application/json' header".to_string()
            }
            _ => "Invalid request body".to_string(),
        };

        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", message)
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            "VALIDATION_FAILED",
            format!("Invalid query parameters: {}", rejection.body_text()),
        )
    }
}

impl From<sea_orm::DbErr> for ApiError {
    fn from(error: sea_orm::DbErr) -> Self {
        if is_unique_violation(&error) {
            tracing::debug!(?error, "Unique constraint violation detected");
            return Self::new(StatusCode::CONFLICT, "CONFLICT", "Resource already exists");
        }

        match error {
            sea_orm::DbErr::RecordNotFound(record) => Self::new(
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("Record not found: {}", record),
            ),
            sea_orm::DbErr::Conn(connection_err) => {
                tracing::error!("Database connection error: {:?}", connection_err);
                Self::new(
                    StatusCode::SERVICE_UNAVAILABLE,
                    "SERVICE_UNAVAILABLE",
                    "Database service unavailable",
                )
            }
            sea_orm::DbErr::Custom(message) | sea_orm::DbErr::Type(message) => {
                Self::from_message(message)
            }
            _ => {
                tracing::error!("Database error: {:?}", error);
                Self::new(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_SERVER_ERROR",
                    "Database error occurred",
                )
            }
        }
    }
}

/// Create a provider upstream error (always 502 `PROVIDER_ERROR`)
pub fn provider_error(provider: &str, status: u16, body: Option<String>) -> ApiError {
    let provider_error = ProviderError {
        provider: provider.to_string(),
        status,
        body_snippet: body.map(|b| {
            if b.chars().count() > 200 {
                let truncated: String = b.chars().take(200).collect();
                format!("{}...", truncated)
            } else {
                b
            }
        }),
    };

    ApiError::new(
        StatusCode::BAD_GATEWAY,
        "PROVIDER_ERROR",
        format!("Provider {} returned error status {}", provider, status),
    )
    .with_details(json!(provider_error))
}

/// Create an unauthorized error (401)
pub fn unauthorized(message: Option<&str>) -> ApiError {
    let msg = message.unwrap_or("Authentication required");
    ApiError::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg)
}

/// Create a forbidden error (403)
pub fn forbidden(message: Option<&str>) -> ApiError {
    let msg = message.unwrap_or("Insufficient permissions");
    ApiError::new(StatusCode::FORBIDDEN, "FORBIDDEN", msg)
}

/// Create a not found error (404)
pub fn not_found(message: &str) -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
}

/// Create a validation error (400)
pub fn bad_request(message: impl Into<String>) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", message)
}

/// Create a validation error with field details
pub fn validation_error(message: &str, field_errors: serde_json::Value) -> ApiError {
    ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", message).with_details(field_errors)
}

/// Create a 503 for an optional integration that is not configured
pub fn service_unavailable(message: &str) -> ApiError {
    ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", message)
}

/// Create a 429 whose `Retry-After` points at the next UTC midnight
pub fn daily_limit_exceeded(limit: u32, now: DateTime<Utc>) -> ApiError {
    ApiError::new(
        StatusCode::TOO_MANY_REQUESTS,
        "RATE_LIMITED",
        format!("Daily vouch limit of {} reached", limit),
    )
    .with_details(json!({ "limit": limit }))
    .with_retry_after(seconds_until_utc_midnight(now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_api_error_with_details() {
        let error = ApiError::new(StatusCode::BAD_REQUEST, "VALIDATION_FAILED", "bad")
            .with_details(json!({"field": "value"}));

        assert_eq!(error.details, Some(Box::new(json!({"field": "value"}))));
        assert_eq!(error.retry_after, None);
    }

    #[test]
    fn test_from_message_mapping() {
        let cases = [
            ("Profile not found", StatusCode::NOT_FOUND),
            ("Username already exists", StatusCode::CONFLICT),
            ("Unique constraint failed on username", StatusCode::CONFLICT),
            ("duplicate key value", StatusCode::CONFLICT),
            ("Invalid website URL", StatusCode::BAD_REQUEST),
            ("username is required", StatusCode::BAD_REQUEST),
            ("bio must be at most 1000 characters", StatusCode::BAD_REQUEST),
            ("validation failed", StatusCode::BAD_REQUEST),
            ("socket hang up", StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (message, status) in cases {
            assert_eq!(ApiError::from_message(message).status, status, "{message}");
        }
    }

    #[test]
    fn test_from_message_hides_internal_text() {
        let error = ApiError::from_message("connection reset by peer at 10.0.0.3");
        assert_eq!(error.code.as_ref(), "INTERNAL_SERVER_ERROR");
        assert!(!error.message.contains("10.0.0.3"));
    }

    #[tokio::test]
    async fn test_envelope_shape() {
        let response = ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", "Profile not found")
            .into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "application/json"
        );

        let body = body_json(response).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "NOT_FOUND");
        assert_eq!(body["message"], "Profile not found");
        assert!(body["trace_id"].is_string());
        assert!(body["timestamp"].is_string());
        assert!(body.get("details").is_none());
    }

    #[test]
    fn test_repository_error_mapping() {
        let not_found: ApiError = RepositoryError::not_found("Profile").into();
        assert_eq!(not_found.status, StatusCode::NOT_FOUND);
        assert_eq!(not_found.message.as_ref(), "Profile not found");

        let conflict: ApiError = RepositoryError::AlreadyExists { entity: "Vouch" }.into();
        assert_eq!(conflict.status, StatusCode::CONFLICT);

        let invalid: ApiError = RepositoryError::Validation("bad skill".into()).into();
        assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_database_error_mapping() {
        let api_error: ApiError = sea_orm::DbErr::RecordNotFound("profiles".to_string()).into();
        assert_eq!(api_error.status, StatusCode::NOT_FOUND);

        let api_error: ApiError = sea_orm::DbErr::Custom("boom".to_string()).into();
        assert_eq!(api_error.status, StatusCode::INTERNAL_SERVER_ERROR);

        let api_error: ApiError = sea_orm::DbErr::Custom("Skill name is required".into()).into();
        assert_eq!(api_error.status, StatusCode::BAD_REQUEST);
        assert!(!is_unique_violation(&sea_orm::DbErr::Custom("boom".into())));
    }

    #[test]
    fn test_provider_error_is_bad_gateway() {
        for upstream in [200u16, 401, 404, 429, 503] {
            let error = provider_error("github", upstream, Some("nope".to_string()));
            assert_eq!(error.status, StatusCode::BAD_GATEWAY);
            assert_eq!(error.code.as_ref(), "PROVIDER_ERROR");
            let details = error.details.unwrap();
            assert_eq!(details["provider"], "github");
            assert_eq!(details["status"], upstream);
        }
    }

    #[test]
    fn test_provider_error_truncates_on_char_boundary() {
        let body = "çé🚀 ".repeat(100);
        let error = provider_error("openai", 500, Some(body));
        let snippet = error.details.unwrap()["body_snippet"]
            .as_str()
            .unwrap()
            .to_string();
        assert!(snippet.ends_with("..."));
        assert_eq!(snippet.chars().count(), 203);
    }

    #[test]
    fn test_seconds_until_utc_midnight() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 23, 59, 0).unwrap();
        assert_eq!(seconds_until_utc_midnight(now), 60);

        let now = Utc.with_ymd_and_hms(2026, 3, 14, 0, 0, 0).unwrap();
        assert_eq!(seconds_until_utc_midnight(now), 86_400);
    }

    #[test]
    fn test_next_utc_midnight_rolls_over_month() {
        let now = Utc.with_ymd_and_hms(2025, 3, 31, 23, 59, 59).unwrap();
        assert_eq!(
            next_utc_midnight(now),
            Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(seconds_until_utc_midnight(now), 1);
    }

    #[tokio::test]
    async fn test_daily_limit_sets_retry_after() {
        let now = Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap();
        let response = daily_limit_exceeded(10, now).into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(response.headers().get("retry-after").unwrap(), "43200");
        let body = body_json(response).await;
        assert_eq!(body["error"], "RATE_LIMITED");
        assert_eq!(body["details"]["limit"], 10);
    }

    #[test]
    fn test_trace_id_fallback_format() {
        let error = forbidden(None);
        let trace_id = error.trace_id.unwrap();
        assert!(trace_id.starts_with("corr-"));
        assert_eq!(trace_id.len(), 13);
    }
}
