//! # Auth API Handlers
//!
//! Google sign-in, sign-out and the current-session endpoint.

use axum::{
    extract::State,
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{LOCATION, SET_COOKIE},
    },
    response::{AppendHeaders, IntoResponse, Json, Response},
};
use chrono::Duration;
use metrics::counter;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::{info, warn};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::auth::{CurrentUser, read_cookie};
use crate::error::{ApiError, bad_request, service_unavailable, unauthorized};
use crate::handlers::extract::ApiQuery;
use crate::handlers::types::ApiResponse;
use crate::handlers::users::UserResponse;
use crate::repositories::{OAuthStateRepository, ProfileRepository, UserRepository};
use crate::server::AppState;
use crate::validation::validate_redirect_path;

/// OAuth round trips must finish within this window.
const OAUTH_STATE_TTL_MINUTES: i64 = 10;

/// Binds the OAuth `state` to the browser that started sign-in.
pub const OAUTH_STATE_COOKIE: &str = "devfolio_oauth_state";

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LoginQuery {
    /// Relative path to return to after sign-in
    #[param(example = "/profiles/ada")]
    pub redirect_to: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set by Google when the user declines consent
    pub error: Option<String>,
}

/// The signed-in user and their profile, if created.
#[derive(Debug, Serialize, ToSchema)]
pub struct MeResponse {
    pub user: UserResponse,
    pub profile_id: Option<Uuid>,
}

fn random_state() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64_url::encode(&bytes)
}

fn state_cookie(value: &str, max_age: i64, secure: bool) -> Result<HeaderValue, ApiError> {
    let mut cookie = format!(
        "{}={}; Path=/api/auth; HttpOnly; SameSite=Lax; Max-Age={}",
        OAUTH_STATE_COOKIE, value, max_age
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).map_err(|_| bad_request("Invalid OAuth state"))
}

fn states_match(expected: &str, actual: &str) -> bool {
    expected.as_bytes().ct_eq(actual.as_bytes()).into()
}

fn location(target: &str) -> Result<HeaderValue, ApiError> {
    HeaderValue::from_str(target)
        .map_err(|_| bad_request("Redirect target is not a valid header value"))
}

/// Start Google sign-in
#[utoipa::path(
    get,
    path = "/api/auth/google",
    params(LoginQuery),
    responses(
        (status = 302, description = "Redirect to the Google consent page"),
        (status = 400, description = "Invalid redirect target", body = crate::error::ErrorEnvelope),
        (status = 503, description = "Google sign-in is not configured", body = crate::error::ErrorEnvelope)
    ),
    tag = "auth"
)]
pub async fn google_login(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<LoginQuery>,
) -> Result<Response, ApiError> {
    let google = state
        .google
        .as_ref()
        .ok_or_else(|| service_unavailable("Google sign-in is not configured"))?;

    let redirect_to = query
        .redirect_to
        .filter(|r| !r.trim().is_empty())
        .map(|r| validate_redirect_path(&r))
        .transpose()?;

    let states = OAuthStateRepository::new(&state.db);
    match states.purge_expired().await {
        Ok(0) => {}
        Ok(purged) => tracing::debug!(purged, "Purged expired OAuth states"),
        Err(error) => warn!(%error, "Failed to purge expired OAuth states"),
    }

    let csrf = random_state();
    let request = google.authorize(&csrf);
    states
        .create(
            &csrf,
            &request.code_verifier,
            redirect_to,
            Duration::minutes(OAUTH_STATE_TTL_MINUTES),
        )
        .await?;

    let cookie = state_cookie(
        &csrf,
        OAUTH_STATE_TTL_MINUTES * 60,
        state.config.session.cookie_secure,
    )?;
    Ok((
        StatusCode::FOUND,
        [(LOCATION, location(request.url.as_str())?), (SET_COOKIE, cookie)],
    )
        .into_response())
}

/// Google OAuth callback
#[utoipa::path(
    get,
    path = "/api/auth/google/callback",
    params(CallbackQuery),
    responses(
        (status = 302, description = "Signed in; session cookie set"),
        (status = 400, description = "Missing code, or state invalid, expired or not bound to this browser", body = crate::error::ErrorEnvelope),
        (status = 502, description = "Google rejected the exchange", body = crate::error::ErrorEnvelope),
        (status = 503, description = "Google sign-in is not configured", body = crate::error::ErrorEnvelope)
    ),
    tag = "auth"
)]
pub async fn google_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    ApiQuery(query): ApiQuery<CallbackQuery>,
) -> Result<Response, ApiError> {
    let google = state
        .google
        .as_ref()
        .ok_or_else(|| service_unavailable("Google sign-in is not configured"))?;

    if let Some(error) = query.error {
        info!(%error, "Google sign-in declined");
        return Err(bad_request("Google sign-in was cancelled"));
    }
    let (Some(code), Some(csrf)) = (query.code, query.state) else {
        return Err(bad_request("Missing code or state"));
    };

    let browser_state = read_cookie(&headers, OAUTH_STATE_COOKIE).unwrap_or_default();
    if !states_match(&browser_state, &csrf) {
        warn!("OAuth state does not match the browser cookie");
        return Err(bad_request("Invalid or expired OAuth state"));
    }

    let pending = OAuthStateRepository::new(&state.db)
        .consume(&csrf)
        .await?
        .ok_or_else(|| bad_request("Invalid or expired OAuth state"))?;

    let identity = google.exchange(&code, &pending.code_verifier).await?;
    let is_admin = state.config.is_admin_email(&identity.email);
    let user = UserRepository::new(&state.db)
        .upsert_from_google(&identity, is_admin)
        .await?;

    let has_profile = ProfileRepository::new(&state.db)
        .find_by_user_id(user.id)
        .await?
        .is_some();

    let app_url = state.config.app_url.trim_end_matches('/');
    let target = match (pending.redirect_to, has_profile) {
        (_, false) => format!("{}/onboarding", app_url),
        (Some(path), true) => format!("{}{}", app_url, path),
        (None, true) => format!("{}/", app_url),
    };

    let claims = state.sealer.issue(&user);
    let session_cookie = state.sealer.cookie(&claims)?;
    let cleared_state = state_cookie("", 0, state.config.session.cookie_secure)?;

    counter!("sign_ins_total").increment(1);
    info!(user_id = %user.id, role = %user.role, "User signed in");

    Ok((
        StatusCode::FOUND,
        [(LOCATION, location(&target)?)],
        AppendHeaders([(SET_COOKIE, session_cookie), (SET_COOKIE, cleared_state)]),
    )
        .into_response())
}

/// Sign out
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Session cookie cleared", body = ApiResponse<bool>)
    ),
    tag = "auth"
)]
pub async fn logout(State(state): State<AppState>) -> Result<Response, ApiError> {
    let cookie = state.sealer.clear_cookie()?;
    Ok((
        [(SET_COOKIE, cookie)],
        Json(ApiResponse::with_message(true, "Signed out")),
    )
        .into_response())
}

/// Current session
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Signed-in user", body = ApiResponse<MeResponse>),
        (status = 401, description = "Not signed in", body = crate::error::ErrorEnvelope)
    ),
    tag = "auth"
)]
pub async fn me(
    State(state): State<AppState>,
    CurrentUser(claims): CurrentUser,
) -> Result<Json<ApiResponse<MeResponse>>, ApiError> {
    let user = UserRepository::new(&state.db)
        .find_by_id(claims.user_id)
        .await?
        .ok_or_else(|| unauthorized(Some("Account no longer exists")))?;

    let profile_id = ProfileRepository::new(&state.db)
        .find_by_user_id(user.id)
        .await?
        .map(|p| p.id);

    Ok(Json(ApiResponse::ok(MeResponse {
        user: user.into(),
        profile_id,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_state_is_url_safe_and_unique() {
        let a = random_state();
        let b = random_state();
        assert_ne!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_states_match() {
        assert!(states_match("abc", "abc"));
        assert!(!states_match("abc", "abd"));
        assert!(!states_match("", "abc"));
    }

    #[test]
    fn test_state_cookie_attributes() {
        let cookie = state_cookie("xyz", 600, true).unwrap();
        let cookie = cookie.to_str().unwrap();
        assert!(cookie.starts_with("devfolio_oauth_state=xyz;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=600"));
        assert!(cookie.ends_with("; Secure"));
    }
}
