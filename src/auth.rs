//! # Authentication and Authorization
//!
//! Cookie sessions for signed-in users. The cookie value is the JSON
//! [`SessionClaims`] sealed with AES-256-GCM and base64url encoded; the cookie
//! name is bound in as additional authenticated data so a sealed value cannot
//! be replayed under a different cookie.
//!
//! Handlers pick an extractor for the access level they need:
//! [`CurrentUser`] (401 without a valid session), [`MaybeUser`] (anonymous
//! allowed) and [`AdminUser`] (403 unless the session carries the admin role).
//! [`ClientIp`] resolves the caller's address for star deduplication.

use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{ConnectInfo, FromRef, FromRequestParts},
    http::{HeaderMap, HeaderValue, header::COOKIE, request::Parts},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::crypto::{CryptoError, CryptoKey, open_bytes, seal_bytes};
use crate::error::{ApiError, forbidden, unauthorized};
use crate::models::user::{self, ROLE_ADMIN};
use crate::server::AppState;

/// Identity carried inside the session cookie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub role: String,
    /// Expiry as seconds since the Unix epoch
    pub exp: i64,
}

impl SessionClaims {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    /// True when the caller is `user_id` or an administrator.
    pub fn can_act_for(&self, user_id: Uuid) -> bool {
        self.user_id == user_id || self.is_admin()
    }
}

/// Seals, opens and formats session cookies.
pub struct SessionSealer {
    key: CryptoKey,
    cookie_name: String,
    secure: bool,
    ttl_seconds: u64,
}

impl std::fmt::Debug for SessionSealer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionSealer")
            .field("cookie_name", &self.cookie_name)
            .field("secure", &self.secure)
            .field("ttl_seconds", &self.ttl_seconds)
            .finish_non_exhaustive()
    }
}

impl SessionSealer {
    pub fn from_config(config: &SessionConfig) -> Result<Self, CryptoError> {
        let key = config
            .key
            .clone()
            .ok_or(CryptoError::InvalidKeyLength(0))?;

        Ok(Self {
            key: CryptoKey::new(key)?,
            cookie_name: config.cookie_name.clone(),
            secure: config.cookie_secure,
            ttl_seconds: config.ttl_seconds,
        })
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Claims for a freshly signed-in user.
    pub fn issue(&self, user: &user::Model) -> SessionClaims {
        SessionClaims {
            user_id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role.clone(),
            exp: Utc::now().timestamp() + self.ttl_seconds as i64,
        }
    }

    pub fn seal(&self, claims: &SessionClaims) -> Result<String, ApiError> {
        let payload = serde_json::to_vec(claims)
            .map_err(|e| ApiError::from(anyhow::anyhow!("session encode failed: {e}")))?;
        let sealed = seal_bytes(&self.key, self.cookie_name.as_bytes(), &payload)
            .map_err(|e| ApiError::from(anyhow::anyhow!("session seal failed: {e}")))?;
        Ok(base64_url::encode(&sealed))
    }

    /// Returns the claims when `value` is authentic and unexpired.
    pub fn open(&self, value: &str) -> Option<SessionClaims> {
        let sealed = base64_url::decode(value).ok()?;
        let payload = open_bytes(&self.key, self.cookie_name.as_bytes(), &sealed).ok()?;
        let claims: SessionClaims = serde_json::from_slice(&payload).ok()?;

        if claims.exp <= Utc::now().timestamp() {
            tracing::debug!(user_id = %claims.user_id, "Session expired");
            return None;
        }
        Some(claims)
    }

    /// `Set-Cookie` value carrying the sealed claims.
    pub fn cookie(&self, claims: &SessionClaims) -> Result<HeaderValue, ApiError> {
        let value = self.seal(claims)?;
        self.cookie_header(&value, self.ttl_seconds)
    }

    /// `Set-Cookie` value that removes the session.
    pub fn clear_cookie(&self) -> Result<HeaderValue, ApiError> {
        self.cookie_header("", 0)
    }

    fn cookie_header(&self, value: &str, max_age: u64) -> Result<HeaderValue, ApiError> {
        let mut cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
            self.cookie_name, value, max_age
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie)
            .map_err(|e| ApiError::from(anyhow::anyhow!("invalid cookie header: {e}")))
    }

    /// Claims from the request's session cookie, if present and valid.
    pub fn from_headers(&self, headers: &HeaderMap) -> Option<SessionClaims> {
        read_cookie(headers, &self.cookie_name).and_then(|value| self.open(&value))
    }
}

/// Value of cookie `name` across all `Cookie` headers.
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

impl FromRef<AppState> for Arc<SessionSealer> {
    fn from_ref(app_state: &AppState) -> Self {
        Arc::clone(&app_state.sealer)
    }
}

/// A signed-in user.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub SessionClaims);

/// The signed-in user, if any.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<SessionClaims>);

/// A signed-in administrator.
#[derive(Debug, Clone)]
pub struct AdminUser(pub SessionClaims);

impl<S> FromRequestParts<S> for MaybeUser
where
    Arc<SessionSealer>: FromRef<S>,
    S: Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let sealer = Arc::<SessionSealer>::from_ref(state);
        Ok(MaybeUser(sealer.from_headers(&parts.headers)))
    }
}

impl<S> FromRequestParts<S> for CurrentUser
where
    Arc<SessionSealer>: FromRef<S>,
    S: Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let MaybeUser(claims) = MaybeUser::from_request_parts(parts, state).await?;
        claims
            .map(CurrentUser)
            .ok_or_else(|| unauthorized(Some("Sign in required")))
    }
}

impl<S> FromRequestParts<S> for AdminUser
where
    Arc<SessionSealer>: FromRef<S>,
    S: Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentUser(claims) = CurrentUser::from_request_parts(parts, state).await?;
        if !claims.is_admin() {
            tracing::info!(user_id = %claims.user_id, "Admin access denied");
            return Err(forbidden(Some("Administrator access required")));
        }
        Ok(AdminUser(claims))
    }
}

/// Caller address: first `X-Forwarded-For` hop, then `X-Real-IP`, then the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl ClientIp {
    pub fn from_parts(headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let forwarded = header("x-forwarded-for")
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty());

        let ip = forwarded
            .or_else(|| header("x-real-ip"))
            .map(str::to_string)
            .or_else(|| peer.map(|addr| addr.ip().to_string()))
            .unwrap_or_else(|| "unknown".to_string());

        ClientIp(ip)
    }
}

impl<S> FromRequestParts<S> for ClientIp
where
    S: Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        Ok(ClientIp::from_parts(&parts.headers, peer))
    }
}
