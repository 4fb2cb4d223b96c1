//! # Third-party Clients
//!
//! Thin `reqwest` wrappers around GitHub, OpenAI, Cloudinary and Google. The
//! GitHub, OpenAI and Cloudinary clients sit behind traits so services can be
//! exercised against fakes.

use axum::http::StatusCode;
use thiserror::Error;

use crate::error::{ApiError, provider_error, service_unavailable};

pub mod cloudinary;
pub mod github;
pub mod google;
pub mod openai;

pub use cloudinary::{CloudinaryClient, ImageStore, UploadedImage};
pub use github::{GitHubApi, GitHubClient, GitHubRepo, GitHubUser};
pub use google::GoogleOAuthClient;
pub use openai::{OpenAiClient, ReviewGenerator};

/// `User-Agent` sent on every outbound call.
pub const USER_AGENT: &str = concat!("devfolio/", env!("CARGO_PKG_VERSION"));

/// Errors raised while talking to a third-party API.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("{provider}: {what} not found")]
    NotFound {
        provider: &'static str,
        what: String,
    },

    #[error("{provider} returned status {status}")]
    Status {
        provider: &'static str,
        status: u16,
        body: String,
    },

    #[error("{provider} request failed: {source}")]
    Network {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} response could not be decoded: {message}")]
    Decode {
        provider: &'static str,
        message: String,
    },

    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

impl UpstreamError {
    pub fn network(provider: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |source| Self::Network { provider, source }
    }

    pub fn decode(provider: &'static str) -> impl FnOnce(reqwest::Error) -> Self {
        move |error| Self::Decode {
            provider,
            message: error.to_string(),
        }
    }
}

impl From<UpstreamError> for ApiError {
    fn from(error: UpstreamError) -> Self {
        match error {
            UpstreamError::NotFound { provider, what } => {
                tracing::debug!(provider, %what, "Upstream resource not found");
                ApiError::new(StatusCode::NOT_FOUND, "NOT_FOUND", what)
            }
            UpstreamError::Status {
                provider,
                status,
                body,
            } => {
                tracing::warn!(provider, status, "Upstream returned error status");
                provider_error(provider, status, Some(body))
            }
            UpstreamError::Network { provider, source } => {
                tracing::warn!(provider, error = %source, "Upstream request failed");
                let status = source.status().map(|s| s.as_u16()).unwrap_or(0);
                provider_error(provider, status, None)
            }
            UpstreamError::Decode { provider, message } => {
                tracing::warn!(provider, %message, "Upstream response could not be decoded");
                provider_error(provider, 200, Some(message))
            }
            UpstreamError::NotConfigured(what) => {
                service_unavailable(&format!("{} is not configured", what))
            }
        }
    }
}

/// Reads a non-success response into an [`UpstreamError::Status`].
pub(crate) async fn status_error(provider: &'static str, response: reqwest::Response) -> UpstreamError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    UpstreamError::Status {
        provider,
        status,
        body,
    }
}

/// Shared outbound HTTP client.
pub fn build_http_client(timeout: std::time::Duration) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        // OAuth token endpoints must not be followed through redirects
        .redirect(reqwest::redirect::Policy::none())
        .build()
}
