//! GitHub REST client
//!
//! Reads public user and repository data for profile prefill and repo sync.
//! Requests are unauthenticated unless a token is configured.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{
    StatusCode,
    header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue},
};
use serde::Deserialize;
use tracing::debug;

use super::{UpstreamError, status_error};
use crate::config::GitHubConfig;

const PROVIDER: &str = "github";

// Upper bound on pages walked while skipping forks
const MAX_REPO_PAGES: u32 = 10;

/// Public GitHub user.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GitHubUser {
    pub login: String,
    pub name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    /// Free-form website field
    pub blog: Option<String>,
    pub location: Option<String>,
    pub html_url: String,
}

/// Repository as listed by `GET /users/{login}/repos`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GitHubRepo {
    pub id: i64,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub html_url: String,
    pub language: Option<String>,
    #[serde(default)]
    pub stargazers_count: i64,
    #[serde(default)]
    pub forks_count: i64,
    #[serde(default)]
    pub fork: bool,
    #[serde(default)]
    pub archived: bool,
    pub pushed_at: Option<DateTime<Utc>>,
}

/// Operations the sync and onboarding flows need from GitHub.
#[async_trait]
pub trait GitHubApi: Send + Sync {
    async fn get_user(&self, login: &str) -> Result<GitHubUser, UpstreamError>;

    /// Up to `limit` public non-fork repositories owned by `login`, most recently pushed first.
    async fn list_repos(&self, login: &str, limit: u32) -> Result<Vec<GitHubRepo>, UpstreamError>;

    /// Bytes of code per language for `owner/name`.
    async fn repo_languages(&self, full_name: &str) -> Result<BTreeMap<String, u64>, UpstreamError>;
}

/// reqwest-backed [`GitHubApi`].
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_base: String,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(http: reqwest::Client, config: &GitHubConfig) -> Self {
        Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            token: config.token.clone(),
        }
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static("2022-11-28"),
        );
        if let Some(token) = &self.token
            && let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token))
        {
            headers.insert(AUTHORIZATION, value);
        }
        headers
    }

    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<reqwest::Response, UpstreamError> {
        let url = format!("{}{}", self.api_base, path);
        debug!(%url, "GitHub request");

        self.http
            .get(&url)
            .headers(self.headers())
            .query(query)
            .send()
            .await
            .map_err(UpstreamError::network(PROVIDER))
    }
}

#[async_trait]
impl GitHubApi for GitHubClient {
    async fn get_user(&self, login: &str) -> Result<GitHubUser, UpstreamError> {
        let response = self.get(&format!("/users/{}", login), &[]).await?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(UpstreamError::NotFound {
                provider: PROVIDER,
                what: "GitHub user not found".to_string(),
            }),
            status if status.is_success() => response
                .json::<GitHubUser>()
                .await
                .map_err(UpstreamError::decode(PROVIDER)),
            _ => Err(status_error(PROVIDER, response).await),
        }
    }

    async fn list_repos(&self, login: &str, limit: u32) -> Result<Vec<GitHubRepo>, UpstreamError> {
        let per_page = limit.clamp(1, 100);
        let wanted = per_page as usize;
        let mut repos = Vec::with_capacity(wanted);

        for page in 1..=MAX_REPO_PAGES {
            let response = self
                .get(
                    &format!("/users/{}/repos", login),
                    &[
                        ("type", "owner".to_string()),
                        ("sort", "pushed".to_string()),
                        ("direction", "desc".to_string()),
                        ("per_page", per_page.to_string()),
                        ("page", page.to_string()),
                    ],
                )
                .await?;

            let batch = match response.status() {
                StatusCode::NOT_FOUND => {
                    return Err(UpstreamError::NotFound {
                        provider: PROVIDER,
                        what: "GitHub user not found".to_string(),
                    });
                }
                status if status.is_success() => response
                    .json::<Vec<GitHubRepo>>()
                    .await
                    .map_err(UpstreamError::decode(PROVIDER))?,
                _ => return Err(status_error(PROVIDER, response).await),
            };

            let last_page = batch.len() < wanted;
            repos.extend(batch.into_iter().filter(|repo| !repo.fork));
            if last_page || repos.len() >= wanted {
                break;
            }
        }

        repos.sort_by(|a, b| b.pushed_at.cmp(&a.pushed_at));
        repos.truncate(wanted);
        Ok(repos)
    }

    async fn repo_languages(&self, full_name: &str) -> Result<BTreeMap<String, u64>, UpstreamError> {
        let response = self
            .get(&format!("/repos/{}/languages", full_name), &[])
            .await?;

        if !response.status().is_success() {
            return Err(status_error(PROVIDER, response).await);
        }

        response
            .json::<BTreeMap<String, u64>>()
            .await
            .map_err(UpstreamError::decode(PROVIDER))
    }
}
