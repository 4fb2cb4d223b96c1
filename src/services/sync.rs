//! # Profile Sync
//!
//! Mirrors a profile's public GitHub repositories. Each run replaces the
//! profile's repo rows wholesale with a fresh snapshot.

use std::time::Instant;

use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::clients::{GitHubApi, GitHubRepo};
use crate::error::{ApiError, bad_request};
use crate::repositories::{ProfileRepository, RepoRepository, RepoSnapshot};

/// Outcome of a completed sync.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct SyncSummary {
    pub profile_id: Uuid,
    pub github_username: String,
    pub repo_count: u64,
    pub synced_at: DateTime<Utc>,
}

pub struct SyncService<'a> {
    db: &'a DatabaseConnection,
    github: &'a dyn GitHubApi,
    max_repos: u32,
}

impl<'a> SyncService<'a> {
    pub fn new(db: &'a DatabaseConnection, github: &'a dyn GitHubApi, max_repos: u32) -> Self {
        Self {
            db,
            github,
            max_repos,
        }
    }

    #[instrument(skip(self), fields(%profile_id))]
    pub async fn sync_profile(&self, profile_id: Uuid) -> Result<SyncSummary, ApiError> {
        let started = Instant::now();
        let profiles = ProfileRepository::new(self.db);
        let profile = profiles.get(profile_id).await?;

        let Some(login) = profile.github_username.clone() else {
            return Err(bad_request("Profile has no GitHub username to sync from"));
        };

        let result = self.fetch_snapshots(&login).await;
        let snapshots = match result {
            Ok(snapshots) => snapshots,
            Err(error) => {
                counter!("profile_sync_total", "outcome" => "error").increment(1);
                return Err(error.into());
            }
        };

        let repo_count = RepoRepository::new(self.db)
            .replace_for_profile(profile_id, snapshots)
            .await?;
        let synced = profiles.mark_synced(profile_id).await?;

        counter!("profile_sync_total", "outcome" => "success").increment(1);
        histogram!("profile_sync_duration_seconds").record(started.elapsed().as_secs_f64());
        info!(%login, repo_count, "Profile synced from GitHub");

        Ok(SyncSummary {
            profile_id,
            github_username: login,
            repo_count,
            synced_at: synced
                .last_synced_at
                .map(|at| at.to_utc())
                .unwrap_or_else(Utc::now),
        })
    }

    async fn fetch_snapshots(
        &self,
        login: &str,
    ) -> Result<Vec<RepoSnapshot>, crate::clients::UpstreamError> {
        let repos = self.github.list_repos(login, self.max_repos).await?;
        let mut snapshots = Vec::with_capacity(repos.len());

        for repo in repos {
            // A failed language lookup only loses the breakdown for that repo
            let languages = match self.github.repo_languages(&repo.full_name).await {
                Ok(languages) => serde_json::to_value(languages).unwrap_or_default(),
                Err(error) => {
                    warn!(repo = %repo.full_name, %error, "Language lookup failed");
                    serde_json::Value::Object(Default::default())
                }
            };
            snapshots.push(snapshot(repo, languages));
        }

        Ok(snapshots)
    }
}

fn snapshot(repo: GitHubRepo, languages: serde_json::Value) -> RepoSnapshot {
    RepoSnapshot {
        github_id: repo.id,
        name: repo.name,
        full_name: repo.full_name,
        description: repo.description,
        html_url: repo.html_url,
        primary_language: repo.language,
        languages,
        stars: repo.stargazers_count.clamp(0, i32::MAX as i64) as i32,
        forks: repo.forks_count.clamp(0, i32::MAX as i64) as i32,
        pushed_at: repo.pushed_at,
    }
}
