//! # Onboarding
//!
//! The first-run wizard: one call creates (or updates) the caller's profile,
//! fills blanks from their GitHub account and runs a first sync.

use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::SessionClaims;
use crate::clients::{GitHubApi, GitHubUser, UpstreamError};
use crate::error::ApiError;
use crate::models::profile;
use crate::repositories::{NewProfile, ProfileChanges, ProfileRepository};
use crate::services::{
    profile::{ProfileDetails, ProfileService, load_details},
    sync::{SyncService, SyncSummary},
};
use crate::validation::{
    normalize_skills, normalize_username, validate_bio, validate_display_name,
    validate_github_username,
};

/// Where the caller stands in the wizard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct OnboardingStatus {
    pub has_profile: bool,
    pub has_github: bool,
    pub has_synced: bool,
    pub has_avatar: bool,
    pub complete: bool,
    /// `profile`, `github`, `sync`, `avatar` or `done`
    pub next_step: String,
    pub profile_id: Option<Uuid>,
}

impl OnboardingStatus {
    pub fn for_profile(profile: Option<&profile::Model>) -> Self {
        let has_profile = profile.is_some();
        let has_github = profile.is_some_and(|p| p.github_username.is_some());
        let has_synced = profile.is_some_and(|p| p.last_synced_at.is_some());
        let has_avatar = profile.is_some_and(|p| p.avatar_url.is_some());

        let next_step = if !has_profile {
            "profile"
        } else if !has_github {
            "github"
        } else if !has_synced {
            "sync"
        } else if !has_avatar {
            "avatar"
        } else {
            "done"
        };

        Self {
            has_profile,
            has_github,
            has_synced,
            has_avatar,
            complete: next_step == "done",
            next_step: next_step.to_string(),
            profile_id: profile.map(|p| p.id),
        }
    }
}

/// Body of `POST /api/onboarding`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct OnboardingRequest {
    pub username: String,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    pub github_username: Option<String>,
}

/// Result of completing the wizard.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OnboardingOutcome {
    pub profile: ProfileDetails,
    pub status: OnboardingStatus,
    /// Present when the first sync succeeded
    pub sync: Option<SyncSummary>,
    /// Why the first sync failed, if it did
    pub sync_error: Option<String>,
}

pub struct OnboardingService<'a> {
    db: &'a DatabaseConnection,
    github: &'a dyn GitHubApi,
    max_repos: u32,
}

impl<'a> OnboardingService<'a> {
    pub fn new(db: &'a DatabaseConnection, github: &'a dyn GitHubApi, max_repos: u32) -> Self {
        Self {
            db,
            github,
            max_repos,
        }
    }

    pub async fn status(&self, user_id: Uuid) -> Result<OnboardingStatus, ApiError> {
        let profile = ProfileRepository::new(self.db)
            .find_by_user_id(user_id)
            .await?;
        Ok(OnboardingStatus::for_profile(profile.as_ref()))
    }

    #[instrument(skip(self, actor, request), fields(user_id = %actor.user_id))]
    pub async fn complete(
        &self,
        actor: &SessionClaims,
        request: OnboardingRequest,
    ) -> Result<OnboardingOutcome, ApiError> {
        let username = normalize_username(&request.username)?;
        let skills = normalize_skills(&request.skills)?;
        let github_username = request
            .github_username
            .filter(|g| !g.trim().is_empty())
            .map(|g| validate_github_username(&g))
            .transpose()?;

        let github_user = match &github_username {
            Some(login) => self.github_prefill(login).await?,
            None => None,
        };

        // `None` below means nothing was given or prefilled: keep what the profile has
        let display_name = pick(request.display_name, github_user.as_ref().and_then(|u| u.name.clone()))
            .map(|name| validate_display_name(&name))
            .transpose()?;
        let bio = pick(request.bio, github_user.as_ref().and_then(|u| u.bio.clone()))
            .map(|bio| validate_bio(&bio))
            .transpose()?;
        let avatar_url = github_user.as_ref().and_then(|u| u.avatar_url.clone());

        let service = ProfileService::new(self.db);
        let existing = service.find_for_user(actor.user_id).await?;

        let details = match existing {
            None => {
                let new = NewProfile {
                    user_id: actor.user_id,
                    username,
                    display_name: match display_name {
                        Some(name) => name,
                        None => validate_display_name(&actor.name)?,
                    },
                    bio: bio.unwrap_or_default(),
                    github_username: github_username.clone(),
                    avatar_url,
                    location: github_user.as_ref().and_then(|u| u.location.clone()),
                    website: None,
                };
                service.create_validated(new, skills).await?
            }
            Some(profile) => {
                let changes = ProfileChanges {
                    username: Some(username),
                    display_name,
                    bio,
                    github_username: Some(github_username.clone()),
                    // Keep an uploaded avatar over the GitHub one
                    avatar_url: profile.avatar_url.is_none().then_some(avatar_url),
                    ..Default::default()
                };
                service
                    .update_validated(profile.id, actor, changes, Some(skills))
                    .await?
            }
        };

        let (sync, sync_error) = if details.github_username.is_some() {
            match SyncService::new(self.db, self.github, self.max_repos)
                .sync_profile(details.id)
                .await
            {
                Ok(summary) => (Some(summary), None),
                Err(error) => {
                    warn!(profile_id = %details.id, error = %error.message, "First sync failed");
                    (None, Some(error.message.to_string()))
                }
            }
        } else {
            (None, None)
        };

        let model = ProfileRepository::new(self.db).get(details.id).await?;
        let status = OnboardingStatus::for_profile(Some(&model));
        let profile = load_details(self.db, model).await?;

        info!(profile_id = %profile.id, next_step = %status.next_step, "Onboarding completed");
        Ok(OnboardingOutcome {
            profile,
            status,
            sync,
            sync_error,
        })
    }

    /// The GitHub account to prefill from. An unknown login is the caller's
    /// mistake and is reported; other GitHub failures only skip the prefill.
    async fn github_prefill(&self, login: &str) -> Result<Option<GitHubUser>, ApiError> {
        match self.github.get_user(login).await {
            Ok(user) => Ok(Some(user)),
            Err(error @ UpstreamError::NotFound { .. }) => Err(error.into()),
            Err(error) => {
                warn!(%login, %error, "GitHub prefill skipped");
                Ok(None)
            }
        }
    }
}

/// The provided value unless blank, else the fallback unless blank.
fn pick(provided: Option<String>, fallback: Option<String>) -> Option<String> {
    provided
        .filter(|v| !v.trim().is_empty())
        .or_else(|| fallback.filter(|v| !v.trim().is_empty()))
}
