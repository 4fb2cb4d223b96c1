//! # AI Review
//!
//! Generates a short written review of a profile from its bio, skills and
//! most starred repositories. Regenerating replaces the stored review.

use metrics::counter;
use sea_orm::DatabaseConnection;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::auth::SessionClaims;
use crate::clients::ReviewGenerator;
use crate::error::{ApiError, service_unavailable};
use crate::models::{ai_review, profile, repo};
use crate::repositories::{AiReviewRepository, ProfileRepository, RepoRepository};
use crate::services::profile::ensure_can_edit;

/// Repositories included in the prompt.
const PROMPT_REPOS: u64 = 5;

const SYSTEM_PROMPT: &str = "You are a senior engineer writing a short, honest and \
encouraging review of a developer's public portfolio. Write two or three short \
paragraphs in plain text. Mention concrete strengths visible in the data and one \
area to grow. Do not invent projects or facts that are not listed.";

pub struct ReviewService<'a> {
    db: &'a DatabaseConnection,
    generator: Option<&'a dyn ReviewGenerator>,
}

impl<'a> ReviewService<'a> {
    pub fn new(db: &'a DatabaseConnection, generator: Option<&'a dyn ReviewGenerator>) -> Self {
        Self { db, generator }
    }

    pub async fn get(&self, profile_id: Uuid) -> Result<ai_review::Model, ApiError> {
        ProfileRepository::new(self.db).get(profile_id).await?;
        AiReviewRepository::new(self.db)
            .find_for_profile(profile_id)
            .await?
            .ok_or_else(|| crate::error::not_found("No review has been generated for this profile"))
    }

    /// Writes a fresh review for the owner (or an administrator).
    #[instrument(skip(self, actor), fields(%profile_id, user_id = %actor.user_id))]
    pub async fn generate(
        &self,
        profile_id: Uuid,
        actor: &SessionClaims,
    ) -> Result<ai_review::Model, ApiError> {
        let profiles = ProfileRepository::new(self.db);
        let profile = profiles.get(profile_id).await?;
        ensure_can_edit(actor, &profile)?;

        let generator = self
            .generator
            .ok_or_else(|| service_unavailable("AI reviews are not configured"))?;

        let skills = profiles.skills(profile_id).await?;
        let repos = RepoRepository::new(self.db)
            .top_for_profile(profile_id, PROMPT_REPOS)
            .await?;
        let prompt = build_prompt(&profile, &skills, &repos);

        let content = match generator.generate(SYSTEM_PROMPT, &prompt).await {
            Ok(content) => content,
            Err(error) => {
                counter!("ai_reviews_total", "outcome" => "error").increment(1);
                return Err(error.into());
            }
        };

        let review = AiReviewRepository::new(self.db)
            .replace(profile_id, &content, generator.model())
            .await?;

        counter!("ai_reviews_total", "outcome" => "success").increment(1);
        info!(model = generator.model(), chars = content.len(), "AI review stored");
        Ok(review)
    }
}

/// User prompt describing the profile.
pub fn build_prompt(profile: &profile::Model, skills: &[String], repos: &[repo::Model]) -> String {
    let mut prompt = format!(
        "Developer: {} (@{})\n",
        profile.display_name, profile.username
    );

    if let Some(location) = &profile.location {
        prompt.push_str(&format!("Location: {}\n", location));
    }
    if !profile.bio.is_empty() {
        prompt.push_str(&format!("Bio: {}\n", profile.bio));
    }
    if skills.is_empty() {
        prompt.push_str("Skills: none listed\n");
    } else {
        prompt.push_str(&format!("Skills: {}\n", skills.join(", ")));
    }

    if repos.is_empty() {
        prompt.push_str("Repositories: none synced\n");
    } else {
        prompt.push_str("Top repositories:\n");
        for repo in repos {
            prompt.push_str(&format!(
                "- {} ({}, {} stars, {} forks)",
                repo.name,
                repo.primary_language.as_deref().unwrap_or("unknown language"),
                repo.stars,
                repo.forks
            ));
            if let Some(description) = repo.description.as_deref().filter(|d| !d.is_empty()) {
                prompt.push_str(&format!(": {}", description));
            }
            prompt.push('\n');
        }
    }

    prompt
}
