//! # Profile Service
//!
//! Profile CRUD with validation, ownership checks and the read model that
//! bundles skills, vouch count and star count with each profile.

use std::collections::HashMap;

use sea_orm::{ConnectionTrait, DatabaseConnection, TransactionTrait};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::SessionClaims;
use crate::error::{ApiError, RepositoryError, forbidden};
use crate::models::profile;
use crate::repositories::{
    NewProfile, Page, PageRequest, ProfileChanges, ProfileFilter, ProfileRepository,
    StarRepository, VouchRepository,
};
use crate::validation::{
    normalize_skills, normalize_username, validate_bio, validate_display_name,
    validate_github_username, validate_location, validate_url,
};

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
pub(crate) fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// Body of `POST /api/profiles`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct CreateProfileRequest {
    #[schema(example = "ada-lovelace")]
    pub username: String,
    #[schema(example = "Ada Lovelace")]
    pub display_name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub skills: Vec<String>,
    pub github_username: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
}

/// Body of `PUT /api/profiles/{id}`; omitted fields are left unchanged and
/// `null` clears an optional field.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct UpdateProfileRequest {
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    /// Replaces the whole skill list
    pub skills: Option<Vec<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub github_username: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub location: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub website: Option<Option<String>>,
}

/// A profile as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ProfileDetails {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub display_name: String,
    pub bio: String,
    pub skills: Vec<String>,
    pub github_username: Option<String>,
    pub avatar_url: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub vouch_count: u64,
    pub star_count: u64,
    pub last_synced_at: Option<chrono::DateTime<chrono::Utc>>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl ProfileDetails {
    pub fn assemble(
        profile: profile::Model,
        skills: Vec<String>,
        vouch_count: u64,
        star_count: u64,
    ) -> Self {
        Self {
            id: profile.id,
            user_id: profile.user_id,
            username: profile.username,
            display_name: profile.display_name,
            bio: profile.bio,
            skills,
            github_username: profile.github_username,
            avatar_url: profile.avatar_url,
            location: profile.location,
            website: profile.website,
            vouch_count,
            star_count,
            last_synced_at: profile.last_synced_at.map(|at| at.to_utc()),
            created_at: profile.created_at.to_utc(),
            updated_at: profile.updated_at.to_utc(),
        }
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn validate_optional(
    value: Option<String>,
    validate: impl Fn(&str) -> Result<String, crate::validation::FieldError>,
) -> Result<Option<String>, ApiError> {
    blank_to_none(value)
        .map(|v| validate(&v))
        .transpose()
        .map_err(ApiError::from)
}

impl CreateProfileRequest {
    /// Validates the request into repository input plus the normalized skills.
    pub fn validate(self, user_id: Uuid) -> Result<(NewProfile, Vec<String>), ApiError> {
        let new = NewProfile {
            user_id,
            username: normalize_username(&self.username)?,
            display_name: validate_display_name(&self.display_name)?,
            bio: validate_bio(&self.bio)?,
            github_username: validate_optional(self.github_username, validate_github_username)?,
            avatar_url: None,
            location: validate_optional(self.location, validate_location)?,
            website: validate_optional(self.website, |v: &str| validate_url("website", v))?,
        };
        Ok((new, normalize_skills(&self.skills)?))
    }
}

impl UpdateProfileRequest {
    pub fn validate(self) -> Result<(ProfileChanges, Option<Vec<String>>), ApiError> {
        let nullable = |value: Option<Option<String>>,
                        validate: &dyn Fn(&str) -> Result<String, crate::validation::FieldError>|
         -> Result<Option<Option<String>>, ApiError> {
            value
                .map(|inner| validate_optional(inner, validate))
                .transpose()
        };

        let changes = ProfileChanges {
            username: self
                .username
                .map(|u| normalize_username(&u))
                .transpose()?,
            display_name: self
                .display_name
                .map(|d| validate_display_name(&d))
                .transpose()?,
            bio: self.bio.map(|b| validate_bio(&b)).transpose()?,
            github_username: nullable(self.github_username, &validate_github_username)?,
            avatar_url: None,
            location: nullable(self.location, &validate_location)?,
            website: nullable(self.website, &|v: &str| validate_url("website", v))?,
        };
        let skills = self.skills.map(|s| normalize_skills(&s)).transpose()?;
        Ok((changes, skills))
    }
}

/// Loads the skills and counters for a single profile.
pub async fn load_details<C: ConnectionTrait>(
    db: &C,
    profile: profile::Model,
) -> Result<ProfileDetails, RepositoryError> {
    let skills = ProfileRepository::new(db).skills(profile.id).await?;
    let vouch_count = VouchRepository::new(db).count_for_profile(profile.id).await?;
    let star_count = StarRepository::new(db).count_for_profile(profile.id).await?;
    Ok(ProfileDetails::assemble(
        profile,
        skills,
        vouch_count,
        star_count,
    ))
}

async fn load_many<C: ConnectionTrait>(
    db: &C,
    profiles: Vec<profile::Model>,
) -> Result<Vec<ProfileDetails>, RepositoryError> {
    let ids: Vec<Uuid> = profiles.iter().map(|p| p.id).collect();
    let mut skills = ProfileRepository::new(db).skills_for(&ids).await?;
    let vouches = VouchRepository::new(db).counts_for(&ids).await?;
    let stars = StarRepository::new(db).counts_for(&ids).await?;

    Ok(profiles
        .into_iter()
        .map(|profile| {
            let id = profile.id;
            ProfileDetails::assemble(
                profile,
                skills.remove(&id).unwrap_or_default(),
                count(&vouches, id),
                count(&stars, id),
            )
        })
        .collect())
}

fn count(counts: &HashMap<Uuid, u64>, id: Uuid) -> u64 {
    counts.get(&id).copied().unwrap_or(0)
}

pub struct ProfileService<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> ProfileService<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates the caller's profile. A second profile or a taken username is a conflict.
    #[instrument(skip(self, request), fields(%user_id))]
    pub async fn create(
        &self,
        user_id: Uuid,
        request: CreateProfileRequest,
    ) -> Result<ProfileDetails, ApiError> {
        let (new, skills) = request.validate(user_id)?;
        self.create_validated(new, skills).await
    }

    pub(crate) async fn create_validated(
        &self,
        new: NewProfile,
        skills: Vec<String>,
    ) -> Result<ProfileDetails, ApiError> {
        let txn = self.db.begin().await?;
        let profiles = ProfileRepository::new(&txn);

        if profiles.find_by_user_id(new.user_id).await?.is_some() {
            return Err(ApiError::new(
                axum::http::StatusCode::CONFLICT,
                "CONFLICT",
                "You already have a profile",
            ));
        }
        if profiles.username_taken(&new.username, None).await? {
            return Err(username_taken());
        }

        let created = profiles.create(new).await?;
        profiles.replace_skills(created.id, &skills).await?;
        txn.commit().await?;

        info!(profile_id = %created.id, username = %created.username, "Profile created");
        Ok(ProfileDetails::assemble(created, skills, 0, 0))
    }

    pub async fn get(&self, id: Uuid) -> Result<ProfileDetails, ApiError> {
        let profile = ProfileRepository::new(self.db).get(id).await?;
        Ok(load_details(self.db, profile).await?)
    }

    pub async fn get_by_username(&self, username: &str) -> Result<ProfileDetails, ApiError> {
        let profile = ProfileRepository::new(self.db)
            .find_by_username(username)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Profile"))?;
        Ok(load_details(self.db, profile).await?)
    }

    pub async fn find_for_user(&self, user_id: Uuid) -> Result<Option<profile::Model>, ApiError> {
        Ok(ProfileRepository::new(self.db)
            .find_by_user_id(user_id)
            .await?)
    }

    pub async fn list(
        &self,
        filter: &ProfileFilter,
        page: PageRequest,
    ) -> Result<Page<ProfileDetails>, ApiError> {
        let page = ProfileRepository::new(self.db).list(filter, page).await?;
        let items = load_many(self.db, page.items).await?;
        Ok(Page {
            items,
            total: page.total,
            request: page.request,
        })
    }

    /// Applies a partial update for the owner or an administrator.
    #[instrument(skip(self, actor, request), fields(user_id = %actor.user_id))]
    pub async fn update(
        &self,
        id: Uuid,
        actor: &SessionClaims,
        request: UpdateProfileRequest,
    ) -> Result<ProfileDetails, ApiError> {
        let (changes, skills) = request.validate()?;
        self.update_validated(id, actor, changes, skills).await
    }

    pub(crate) async fn update_validated(
        &self,
        id: Uuid,
        actor: &SessionClaims,
        changes: ProfileChanges,
        skills: Option<Vec<String>>,
    ) -> Result<ProfileDetails, ApiError> {
        let txn = self.db.begin().await?;
        let profiles = ProfileRepository::new(&txn);

        let existing = profiles.get(id).await?;
        ensure_can_edit(actor, &existing)?;

        if let Some(username) = &changes.username
            && profiles.username_taken(username, Some(id)).await?
        {
            return Err(username_taken());
        }

        let updated = if changes.is_empty() {
            existing
        } else {
            profiles.update(id, changes).await?
        };
        if let Some(skills) = skills {
            profiles.replace_skills(id, &skills).await?;
        }

        let details = load_details(&txn, updated).await?;
        txn.commit().await?;
        Ok(details)
    }

    /// Deletes a profile for the owner or an administrator.
    pub async fn delete(&self, id: Uuid, actor: &SessionClaims) -> Result<(), ApiError> {
        let profiles = ProfileRepository::new(self.db);
        let existing = profiles.get(id).await?;
        ensure_can_edit(actor, &existing)?;

        profiles.delete(id).await?;
        info!(profile_id = %id, deleted_by = %actor.user_id, "Profile deleted");
        Ok(())
    }
}

/// Only the owner or an administrator may modify a profile.
pub fn ensure_can_edit(actor: &SessionClaims, profile: &profile::Model) -> Result<(), ApiError> {
    if actor.can_act_for(profile.user_id) {
        Ok(())
    } else {
        Err(forbidden(Some("You can only modify your own profile")))
    }
}

fn username_taken() -> ApiError {
    ApiError::new(
        axum::http::StatusCode::CONFLICT,
        "CONFLICT",
        "Username is already taken",
    )
}
