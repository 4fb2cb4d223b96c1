//! # Profile Repository
//!
//! Profiles and their ordered skill lists. Skill rows are always replaced as a
//! whole; callers wrap multi-statement writes in a transaction.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
    sea_query::{Expr, Func, LikeExpr, Query},
};
use uuid::Uuid;

use super::{Page, PageRequest, like_pattern};
use crate::error::RepositoryError;
use crate::models::{
    profile::{self, ActiveModel, Entity as Profile, Model},
    profile_skill::{self, Entity as ProfileSkill},
};

/// Validated data for a new profile.
#[derive(Debug, Clone)]
pub struct NewProfile {
    pub user_id: Uuid,
    pub username: String,
    pub display_name: String,
    pub bio: String,
    pub github_username: Option<String>,
    pub avatar_url: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
}

/// Partial update; `None` leaves a field untouched, `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub username: Option<String>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub github_username: Option<Option<String>>,
    pub avatar_url: Option<Option<String>>,
    pub location: Option<Option<String>>,
    pub website: Option<Option<String>>,
}

impl ProfileChanges {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.display_name.is_none()
            && self.bio.is_none()
            && self.github_username.is_none()
            && self.avatar_url.is_none()
            && self.location.is_none()
            && self.website.is_none()
    }
}

/// Filters for the public profile directory.
#[derive(Debug, Clone, Default)]
pub struct ProfileFilter {
    /// Substring over username, display name and bio
    pub search: Option<String>,
    /// Exact, case-insensitive skill
    pub skill: Option<String>,
}

/// Repository for Profile database operations
pub struct ProfileRepository<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> ProfileRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn create(&self, new: NewProfile) -> Result<Model, RepositoryError> {
        let now = Utc::now().fixed_offset();

        ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(new.user_id),
            username: Set(new.username),
            display_name: Set(new.display_name),
            bio: Set(new.bio),
            github_username: Set(new.github_username),
            avatar_url: Set(new.avatar_url),
            location: Set(new.location),
            website: Set(new.website),
            last_synced_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db)
        .await
        .map_err(|e| RepositoryError::from_db("Profile", e))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Model>, RepositoryError> {
        Ok(Profile::find_by_id(id).one(self.db).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<Model, RepositoryError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Profile"))
    }

    pub async fn find_by_user_id(&self, user_id: Uuid) -> Result<Option<Model>, RepositoryError> {
        Ok(Profile::find()
            .filter(profile::Column::UserId.eq(user_id))
            .one(self.db)
            .await?)
    }

    pub async fn find_by_username(&self, username: &str) -> Result<Option<Model>, RepositoryError> {
        Ok(Profile::find()
            .filter(profile::Column::Username.eq(username.trim().to_lowercase()))
            .one(self.db)
            .await?)
    }

    pub async fn username_taken(
        &self,
        username: &str,
        except: Option<Uuid>,
    ) -> Result<bool, RepositoryError> {
        let mut query = Profile::find().filter(profile::Column::Username.eq(username));
        if let Some(id) = except {
            query = query.filter(profile::Column::Id.ne(id));
        }
        Ok(query.count(self.db).await? > 0)
    }

    /// Lists profiles newest first.
    pub async fn list(
        &self,
        filter: &ProfileFilter,
        page: PageRequest,
    ) -> Result<Page<Model>, RepositoryError> {
        let mut query = Profile::find();

        if let Some(term) = filter.search.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = like_pattern(term);
            let lower_like = |column: profile::Column| {
                Expr::expr(Func::lower(Expr::col((profile::Entity, column))))
                    .like(LikeExpr::new(pattern.clone()).escape('\\'))
            };
            query = query.filter(
                Condition::any()
                    .add(lower_like(profile::Column::Username))
                    .add(lower_like(profile::Column::DisplayName))
                    .add(lower_like(profile::Column::Bio)),
            );
        }

        if let Some(skill) = filter.skill.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            query = query.filter(
                profile::Column::Id.in_subquery(
                    Query::select()
                        .column(profile_skill::Column::ProfileId)
                        .from(profile_skill::Entity)
                        .and_where(profile_skill::Column::NameKey.eq(skill.to_lowercase()))
                        .to_owned(),
                ),
            );
        }

        let paginator = query
            .order_by_desc(profile::Column::CreatedAt)
            .order_by_asc(profile::Column::Id)
            .paginate(self.db, page.limit);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.index()).await?;

        Ok(Page {
            items,
            total,
            request: page,
        })
    }

    pub async fn update(&self, id: Uuid, changes: ProfileChanges) -> Result<Model, RepositoryError> {
        let mut active = self.get(id).await?.into_active_model();

        if let Some(username) = changes.username {
            active.username = Set(username);
        }
        if let Some(display_name) = changes.display_name {
            active.display_name = Set(display_name);
        }
        if let Some(bio) = changes.bio {
            active.bio = Set(bio);
        }
        if let Some(github_username) = changes.github_username {
            active.github_username = Set(github_username);
        }
        if let Some(avatar_url) = changes.avatar_url {
            active.avatar_url = Set(avatar_url);
        }
        if let Some(location) = changes.location {
            active.location = Set(location);
        }
        if let Some(website) = changes.website {
            active.website = Set(website);
        }
        active.updated_at = Set(Utc::now().fixed_offset());

        active
            .update(self.db)
            .await
            .map_err(|e| RepositoryError::from_db("Profile", e))
    }

    pub async fn set_avatar_url(
        &self,
        id: Uuid,
        avatar_url: Option<String>,
    ) -> Result<Model, RepositoryError> {
        self.update(
            id,
            ProfileChanges {
                avatar_url: Some(avatar_url),
                ..Default::default()
            },
        )
        .await
    }

    pub async fn mark_synced(&self, id: Uuid) -> Result<Model, RepositoryError> {
        let mut active = self.get(id).await?.into_active_model();
        let now = Utc::now().fixed_offset();
        active.last_synced_at = Set(Some(now));
        active.updated_at = Set(now);
        Ok(active.update(self.db).await?)
    }

    /// Deletes a profile; repos, skills, vouches, stars and the review cascade.
    pub async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = Profile::delete_by_id(id).exec(self.db).await?;
        if result.rows_affected == 0 {
            return Err(RepositoryError::not_found("Profile"));
        }
        Ok(())
    }

    /// Replaces the profile's skills with `skills`, preserving order.
    pub async fn replace_skills(
        &self,
        profile_id: Uuid,
        skills: &[String],
    ) -> Result<(), RepositoryError> {
        ProfileSkill::delete_many()
            .filter(profile_skill::Column::ProfileId.eq(profile_id))
            .exec(self.db)
            .await?;

        if skills.is_empty() {
            return Ok(());
        }

        let rows = skills
            .iter()
            .enumerate()
            .map(|(position, name)| profile_skill::ActiveModel {
                id: Set(Uuid::new_v4()),
                profile_id: Set(profile_id),
                position: Set(position as i32),
                name: Set(name.clone()),
                name_key: Set(name.to_lowercase()),
            });

        ProfileSkill::insert_many(rows)
            .exec_without_returning(self.db)
            .await
            .map_err(|e| RepositoryError::from_db("Skill", e))?;

        Ok(())
    }

    pub async fn skills(&self, profile_id: Uuid) -> Result<Vec<String>, RepositoryError> {
        let rows = ProfileSkill::find()
            .filter(profile_skill::Column::ProfileId.eq(profile_id))
            .order_by_asc(profile_skill::Column::Position)
            .all(self.db)
            .await?;

        Ok(rows.into_iter().map(|row| row.name).collect())
    }

    /// Skills for several profiles at once, keyed by profile id.
    pub async fn skills_for(
        &self,
        profile_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, Vec<String>>, RepositoryError> {
        let mut by_profile: HashMap<Uuid, Vec<String>> = HashMap::new();
        if profile_ids.is_empty() {
            return Ok(by_profile);
        }

        let rows = ProfileSkill::find()
            .filter(profile_skill::Column::ProfileId.is_in(profile_ids.iter().copied()))
            .order_by_asc(profile_skill::Column::ProfileId)
            .order_by_asc(profile_skill::Column::Position)
            .all(self.db)
            .await?;

        for row in rows {
            by_profile.entry(row.profile_id).or_default().push(row.name);
        }
        Ok(by_profile)
    }
}
