//! # User Repository
//!
//! CRUD operations for users, plus the sign-in upsert keyed on the Google subject.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
    sea_query::{Expr, Func, LikeExpr},
};
use uuid::Uuid;

use super::{Page, PageRequest, like_pattern};
use crate::error::RepositoryError;
use crate::models::user::{self, ActiveModel, Entity as User, Model, ROLE_ADMIN, ROLE_USER};

/// Identity returned by the Google userinfo endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleIdentity {
    pub subject: String,
    pub email: String,
    pub name: String,
    pub picture: Option<String>,
}

/// Fields a user may change on their own account.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    /// `Some(None)` clears the avatar
    pub avatar_url: Option<Option<String>>,
}

/// Repository for User database operations
pub struct UserRepository<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> UserRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<Model>, RepositoryError> {
        Ok(User::find_by_id(id).one(self.db).await?)
    }

    pub async fn get(&self, id: Uuid) -> Result<Model, RepositoryError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("User"))
    }

    pub async fn find_by_google_id(&self, google_id: &str) -> Result<Option<Model>, RepositoryError> {
        Ok(User::find()
            .filter(user::Column::GoogleId.eq(google_id))
            .one(self.db)
            .await?)
    }

    /// Creates or refreshes the user behind a Google identity.
    ///
    /// Profile fields are refreshed from Google on every sign-in. Users listed
    /// as administrators are promoted; existing admins are never demoted here.
    pub async fn upsert_from_google(
        &self,
        identity: &GoogleIdentity,
        is_admin: bool,
    ) -> Result<Model, RepositoryError> {
        let now = Utc::now().fixed_offset();

        match self.find_by_google_id(&identity.subject).await? {
            Some(existing) => {
                let promote = is_admin && !existing.is_admin();
                let mut active = existing.into_active_model();
                active.email = Set(identity.email.clone());
                active.name = Set(identity.name.clone());
                active.avatar_url = Set(identity.picture.clone());
                if promote {
                    active.role = Set(ROLE_ADMIN.to_string());
                }
                active.updated_at = Set(now);
                active
                    .update(self.db)
                    .await
                    .map_err(|e| RepositoryError::from_db("User", e))
            }
            None => {
                let role = if is_admin { ROLE_ADMIN } else { ROLE_USER };
                ActiveModel {
                    id: Set(Uuid::new_v4()),
                    google_id: Set(identity.subject.clone()),
                    email: Set(identity.email.clone()),
                    name: Set(identity.name.clone()),
                    avatar_url: Set(identity.picture.clone()),
                    role: Set(role.to_string()),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(self.db)
                .await
                .map_err(|e| RepositoryError::from_db("User", e))
            }
        }
    }

    /// Lists users newest first, optionally filtered by a name/email substring.
    pub async fn list(
        &self,
        search: Option<&str>,
        page: PageRequest,
    ) -> Result<Page<Model>, RepositoryError> {
        let mut query = User::find();

        if let Some(term) = search.map(str::trim).filter(|t| !t.is_empty()) {
            let pattern = like_pattern(term);
            query = query.filter(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col(user::Column::Name)))
                            .like(LikeExpr::new(pattern.clone()).escape('\\')),
                    )
                    .add(
                        Expr::expr(Func::lower(Expr::col(user::Column::Email)))
                            .like(LikeExpr::new(pattern).escape('\\')),
                    ),
            );
        }

        let paginator = query
            .order_by_desc(user::Column::CreatedAt)
            .order_by_asc(user::Column::Id)
            .paginate(self.db, page.limit);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.index()).await?;

        Ok(Page {
            items,
            total,
            request: page,
        })
    }

    pub async fn update(&self, id: Uuid, changes: UserChanges) -> Result<Model, RepositoryError> {
        let mut active = self.get(id).await?.into_active_model();

        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(avatar_url) = changes.avatar_url {
            active.avatar_url = Set(avatar_url);
        }
        active.updated_at = Set(Utc::now().fixed_offset());

        Ok(active.update(self.db).await?)
    }

    /// Deletes a user; the profile, vouches given and counters cascade.
    pub async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = User::delete_by_id(id).exec(self.db).await?;
        if result.rows_affected == 0 {
            return Err(RepositoryError::not_found("User"));
        }
        Ok(())
    }
}
