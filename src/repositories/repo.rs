//! # Repo Repository
//!
//! Synced GitHub repositories. A sync replaces every row of a profile; this
//! repository never appends to an existing snapshot.

use chrono::{DateTime, Utc};
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
    sea_query::{Expr, Func},
};
use uuid::Uuid;

use super::{Page, PageRequest};
use crate::error::RepositoryError;
use crate::models::repo::{self, ActiveModel, Entity as Repo, Model};

/// A repository snapshot as fetched from GitHub.
#[derive(Debug, Clone, PartialEq)]
pub struct RepoSnapshot {
    pub github_id: i64,
    pub name: String,
    pub full_name: String,
    pub description: Option<String>,
    pub html_url: String,
    pub primary_language: Option<String>,
    pub languages: serde_json::Value,
    pub stars: i32,
    pub forks: i32,
    pub pushed_at: Option<DateTime<Utc>>,
}

/// Filters for the repo search endpoint.
#[derive(Debug, Clone, Default)]
pub struct RepoFilter {
    pub profile_id: Option<Uuid>,
    /// Case-insensitive primary language
    pub language: Option<String>,
}

/// Repository for Repo database operations
pub struct RepoRepository<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait + TransactionTrait> RepoRepository<'a, C> {
    /// Deletes all of the profile's repos and inserts `snapshots` in one transaction.
    pub async fn replace_for_profile(
        &self,
        profile_id: Uuid,
        snapshots: Vec<RepoSnapshot>,
    ) -> Result<u64, RepositoryError> {
        let txn = self.db.begin().await?;

        Repo::delete_many()
            .filter(repo::Column::ProfileId.eq(profile_id))
            .exec(&txn)
            .await?;

        let inserted = snapshots.len() as u64;
        if !snapshots.is_empty() {
            let now = Utc::now().fixed_offset();
            let rows = snapshots.into_iter().map(|snapshot| ActiveModel {
                id: Set(Uuid::new_v4()),
                profile_id: Set(profile_id),
                github_id: Set(snapshot.github_id),
                name: Set(snapshot.name),
                full_name: Set(snapshot.full_name),
                description: Set(snapshot.description),
                html_url: Set(snapshot.html_url),
                primary_language: Set(snapshot.primary_language),
                languages: Set(snapshot.languages),
                stars: Set(snapshot.stars),
                forks: Set(snapshot.forks),
                pushed_at: Set(snapshot.pushed_at.map(|at| at.fixed_offset())),
                created_at: Set(now),
            });

            Repo::insert_many(rows).exec_without_returning(&txn).await?;
        }

        txn.commit().await?;
        Ok(inserted)
    }
}

impl<'a, C: ConnectionTrait> RepoRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// All repos of a profile, most starred first.
    pub async fn list_for_profile(&self, profile_id: Uuid) -> Result<Vec<Model>, RepositoryError> {
        Ok(Repo::find()
            .filter(repo::Column::ProfileId.eq(profile_id))
            .order_by_desc(repo::Column::Stars)
            .order_by_asc(repo::Column::Name)
            .all(self.db)
            .await?)
    }

    /// The `limit` most starred repos of a profile.
    pub async fn top_for_profile(
        &self,
        profile_id: Uuid,
        limit: u64,
    ) -> Result<Vec<Model>, RepositoryError> {
        let page = Repo::find()
            .filter(repo::Column::ProfileId.eq(profile_id))
            .order_by_desc(repo::Column::Stars)
            .order_by_asc(repo::Column::Name)
            .paginate(self.db, limit.max(1))
            .fetch_page(0)
            .await?;
        Ok(page)
    }

    pub async fn search(
        &self,
        filter: &RepoFilter,
        page: PageRequest,
    ) -> Result<Page<Model>, RepositoryError> {
        let mut query = Repo::find();

        if let Some(profile_id) = filter.profile_id {
            query = query.filter(repo::Column::ProfileId.eq(profile_id));
        }
        if let Some(language) = filter.language.as_deref().map(str::trim).filter(|l| !l.is_empty()) {
            query = query.filter(
                Expr::expr(Func::lower(Expr::col(repo::Column::PrimaryLanguage)))
                    .eq(language.to_lowercase()),
            );
        }

        let paginator = query
            .order_by_desc(repo::Column::Stars)
            .order_by_asc(repo::Column::Id)
            .paginate(self.db, page.limit);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.index()).await?;

        Ok(Page {
            items,
            total,
            request: page,
        })
    }

    pub async fn count_for_profile(&self, profile_id: Uuid) -> Result<u64, RepositoryError> {
        Ok(Repo::find()
            .filter(repo::Column::ProfileId.eq(profile_id))
            .count(self.db)
            .await?)
    }
}
