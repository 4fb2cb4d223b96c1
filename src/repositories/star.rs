//! # Star Repository
//!
//! Anonymous stars, one per `(profile_id, ip_hash)`.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, QuerySelect, Set,
    sea_query::{Expr, OnConflict},
};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::star::{self, ActiveModel, Entity as Star};

/// Repository for Star database operations
pub struct StarRepository<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> StarRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    /// Adds a star; a repeated star from the same hash is a no-op.
    ///
    /// Returns true when a new row was written.
    pub async fn add(&self, profile_id: Uuid, ip_hash: &str) -> Result<bool, RepositoryError> {
        let row = ActiveModel {
            id: Set(Uuid::new_v4()),
            profile_id: Set(profile_id),
            ip_hash: Set(ip_hash.to_string()),
            created_at: Set(Utc::now().fixed_offset()),
        };

        let inserted = Star::insert(row)
            .on_conflict(
                OnConflict::columns([star::Column::ProfileId, star::Column::IpHash])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.db)
            .await?;

        Ok(inserted > 0)
    }

    /// Removes a star; returns false when there was nothing to remove.
    pub async fn remove(&self, profile_id: Uuid, ip_hash: &str) -> Result<bool, RepositoryError> {
        let result = Star::delete_many()
            .filter(star::Column::ProfileId.eq(profile_id))
            .filter(star::Column::IpHash.eq(ip_hash))
            .exec(self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn exists(&self, profile_id: Uuid, ip_hash: &str) -> Result<bool, RepositoryError> {
        let count = Star::find()
            .filter(star::Column::ProfileId.eq(profile_id))
            .filter(star::Column::IpHash.eq(ip_hash))
            .count(self.db)
            .await?;
        Ok(count > 0)
    }

    pub async fn count_for_profile(&self, profile_id: Uuid) -> Result<u64, RepositoryError> {
        Ok(Star::find()
            .filter(star::Column::ProfileId.eq(profile_id))
            .count(self.db)
            .await?)
    }

    /// Star counts for several profiles; profiles without stars are absent.
    pub async fn counts_for(
        &self,
        profile_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, u64>, RepositoryError> {
        if profile_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(Uuid, i64)> = Star::find()
            .select_only()
            .column(star::Column::ProfileId)
            .column_as(Expr::col(star::Column::Id).count(), "count")
            .filter(star::Column::ProfileId.is_in(profile_ids.iter().copied()))
            .group_by(star::Column::ProfileId)
            .into_tuple()
            .all(self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(id, count)| (id, count.max(0) as u64))
            .collect())
    }
}
