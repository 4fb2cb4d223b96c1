//! # Vouch Repository
//!
//! Vouch rows and the per-day action counters. The uniqueness of
//! `(profile_id, voucher_id)` and of `(voucher_id, day)` is enforced by the
//! database; this layer reports violations as `AlreadyExists`.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
    sea_query::{Expr, OnConflict},
};
use uuid::Uuid;

use super::{Page, PageRequest};
use crate::error::RepositoryError;
use crate::models::{
    user,
    vouch::{self, ActiveModel, Entity as Vouch, Model},
    vouch_action::{self, Entity as VouchAction},
};

/// Repository for Vouch and VouchAction database operations
pub struct VouchRepository<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> VouchRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn find(
        &self,
        profile_id: Uuid,
        voucher_id: Uuid,
    ) -> Result<Option<Model>, RepositoryError> {
        Ok(Vouch::find()
            .filter(vouch::Column::ProfileId.eq(profile_id))
            .filter(vouch::Column::VoucherId.eq(voucher_id))
            .one(self.db)
            .await?)
    }

    pub async fn insert(
        &self,
        profile_id: Uuid,
        voucher_id: Uuid,
        message: Option<String>,
    ) -> Result<Model, RepositoryError> {
        ActiveModel {
            id: Set(Uuid::new_v4()),
            profile_id: Set(profile_id),
            voucher_id: Set(voucher_id),
            message: Set(message),
            created_at: Set(Utc::now().fixed_offset()),
        }
        .insert(self.db)
        .await
        .map_err(|e| RepositoryError::from_db("Vouch", e))
    }

    /// Removes the voucher's vouch on the profile; returns false when none existed.
    pub async fn delete(&self, profile_id: Uuid, voucher_id: Uuid) -> Result<bool, RepositoryError> {
        let result = Vouch::delete_many()
            .filter(vouch::Column::ProfileId.eq(profile_id))
            .filter(vouch::Column::VoucherId.eq(voucher_id))
            .exec(self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    pub async fn count_for_profile(&self, profile_id: Uuid) -> Result<u64, RepositoryError> {
        Ok(Vouch::find()
            .filter(vouch::Column::ProfileId.eq(profile_id))
            .count(self.db)
            .await?)
    }

    /// Vouch counts for several profiles; profiles without vouches are absent.
    pub async fn counts_for(
        &self,
        profile_ids: &[Uuid],
    ) -> Result<HashMap<Uuid, u64>, RepositoryError> {
        if profile_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(Uuid, i64)> = Vouch::find()
            .select_only()
            .column(vouch::Column::ProfileId)
            .column_as(Expr::col(vouch::Column::Id).count(), "count")
            .filter(vouch::Column::ProfileId.is_in(profile_ids.iter().copied()))
            .group_by(vouch::Column::ProfileId)
            .into_tuple()
            .all(self.db)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(id, count)| (id, count.max(0) as u64))
            .collect())
    }

    /// Vouches received by a profile with their voucher, newest first.
    pub async fn list_for_profile(
        &self,
        profile_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<(Model, Option<user::Model>)>, RepositoryError> {
        let paginator = Vouch::find()
            .filter(vouch::Column::ProfileId.eq(profile_id))
            .find_also_related(user::Entity)
            .order_by_desc(vouch::Column::CreatedAt)
            .order_by_asc(vouch::Column::Id)
            .paginate(self.db, page.limit);

        let total = paginator.num_items().await?;
        let items = paginator.fetch_page(page.index()).await?;

        Ok(Page {
            items,
            total,
            request: page,
        })
    }

    /// Atomically increments the voucher's counter for `day` and returns the new value.
    ///
    /// Uses `INSERT .. ON CONFLICT (voucher_id, day) DO UPDATE SET count = count + 1`
    /// so concurrent actions never lose an increment.
    pub async fn increment_daily_actions(
        &self,
        voucher_id: Uuid,
        day: NaiveDate,
    ) -> Result<i32, RepositoryError> {
        let row = vouch_action::ActiveModel {
            id: Set(Uuid::new_v4()),
            voucher_id: Set(voucher_id),
            day: Set(day),
            count: Set(1),
        };

        VouchAction::insert(row)
            .on_conflict(
                OnConflict::columns([vouch_action::Column::VoucherId, vouch_action::Column::Day])
                    .value(
                        vouch_action::Column::Count,
                        Expr::col((VouchAction, vouch_action::Column::Count)).add(1),
                    )
                    .to_owned(),
            )
            .exec_without_returning(self.db)
            .await?;

        self.daily_actions(voucher_id, day).await
    }

    /// Actions the voucher has performed on `day` (0 when none).
    pub async fn daily_actions(
        &self,
        voucher_id: Uuid,
        day: NaiveDate,
    ) -> Result<i32, RepositoryError> {
        let row = VouchAction::find()
            .filter(vouch_action::Column::VoucherId.eq(voucher_id))
            .filter(vouch_action::Column::Day.eq(day))
            .one(self.db)
            .await?;
        Ok(row.map(|r| r.count).unwrap_or(0))
    }
}
