//! # Vouch Service
//!
//! Giving and withdrawing vouches. Each call runs in one transaction:
//!
//! 1. the profile must exist (404)
//! 2. the voucher must not own it (400 `SELF_VOUCH`)
//! 3. the pair must not already exist when vouching, and must exist when withdrawing
//! 4. the voucher's counter for the current UTC day is incremented atomically;
//!    a value above the limit aborts the transaction, so the rejected attempt
//!    is never counted (429)
//! 5. the vouch row is inserted or deleted
//!
//! A concurrent duplicate that slips past step 3 is caught by the unique index
//! on `(profile_id, voucher_id)` and reported as a conflict.

use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use metrics::counter;
use sea_orm::{DatabaseConnection, DbErr, TransactionTrait};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::{
    ApiError, RepositoryError, daily_limit_exceeded, next_utc_midnight, not_found, unauthorized,
};
use crate::models::{user, vouch};
use crate::repositories::{Page, PageRequest, ProfileRepository, UserRepository, VouchRepository};

/// Vouching failures, each with a fixed HTTP mapping.
#[derive(Debug, Error)]
pub enum VouchError {
    #[error("Profile not found")]
    ProfileNotFound,

    #[error("Voucher account no longer exists")]
    UnknownVoucher,

    #[error("You cannot vouch for your own profile")]
    SelfVouch,

    #[error("You have already vouched for this profile")]
    AlreadyVouched,

    #[error("You have not vouched for this profile")]
    NotVouched,

    #[error("Daily vouch limit of {limit} reached")]
    DailyLimitExceeded { limit: u32 },

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<DbErr> for VouchError {
    fn from(error: DbErr) -> Self {
        VouchError::Repository(RepositoryError::Database(error))
    }
}

impl From<VouchError> for ApiError {
    fn from(error: VouchError) -> Self {
        match error {
            VouchError::ProfileNotFound => not_found("Profile not found"),
            VouchError::UnknownVoucher => unauthorized(Some("Voucher account no longer exists")),
            VouchError::SelfVouch => ApiError::new(
                StatusCode::BAD_REQUEST,
                "SELF_VOUCH",
                VouchError::SelfVouch.to_string(),
            ),
            VouchError::AlreadyVouched => ApiError::new(
                StatusCode::CONFLICT,
                "CONFLICT",
                VouchError::AlreadyVouched.to_string(),
            ),
            VouchError::NotVouched => not_found("You have not vouched for this profile"),
            VouchError::DailyLimitExceeded { limit } => daily_limit_exceeded(limit, Utc::now()),
            VouchError::Repository(inner) => inner.into(),
        }
    }
}

/// The caller's vouch allowance for the current UTC day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct VouchQuota {
    pub limit: u32,
    pub used: u32,
    pub remaining: u32,
    /// Next UTC midnight
    pub resets_at: DateTime<Utc>,
}

pub struct VouchService<'a> {
    db: &'a DatabaseConnection,
    daily_limit: u32,
}

impl<'a> VouchService<'a> {
    pub fn new(db: &'a DatabaseConnection, daily_limit: u32) -> Self {
        Self { db, daily_limit }
    }

    pub async fn vouch(
        &self,
        profile_id: Uuid,
        voucher_id: Uuid,
        message: Option<String>,
    ) -> Result<vouch::Model, VouchError> {
        self.vouch_at(profile_id, voucher_id, message, Utc::now())
            .await
    }

    /// Records a vouch as of `now`; the UTC date of `now` selects the daily counter.
    #[instrument(skip(self, message), fields(%profile_id, %voucher_id))]
    pub async fn vouch_at(
        &self,
        profile_id: Uuid,
        voucher_id: Uuid,
        message: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<vouch::Model, VouchError> {
        let txn = self.db.begin().await?;
        let vouches = VouchRepository::new(&txn);

        self.check_target(&txn, profile_id, voucher_id).await?;

        if vouches.find(profile_id, voucher_id).await?.is_some() {
            return Err(VouchError::AlreadyVouched);
        }

        self.count_action(&vouches, voucher_id, now).await?;

        let created = match vouches.insert(profile_id, voucher_id, message).await {
            Ok(created) => created,
            Err(RepositoryError::AlreadyExists { .. }) => {
                counter!("vouch_rejected_total", "reason" => "duplicate").increment(1);
                return Err(VouchError::AlreadyVouched);
            }
            Err(other) => return Err(other.into()),
        };

        txn.commit().await?;

        counter!("vouches_created_total").increment(1);
        info!(vouch_id = %created.id, "Vouch recorded");
        Ok(created)
    }

    pub async fn unvouch(&self, profile_id: Uuid, voucher_id: Uuid) -> Result<(), VouchError> {
        self.unvouch_at(profile_id, voucher_id, Utc::now()).await
    }

    /// Withdraws the voucher's vouch; withdrawing counts against the daily limit.
    #[instrument(skip(self), fields(%profile_id, %voucher_id))]
    pub async fn unvouch_at(
        &self,
        profile_id: Uuid,
        voucher_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), VouchError> {
        let txn = self.db.begin().await?;
        let vouches = VouchRepository::new(&txn);

        if ProfileRepository::new(&txn)
            .find_by_id(profile_id)
            .await?
            .is_none()
        {
            return Err(VouchError::ProfileNotFound);
        }

        if vouches.find(profile_id, voucher_id).await?.is_none() {
            return Err(VouchError::NotVouched);
        }

        self.count_action(&vouches, voucher_id, now).await?;

        // Lost a race with a concurrent withdrawal
        if !vouches.delete(profile_id, voucher_id).await? {
            return Err(VouchError::NotVouched);
        }

        txn.commit().await?;

        counter!("vouches_withdrawn_total").increment(1);
        info!("Vouch withdrawn");
        Ok(())
    }

    pub async fn quota(&self, voucher_id: Uuid) -> Result<VouchQuota, VouchError> {
        self.quota_at(voucher_id, Utc::now()).await
    }

    pub async fn quota_at(
        &self,
        voucher_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<VouchQuota, VouchError> {
        let used = VouchRepository::new(self.db)
            .daily_actions(voucher_id, now.date_naive())
            .await?
            .max(0) as u32;
        // A counter can sit above the limit only if the limit was lowered mid-day
        let used = used.min(self.daily_limit);

        Ok(VouchQuota {
            limit: self.daily_limit,
            used,
            remaining: self.daily_limit - used,
            resets_at: next_utc_midnight(now),
        })
    }

    /// Vouches received by a profile with their voucher, newest first.
    pub async fn list(
        &self,
        profile_id: Uuid,
        page: PageRequest,
    ) -> Result<Page<(vouch::Model, Option<user::Model>)>, VouchError> {
        if ProfileRepository::new(self.db)
            .find_by_id(profile_id)
            .await?
            .is_none()
        {
            return Err(VouchError::ProfileNotFound);
        }
        Ok(VouchRepository::new(self.db)
            .list_for_profile(profile_id, page)
            .await?)
    }

    async fn check_target<C: sea_orm::ConnectionTrait>(
        &self,
        conn: &C,
        profile_id: Uuid,
        voucher_id: Uuid,
    ) -> Result<(), VouchError> {
        let profile = ProfileRepository::new(conn)
            .find_by_id(profile_id)
            .await?
            .ok_or(VouchError::ProfileNotFound)?;

        if profile.user_id == voucher_id {
            counter!("vouch_rejected_total", "reason" => "self").increment(1);
            return Err(VouchError::SelfVouch);
        }

        if UserRepository::new(conn)
            .find_by_id(voucher_id)
            .await?
            .is_none()
        {
            return Err(VouchError::UnknownVoucher);
        }
        Ok(())
    }

    async fn count_action<C: sea_orm::ConnectionTrait>(
        &self,
        vouches: &VouchRepository<'_, C>,
        voucher_id: Uuid,
        now: DateTime<Utc>,
    ) -> Result<(), VouchError> {
        let used = vouches
            .increment_daily_actions(voucher_id, now.date_naive())
            .await?;

        if used as i64 > self.daily_limit as i64 {
            counter!("vouch_rejected_total", "reason" => "daily_limit").increment(1);
            info!(%voucher_id, used, limit = self.daily_limit, "Daily vouch limit reached");
            return Err(VouchError::DailyLimitExceeded {
                limit: self.daily_limit,
            });
        }
        Ok(())
    }
}
