//! # OAuth State Repository
//!
//! Persistence for the CSRF state of in-flight Google sign-ins.

use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::oauth_state::{self, ActiveModel, Entity as OAuthState, Model};

/// Repository for OAuth state database operations
pub struct OAuthStateRepository<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> OAuthStateRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn create(
        &self,
        state: &str,
        code_verifier: &str,
        redirect_to: Option<String>,
        ttl: Duration,
    ) -> Result<Model, RepositoryError> {
        let now = Utc::now().fixed_offset();

        ActiveModel {
            id: Set(Uuid::new_v4()),
            state: Set(state.to_string()),
            code_verifier: Set(code_verifier.to_string()),
            redirect_to: Set(redirect_to),
            expires_at: Set(now + ttl),
            created_at: Set(now),
        }
        .insert(self.db)
        .await
        .map_err(|e| RepositoryError::from_db("OAuth state", e))
    }

    /// Deletes the state row and returns it if it existed and had not expired.
    ///
    /// The row is removed even when expired, so a state can never be used twice.
    pub async fn consume(&self, state: &str) -> Result<Option<Model>, RepositoryError> {
        let Some(found) = OAuthState::find()
            .filter(oauth_state::Column::State.eq(state))
            .one(self.db)
            .await?
        else {
            return Ok(None);
        };

        let deleted = OAuthState::delete_by_id(found.id).exec(self.db).await?;
        // Lost a race with a concurrent callback for the same state
        if deleted.rows_affected == 0 {
            return Ok(None);
        }

        if found.is_expired(Utc::now().fixed_offset()) {
            return Ok(None);
        }
        Ok(Some(found))
    }

    /// Removes expired states and returns how many were deleted.
    pub async fn purge_expired(&self) -> Result<u64, RepositoryError> {
        let result = OAuthState::delete_many()
            .filter(oauth_state::Column::ExpiresAt.lte(Utc::now().fixed_offset()))
            .exec(self.db)
            .await?;
        Ok(result.rows_affected)
    }
}
