//! # AI Review Repository

use chrono::Utc;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set, sea_query::OnConflict,
};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::models::ai_review::{self, ActiveModel, Entity as AiReview, Model};

/// Repository for AIReview database operations
pub struct AiReviewRepository<'a, C: ConnectionTrait> {
    db: &'a C,
}

impl<'a, C: ConnectionTrait> AiReviewRepository<'a, C> {
    pub fn new(db: &'a C) -> Self {
        Self { db }
    }

    pub async fn find_for_profile(&self, profile_id: Uuid) -> Result<Option<Model>, RepositoryError> {
        Ok(AiReview::find()
            .filter(ai_review::Column::ProfileId.eq(profile_id))
            .one(self.db)
            .await?)
    }

    /// Stores `content` as the profile's review, replacing any previous one.
    pub async fn replace(
        &self,
        profile_id: Uuid,
        content: &str,
        model: &str,
    ) -> Result<Model, RepositoryError> {
        let now = Utc::now().fixed_offset();
        let row = ActiveModel {
            id: Set(Uuid::new_v4()),
            profile_id: Set(profile_id),
            content: Set(content.to_string()),
            model: Set(model.to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        AiReview::insert(row)
            .on_conflict(
                OnConflict::column(ai_review::Column::ProfileId)
                    .update_columns([
                        ai_review::Column::Content,
                        ai_review::Column::Model,
                        ai_review::Column::CreatedAt,
                        ai_review::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(self.db)
            .await?;

        self.find_for_profile(profile_id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("Review"))
    }
}
