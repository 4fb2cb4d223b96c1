//! Migration to create the ai_reviews table.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AiReviews::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AiReviews::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AiReviews::ProfileId).uuid().not_null())
                    .col(ColumnDef::new(AiReviews::Content).text().not_null())
                    .col(ColumnDef::new(AiReviews::Model).text().not_null())
                    .col(
                        ColumnDef::new(AiReviews::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(AiReviews::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ai_reviews_profile_id")
                            .from(AiReviews::Table, AiReviews::ProfileId)
                            .to(Profiles::Table, Profiles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ai_reviews_profile_id")
                    .table(AiReviews::Table)
                    .col(AiReviews::ProfileId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AiReviews::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum AiReviews {
    Table,
    Id,
    ProfileId,
    Content,
    Model,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Profiles {
    Table,
    Id,
}
