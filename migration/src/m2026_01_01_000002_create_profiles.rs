//! Migration to create the profiles table.
//!
//! Each user owns at most one profile; usernames are globally unique.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Profiles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Profiles::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Profiles::UserId).uuid().not_null())
                    .col(ColumnDef::new(Profiles::Username).text().not_null())
                    .col(ColumnDef::new(Profiles::DisplayName).text().not_null())
                    .col(
                        ColumnDef::new(Profiles::Bio)
                            .text()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(Profiles::GithubUsername).text().null())
                    .col(ColumnDef::new(Profiles::AvatarUrl).text().null())
                    .col(ColumnDef::new(Profiles::Location).text().null())
                    .col(ColumnDef::new(Profiles::Website).text().null())
                    .col(
                        ColumnDef::new(Profiles::LastSyncedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Profiles::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Profiles::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_profiles_user_id")
                            .from(Profiles::Table, Profiles::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_profiles_user_id")
                    .table(Profiles::Table)
                    .col(Profiles::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_profiles_username")
                    .table(Profiles::Table)
                    .col(Profiles::Username)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Profiles::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Profiles {
    Table,
    Id,
    UserId,
    Username,
    DisplayName,
    Bio,
    GithubUsername,
    AvatarUrl,
    Location,
    Website,
    LastSyncedAt,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}
