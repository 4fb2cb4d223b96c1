//! Migration to create the repos table.
//!
//! Repos mirror a GitHub snapshot and are replaced wholesale on every sync.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Repos::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Repos::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Repos::ProfileId).uuid().not_null())
                    .col(ColumnDef::new(Repos::GithubId).big_integer().not_null())
                    .col(ColumnDef::new(Repos::Name).text().not_null())
                    .col(ColumnDef::new(Repos::FullName).text().not_null())
                    .col(ColumnDef::new(Repos::Description).text().null())
                    .col(ColumnDef::new(Repos::HtmlUrl).text().not_null())
                    .col(ColumnDef::new(Repos::PrimaryLanguage).text().null())
                    .col(ColumnDef::new(Repos::Languages).json_binary().not_null())
                    .col(
                        ColumnDef::new(Repos::Stars)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Repos::Forks)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Repos::PushedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Repos::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_repos_profile_id")
                            .from(Repos::Table, Repos::ProfileId)
                            .to(Profiles::Table, Profiles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_repos_profile_id")
                    .table(Repos::Table)
                    .col(Repos::ProfileId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_repos_primary_language")
                    .table(Repos::Table)
                    .col(Repos::PrimaryLanguage)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Repos::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Repos {
    Table,
    Id,
    ProfileId,
    GithubId,
    Name,
    FullName,
    Description,
    HtmlUrl,
    PrimaryLanguage,
    Languages,
    Stars,
    Forks,
    PushedAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Profiles {
    Table,
    Id,
}
