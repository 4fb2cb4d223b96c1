//! Migration to create the profile_skills table.
//!
//! Skills are an ordered list per profile, stored relationally so listings can
//! filter on them.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ProfileSkills::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ProfileSkills::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ProfileSkills::ProfileId).uuid().not_null())
                    .col(ColumnDef::new(ProfileSkills::Position).integer().not_null())
                    .col(ColumnDef::new(ProfileSkills::Name).text().not_null())
                    .col(ColumnDef::new(ProfileSkills::NameKey).text().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_profile_skills_profile_id")
                            .from(ProfileSkills::Table, ProfileSkills::ProfileId)
                            .to(Profiles::Table, Profiles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_profile_skills_profile_name")
                    .table(ProfileSkills::Table)
                    .col(ProfileSkills::ProfileId)
                    .col(ProfileSkills::NameKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_profile_skills_name_key")
                    .table(ProfileSkills::Table)
                    .col(ProfileSkills::NameKey)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ProfileSkills::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ProfileSkills {
    Table,
    Id,
    ProfileId,
    Position,
    Name,
    NameKey,
}

#[derive(DeriveIden)]
enum Profiles {
    Table,
    Id,
}
