use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Stars::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Stars::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Stars::ProfileId).uuid().not_null())
                    .col(ColumnDef::new(Stars::IpHash).text().not_null())
                    .col(
                        ColumnDef::new(Stars::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_stars_profile_id")
                            .from(Stars::Table, Stars::ProfileId)
                            .to(Profiles::Table, Profiles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_stars_profile_ip_hash")
                    .table(Stars::Table)
                    .col(Stars::ProfileId)
                    .col(Stars::IpHash)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Stars::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Stars {
    Table,
    Id,
    ProfileId,
    IpHash,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Profiles {
    Table,
    Id,
}
