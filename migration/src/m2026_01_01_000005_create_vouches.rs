//! Migration to create the vouches table.
//!
//! The unique index on `(profile_id, voucher_id)` is what ultimately resolves
//! concurrent duplicate vouches.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Vouches::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Vouches::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Vouches::ProfileId).uuid().not_null())
                    .col(ColumnDef::new(Vouches::VoucherId).uuid().not_null())
                    .col(ColumnDef::new(Vouches::Message).text().null())
                    .col(
                        ColumnDef::new(Vouches::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vouches_profile_id")
                            .from(Vouches::Table, Vouches::ProfileId)
                            .to(Profiles::Table, Profiles::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vouches_voucher_id")
                            .from(Vouches::Table, Vouches::VoucherId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_vouches_profile_voucher")
                    .table(Vouches::Table)
                    .col(Vouches::ProfileId)
                    .col(Vouches::VoucherId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_vouches_voucher_id")
                    .table(Vouches::Table)
                    .col(Vouches::VoucherId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Vouches::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Vouches {
    Table,
    Id,
    ProfileId,
    VoucherId,
    Message,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Profiles {
    Table,
    Id,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}
