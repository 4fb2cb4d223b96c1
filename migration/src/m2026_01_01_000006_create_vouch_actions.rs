//! Migration to create the vouch_actions table.
//!
//! One counter row per voucher per UTC day backs the daily vouch limit.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VouchActions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VouchActions::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(VouchActions::VoucherId).uuid().not_null())
                    .col(ColumnDef::new(VouchActions::Day).date().not_null())
                    .col(
                        ColumnDef::new(VouchActions::Count)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vouch_actions_voucher_id")
                            .from(VouchActions::Table, VouchActions::VoucherId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_vouch_actions_voucher_day")
                    .table(VouchActions::Table)
                    .col(VouchActions::VoucherId)
                    .col(VouchActions::Day)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VouchActions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum VouchActions {
    Table,
    Id,
    VoucherId,
    Day,
    Count,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}
