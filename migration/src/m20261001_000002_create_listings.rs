//! Migration to create the listings table
//!
//! Only the columns the deal pipeline reads are owned here; the rest of the
//! listing catalogue lives with the marketplace front end.

use sea_orm_migration::{prelude::*, schema::*};

use crate::m20261001_000001_create_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Listings::Table)
                    .if_not_exists()
                    .col(pk_auto(Listings::Id))
                    .col(integer(Listings::SellerId).not_null())
                    .col(string(Listings::Title).not_null())
                    .col(string(Listings::Status).not_null().default("DRAFT"))
                    .col(
                        timestamp_with_time_zone(Listings::CreatedAt)
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_listings_seller")
                            .from(Listings::Table, Listings::SellerId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_listings_seller_id")
                    .table(Listings::Table)
                    .col(Listings::SellerId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Listings::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(crate) enum Listings {
    Table,
    Id,
    SellerId,
    Title,
    Status,
    CreatedAt,
}
