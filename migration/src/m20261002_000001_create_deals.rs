//! Migration to create the deals table
//!
//! `active_pair` carries "<buyer_id>:<listing_id>" while the deal is open and
//! NULL once it reaches a terminal stage, so the unique index below allows at
//! most one open deal per buyer and listing.

use sea_orm_migration::{prelude::*, schema::*};

use crate::m20261001_000001_create_users::Users;
use crate::m20261001_000002_create_listings::Listings;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Deals::Table)
                    .if_not_exists()
                    .col(pk_auto(Deals::Id))
                    .col(integer(Deals::ListingId).not_null())
                    .col(integer(Deals::BuyerId).not_null())
                    .col(integer(Deals::SellerId).not_null())
                    .col(string_len(Deals::Stage, 32).not_null().default("INQUIRY"))
                    .col(big_integer_null(Deals::OfferAmount))
                    .col(text_null(Deals::Notes))
                    .col(string_null(Deals::ActivePair))
                    .col(integer(Deals::Version).not_null().default(0))
                    .col(timestamp_with_time_zone(Deals::CreatedAt).default(Expr::current_timestamp()))
                    .col(timestamp_with_time_zone(Deals::UpdatedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_deals_listing")
                            .from(Deals::Table, Deals::ListingId)
                            .to(Listings::Table, Listings::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_deals_buyer")
                            .from(Deals::Table, Deals::BuyerId)
                            .to(Users::Table, Users::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_deals_seller")
                            .from(Deals::Table, Deals::SellerId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_deals_active_pair")
                    .table(Deals::Table)
                    .col(Deals::ActivePair)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Participant lookups for the "my deals" listing
        manager
            .create_index(
                Index::create()
                    .name("idx_deals_buyer_id")
                    .table(Deals::Table)
                    .col(Deals::BuyerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_deals_seller_id")
                    .table(Deals::Table)
                    .col(Deals::SellerId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Deals::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub(crate) enum Deals {
    Table,
    Id,
    ListingId,
    BuyerId,
    SellerId,
    Stage,
    OfferAmount,
    Notes,
    ActivePair,
    Version,
    CreatedAt,
    UpdatedAt,
}
