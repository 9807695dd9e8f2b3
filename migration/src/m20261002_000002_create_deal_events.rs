//! Migration to create the append-only deal timeline

use sea_orm_migration::{prelude::*, schema::*};

use crate::m20261001_000001_create_users::Users;
use crate::m20261002_000001_create_deals::Deals;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DealEvents::Table)
                    .if_not_exists()
                    .col(pk_auto(DealEvents::Id))
                    .col(integer(DealEvents::DealId).not_null())
                    .col(string_len(DealEvents::EventType, 32).not_null())
                    .col(string(DealEvents::Title).not_null())
                    .col(text_null(DealEvents::Details))
                    .col(integer(DealEvents::ActorId).not_null())
                    .col(timestamp_with_time_zone(DealEvents::CreatedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_deal_events_deal")
                            .from(DealEvents::Table, DealEvents::DealId)
                            .to(Deals::Table, Deals::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_deal_events_actor")
                            .from(DealEvents::Table, DealEvents::ActorId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // Timeline reads are always per deal, newest first
        manager
            .create_index(
                Index::create()
                    .name("idx_deal_events_deal_created")
                    .table(DealEvents::Table)
                    .col(DealEvents::DealId)
                    .col(DealEvents::CreatedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DealEvents::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum DealEvents {
    Table,
    Id,
    DealId,
    EventType,
    Title,
    Details,
    ActorId,
    CreatedAt,
}
