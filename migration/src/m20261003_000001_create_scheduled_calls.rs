//! Migration to create the scheduled_calls table

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
                    .table(ScheduledCalls::Table)
                    .if_not_exists()
                    .col(pk_auto(ScheduledCalls::Id))
                    .col(integer(ScheduledCalls::SchedulerId).not_null())
                    .col(integer(ScheduledCalls::ReceiverId).not_null())
                    .col(integer_null(ScheduledCalls::DealId))
                    .col(string(ScheduledCalls::Title).not_null())
                    .col(text_null(ScheduledCalls::Notes))
                    .col(timestamp_with_time_zone(ScheduledCalls::ScheduledAt).not_null())
                    .col(integer(ScheduledCalls::DurationMinutes).not_null().default(30))
                    .col(string_len(ScheduledCalls::Status, 32).not_null().default("PENDING"))
                    .col(timestamp_with_time_zone(ScheduledCalls::CreatedAt).default(Expr::current_timestamp()))
                    .col(timestamp_with_time_zone(ScheduledCalls::UpdatedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_scheduled_calls_scheduler")
                            .from(ScheduledCalls::Table, ScheduledCalls::SchedulerId)
                            .to(Users::Table, Users::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_scheduled_calls_receiver")
                            .from(ScheduledCalls::Table, ScheduledCalls::ReceiverId)
                            .to(Users::Table, Users::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_scheduled_calls_deal")
                            .from(ScheduledCalls::Table, ScheduledCalls::DealId)
                            .to(Deals::Table, Deals::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_scheduled_calls_scheduler_id")
                    .table(ScheduledCalls::Table)
                    .col(ScheduledCalls::SchedulerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_scheduled_calls_receiver_id")
                    .table(ScheduledCalls::Table)
                    .col(ScheduledCalls::ReceiverId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ScheduledCalls::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ScheduledCalls {
    Table,
    Id,
    SchedulerId,
    ReceiverId,
    DealId,
    Title,
    Notes,
    ScheduledAt,
    DurationMinutes,
    Status,
    CreatedAt,
    UpdatedAt,
}
