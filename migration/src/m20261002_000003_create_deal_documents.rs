//! Migration to create the deal_documents table

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
                    .table(DealDocuments::Table)
                    .if_not_exists()
                    .col(pk_auto(DealDocuments::Id))
                    .col(integer(DealDocuments::DealId).not_null())
                    .col(integer(DealDocuments::UploaderId).not_null())
                    .col(string(DealDocuments::Name).not_null())
                    .col(text(DealDocuments::FileUrl).not_null())
                    .col(string_null(DealDocuments::FileType))
                    .col(big_integer_null(DealDocuments::FileSize))
                    .col(string_len(DealDocuments::Category, 32).not_null().default("OTHER"))
                    .col(timestamp_with_time_zone(DealDocuments::CreatedAt).default(Expr::current_timestamp()))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_deal_documents_deal")
                            .from(DealDocuments::Table, DealDocuments::DealId)
                            .to(Deals::Table, Deals::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_deal_documents_uploader")
                            .from(DealDocuments::Table, DealDocuments::UploaderId)
                            .to(Users::Table, Users::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_deal_documents_deal_id")
                    .table(DealDocuments::Table)
                    .col(DealDocuments::DealId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DealDocuments::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum DealDocuments {
    Table,
    Id,
    DealId,
    UploaderId,
    Name,
    FileUrl,
    FileType,
    FileSize,
    Category,
    CreatedAt,
}
