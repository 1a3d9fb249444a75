// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Crawls::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Crawls::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Crawls::CepStart).string_len(8).not_null())
                    .col(ColumnDef::new(Crawls::CepEnd).string_len(8).not_null())
                    .col(ColumnDef::new(Crawls::TotalCeps).integer().not_null())
                    .col(ColumnDef::new(Crawls::Status).string().not_null())
                    .col(ColumnDef::new(Crawls::Processed).integer().not_null().default(0))
                    .col(ColumnDef::new(Crawls::SuccessCount).integer().not_null().default(0))
                    .col(ColumnDef::new(Crawls::ErrorCount).integer().not_null().default(0))
                    .col(
                        ColumnDef::new(Crawls::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(Crawls::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Crawls::StartedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Crawls::FinishedAt).timestamp_with_time_zone())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_crawls_status")
                    .table(Crawls::Table)
                    .col(Crawls::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Crawls::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Crawls {
    Table,
    Id,
    CepStart,
    CepEnd,
    TotalCeps,
    Status,
    Processed,
    SuccessCount,
    ErrorCount,
    CreatedAt,
    UpdatedAt,
    StartedAt,
    FinishedAt,
}
