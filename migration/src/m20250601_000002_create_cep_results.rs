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
        // One row per (crawl, cep); the composite key backs the idempotent upsert
        manager
            .create_table(
                Table::create()
                    .table(CepResults::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(CepResults::CrawlId).uuid().not_null())
                    .col(ColumnDef::new(CepResults::Cep).string_len(8).not_null())
                    .col(ColumnDef::new(CepResults::Status).string().not_null())
                    .col(ColumnDef::new(CepResults::Data).json())
                    .col(ColumnDef::new(CepResults::ErrorMessage).text())
                    .col(ColumnDef::new(CepResults::ErrorCode).string())
                    .col(
                        ColumnDef::new(CepResults::RetryCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(CepResults::ProcessedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .primary_key(
                        Index::create()
                            .col(CepResults::CrawlId)
                            .col(CepResults::Cep),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_cep_results_crawl_status")
                    .table(CepResults::Table)
                    .col(CepResults::CrawlId)
                    .col(CepResults::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CepResults::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum CepResults {
    Table,
    CrawlId,
    Cep,
    Status,
    Data,
    ErrorMessage,
    ErrorCode,
    RetryCount,
    ProcessedAt,
}
