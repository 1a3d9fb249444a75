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
        // visible_at / enqueued_at are unix epoch milliseconds
        manager
            .create_table(
                Table::create()
                    .table(JobQueue::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(JobQueue::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(JobQueue::CrawlId).uuid().not_null())
                    .col(ColumnDef::new(JobQueue::Cep).string_len(8).not_null())
                    .col(ColumnDef::new(JobQueue::ReceiptHandle).uuid())
                    .col(ColumnDef::new(JobQueue::VisibleAt).big_integer().not_null())
                    .col(
                        ColumnDef::new(JobQueue::ReceiveCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(JobQueue::EnqueuedAt).big_integer().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_job_queue_visible_at")
                    .table(JobQueue::Table)
                    .col(JobQueue::VisibleAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_job_queue_receipt_handle")
                    .table(JobQueue::Table)
                    .col(JobQueue::ReceiptHandle)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(JobQueue::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum JobQueue {
    Table,
    Id,
    CrawlId,
    Cep,
    ReceiptHandle,
    VisibleAt,
    ReceiveCount,
    EnqueuedAt,
}
