// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::domain::models::crawl::{Crawl, CrawlStats, CrawlStatus, JobOutcome};
use crate::domain::repositories::crawl_repository::{CrawlRepository, RepositoryError};
use crate::infrastructure::database::entities::crawl as crawl_entity;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use sea_orm::{sea_query::Expr, *};
use std::sync::Arc;
use uuid::Uuid;

/// 基于 SeaORM 的爬取批次仓库
pub struct CrawlRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl CrawlRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl TryFrom<crawl_entity::Model> for Crawl {
    type Error = RepositoryError;

    fn try_from(m: crawl_entity::Model) -> Result<Self, Self::Error> {
        let status = m
            .status
            .parse::<CrawlStatus>()
            .map_err(|_| RepositoryError::Corrupted(format!("invalid crawl status: {}", m.status)))?;

        Ok(Crawl {
            id: m.id,
            cep_start: m.cep_start,
            cep_end: m.cep_end,
            total_ceps: m.total_ceps,
            status,
            stats: CrawlStats {
                processed: m.processed,
                success: m.success_count,
                errors: m.error_count,
            },
            created_at: m.created_at.into(),
            updated_at: m.updated_at.into(),
            started_at: m.started_at.map(Into::into),
            finished_at: m.finished_at.map(Into::into),
        })
    }
}

/// 原子递增批次计数器
///
/// 单条 UPDATE，由数据库保证递增的原子性。可以在事务内调用
pub(crate) async fn increment_counters<C: ConnectionTrait>(
    conn: &C,
    id: Uuid,
    outcome: JobOutcome,
) -> Result<(), RepositoryError> {
    let counter = match outcome {
        JobOutcome::Success => crawl_entity::Column::SuccessCount,
        JobOutcome::Error => crawl_entity::Column::ErrorCount,
    };
    let now: DateTime<FixedOffset> = chrono::Utc::now().into();

    let result = crawl_entity::Entity::update_many()
        .col_expr(
            crawl_entity::Column::Processed,
            Expr::col(crawl_entity::Column::Processed).add(1),
        )
        .col_expr(counter, Expr::col(counter).add(1))
        .col_expr(crawl_entity::Column::UpdatedAt, Expr::value(now))
        .filter(crawl_entity::Column::Id.eq(id))
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}

#[async_trait]
impl CrawlRepository for CrawlRepositoryImpl {
    async fn create(&self, crawl: &Crawl) -> Result<Crawl, RepositoryError> {
        let model = crawl_entity::ActiveModel {
            id: Set(crawl.id),
            cep_start: Set(crawl.cep_start.clone()),
            cep_end: Set(crawl.cep_end.clone()),
            total_ceps: Set(crawl.total_ceps),
            status: Set(crawl.status.to_string()),
            processed: Set(crawl.stats.processed),
            success_count: Set(crawl.stats.success),
            error_count: Set(crawl.stats.errors),
            created_at: Set(crawl.created_at.into()),
            updated_at: Set(crawl.updated_at.into()),
            started_at: Set(crawl.started_at.map(Into::into)),
            finished_at: Set(crawl.finished_at.map(Into::into)),
        };

        model.insert(self.db.as_ref()).await?;
        Ok(crawl.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Crawl>, RepositoryError> {
        crawl_entity::Entity::find_by_id(id)
            .one(self.db.as_ref())
            .await?
            .map(Crawl::try_from)
            .transpose()
    }

    async fn increment_stats(&self, id: Uuid, outcome: JobOutcome) -> Result<(), RepositoryError> {
        increment_counters(self.db.as_ref(), id, outcome).await
    }

    async fn mark_started(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let now: DateTime<FixedOffset> = chrono::Utc::now().into();

        let result = crawl_entity::Entity::update_many()
            .col_expr(
                crawl_entity::Column::Status,
                Expr::value(CrawlStatus::Running.to_string()),
            )
            .col_expr(crawl_entity::Column::StartedAt, Expr::value(now))
            .col_expr(crawl_entity::Column::UpdatedAt, Expr::value(now))
            .filter(crawl_entity::Column::Id.eq(id))
            .filter(crawl_entity::Column::Status.eq(CrawlStatus::Pending.to_string()))
            .exec(self.db.as_ref())
            .await?;

        Ok(result.rows_affected > 0)
    }

    async fn mark_finished(&self, id: Uuid, status: CrawlStatus) -> Result<bool, RepositoryError> {
        let now: DateTime<FixedOffset> = chrono::Utc::now().into();

        let result = crawl_entity::Entity::update_many()
            .col_expr(crawl_entity::Column::Status, Expr::value(status.to_string()))
            .col_expr(crawl_entity::Column::FinishedAt, Expr::value(now))
            .col_expr(crawl_entity::Column::UpdatedAt, Expr::value(now))
            .filter(crawl_entity::Column::Id.eq(id))
            .filter(crawl_entity::Column::Status.is_in([
                CrawlStatus::Pending.to_string(),
                CrawlStatus::Running.to_string(),
            ]))
            .exec(self.db.as_ref())
            .await?;

        Ok(result.rows_affected > 0)
    }
}
