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

use crate::domain::models::cep_record::CepRecord;
use crate::domain::models::cep_result::{CepResult, CepResultStatus, ErrorCode, ResultError};
use crate::domain::models::crawl::JobOutcome;
use crate::domain::repositories::cep_result_repository::CepResultRepository;
use crate::domain::repositories::crawl_repository::RepositoryError;
use crate::infrastructure::database::entities::cep_result as result_entity;
use crate::infrastructure::repositories::crawl_repo_impl::increment_counters;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use sea_orm::{sea_query::Expr, sea_query::OnConflict, *};
use std::sync::Arc;
use uuid::Uuid;

/// 基于 SeaORM 的查询结果仓库
pub struct CepResultRepositoryImpl {
    db: Arc<DatabaseConnection>,
}

impl CepResultRepositoryImpl {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl TryFrom<result_entity::Model> for CepResult {
    type Error = RepositoryError;

    fn try_from(m: result_entity::Model) -> Result<Self, Self::Error> {
        let status = m.status.parse::<CepResultStatus>().map_err(|_| {
            RepositoryError::Corrupted(format!("invalid result status: {}", m.status))
        })?;

        let data = m
            .data
            .map(serde_json::from_value::<CepRecord>)
            .transpose()
            .map_err(|e| RepositoryError::Corrupted(e.to_string()))?;

        let error = match m.error_code {
            Some(code) => Some(ResultError {
                code: code.parse::<ErrorCode>().map_err(|_| {
                    RepositoryError::Corrupted(format!("invalid error code: {}", code))
                })?,
                message: m.error_message.unwrap_or_default(),
            }),
            None => None,
        };

        Ok(CepResult {
            crawl_id: m.crawl_id,
            cep: m.cep,
            status,
            data,
            error,
            retry_count: m.retry_count,
            processed_at: m.processed_at.into(),
        })
    }
}

fn data_json(result: &CepResult) -> Result<Option<serde_json::Value>, RepositoryError> {
    result
        .data
        .as_ref()
        .map(serde_json::to_value)
        .transpose()
        .map_err(|e| RepositoryError::Corrupted(e.to_string()))
}

fn terminal_statuses() -> [String; 2] {
    [
        CepResultStatus::Success.to_string(),
        CepResultStatus::Error.to_string(),
    ]
}

/// 插入或更新结果，终态行保持不变
async fn write_result<C: ConnectionTrait>(
    conn: &C,
    result: &CepResult,
) -> Result<bool, RepositoryError> {
    let data = data_json(result)?;
    let error_message = result.error.as_ref().map(|e| e.message.clone());
    let error_code = result.error.as_ref().map(|e| e.code.to_string());
    let processed_at: DateTime<FixedOffset> = result.processed_at.into();

    let model = result_entity::ActiveModel {
        crawl_id: Set(result.crawl_id),
        cep: Set(result.cep.clone()),
        status: Set(result.status.to_string()),
        data: Set(data.clone()),
        error_message: Set(error_message.clone()),
        error_code: Set(error_code.clone()),
        retry_count: Set(result.retry_count),
        processed_at: Set(processed_at),
    };

    let inserted = result_entity::Entity::insert(model)
        .on_conflict(
            OnConflict::columns([result_entity::Column::CrawlId, result_entity::Column::Cep])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;

    if inserted > 0 {
        return Ok(true);
    }

    // 行已存在：只覆盖仍处于 pending 的行，终态结果保持不变
    let updated = result_entity::Entity::update_many()
        .col_expr(
            result_entity::Column::Status,
            Expr::value(result.status.to_string()),
        )
        .col_expr(result_entity::Column::Data, Expr::value(data))
        .col_expr(result_entity::Column::ErrorMessage, Expr::value(error_message))
        .col_expr(result_entity::Column::ErrorCode, Expr::value(error_code))
        .col_expr(
            result_entity::Column::RetryCount,
            Expr::value(result.retry_count),
        )
        .col_expr(result_entity::Column::ProcessedAt, Expr::value(processed_at))
        .filter(result_entity::Column::CrawlId.eq(result.crawl_id))
        .filter(result_entity::Column::Cep.eq(result.cep.as_str()))
        .filter(result_entity::Column::Status.eq(CepResultStatus::Pending.to_string()))
        .exec(conn)
        .await?;

    Ok(updated.rows_affected > 0)
}

#[async_trait]
impl CepResultRepository for CepResultRepositoryImpl {
    async fn find(&self, crawl_id: Uuid, cep: &str) -> Result<Option<CepResult>, RepositoryError> {
        result_entity::Entity::find_by_id((crawl_id, cep.to_string()))
            .one(self.db.as_ref())
            .await?
            .map(CepResult::try_from)
            .transpose()
    }

    async fn upsert(&self, result: &CepResult) -> Result<bool, RepositoryError> {
        write_result(self.db.as_ref(), result).await
    }

    async fn record_terminal(
        &self,
        result: &CepResult,
        outcome: JobOutcome,
    ) -> Result<bool, RepositoryError> {
        let txn = self.db.begin().await?;

        if !write_result(&txn, result).await? {
            txn.rollback().await?;
            return Ok(false);
        }

        // 计数失败时事务回滚，结果行也不会留下
        if let Err(e) = increment_counters(&txn, result.crawl_id, outcome).await {
            txn.rollback().await?;
            return Err(e);
        }

        txn.commit().await?;
        Ok(true)
    }

    async fn find_by_crawl_id(
        &self,
        crawl_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<CepResult>, RepositoryError> {
        let models = result_entity::Entity::find()
            .filter(result_entity::Column::CrawlId.eq(crawl_id))
            .filter(result_entity::Column::Status.is_in(terminal_statuses()))
            .order_by_desc(result_entity::Column::ProcessedAt)
            .order_by_asc(result_entity::Column::Cep)
            .offset(offset)
            .limit(limit)
            .all(self.db.as_ref())
            .await?;

        models.into_iter().map(CepResult::try_from).collect()
    }

    async fn count_by_crawl_id(&self, crawl_id: Uuid) -> Result<u64, RepositoryError> {
        let count = result_entity::Entity::find()
            .filter(result_entity::Column::CrawlId.eq(crawl_id))
            .filter(result_entity::Column::Status.is_in(terminal_statuses()))
            .count(self.db.as_ref())
            .await?;
        Ok(count)
    }
}
