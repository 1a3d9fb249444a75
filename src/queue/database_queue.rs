// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::job_queue::{chunk_jobs, JobQueue, QueueConfig, QueueError, MAX_BATCH_SIZE};
use crate::domain::models::job::{CepJob, ReceivedJob};
use crate::infrastructure::database::entities::job_queue as queue_entity;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{sea_query::Expr, *};
use std::sync::Arc;
use tokio::time::Instant;
use tracing::debug;
use uuid::Uuid;

/// 基于数据库表的任务队列
///
/// 接收时用条件更新认领消息：只有 `visible_at` 与 `receipt_handle` 都未被其他消费者
/// 改动时认领才生效，每次投递生成新的确认凭据
pub struct DatabaseJobQueue {
    db: Arc<DatabaseConnection>,
    config: QueueConfig,
}

impl DatabaseJobQueue {
    pub fn new(db: Arc<DatabaseConnection>, config: QueueConfig) -> Self {
        Self { db, config }
    }

    /// 队列中的消息总数（包括不可见的）
    pub async fn len(&self) -> Result<u64, QueueError> {
        Ok(queue_entity::Entity::find().count(self.db.as_ref()).await?)
    }

    async fn claim(&self, max_count: usize) -> Result<Vec<ReceivedJob>, QueueError> {
        let now_ms = Utc::now().timestamp_millis();
        let visible_at = now_ms + self.config.visibility_timeout.as_millis() as i64;

        let candidates = queue_entity::Entity::find()
            .filter(queue_entity::Column::VisibleAt.lte(now_ms))
            .order_by_asc(queue_entity::Column::VisibleAt)
            .order_by_asc(queue_entity::Column::EnqueuedAt)
            .limit(max_count as u64)
            .all(self.db.as_ref())
            .await?;

        let mut claimed = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let receipt = Uuid::new_v4();

            let mut update = queue_entity::Entity::update_many()
                .col_expr(queue_entity::Column::ReceiptHandle, Expr::value(receipt))
                .col_expr(queue_entity::Column::VisibleAt, Expr::value(visible_at))
                .col_expr(
                    queue_entity::Column::ReceiveCount,
                    Expr::col(queue_entity::Column::ReceiveCount).add(1),
                )
                .filter(queue_entity::Column::Id.eq(candidate.id))
                .filter(queue_entity::Column::VisibleAt.eq(candidate.visible_at));

            update = match candidate.receipt_handle {
                Some(previous) => update.filter(queue_entity::Column::ReceiptHandle.eq(previous)),
                None => update.filter(queue_entity::Column::ReceiptHandle.is_null()),
            };

            let result = update.exec(self.db.as_ref()).await?;
            if result.rows_affected == 0 {
                // 已被其他消费者认领
                continue;
            }

            claimed.push(ReceivedJob {
                job: CepJob::new(candidate.crawl_id, candidate.cep),
                receipt: receipt.to_string(),
            });
        }

        Ok(claimed)
    }
}

#[async_trait]
impl JobQueue for DatabaseJobQueue {
    async fn enqueue(&self, job: CepJob) -> Result<(), QueueError> {
        self.enqueue_batch(vec![job]).await
    }

    async fn enqueue_batch(&self, jobs: Vec<CepJob>) -> Result<(), QueueError> {
        for chunk in chunk_jobs(&jobs, self.config.batch_size()) {
            let now_ms = Utc::now().timestamp_millis();
            let models = chunk.iter().map(|job| queue_entity::ActiveModel {
                id: Set(Uuid::new_v4()),
                crawl_id: Set(job.crawl_id),
                cep: Set(job.cep.clone()),
                receipt_handle: Set(None),
                visible_at: Set(now_ms),
                receive_count: Set(0),
                enqueued_at: Set(now_ms),
            });

            queue_entity::Entity::insert_many(models)
                .exec_without_returning(self.db.as_ref())
                .await?;
        }

        debug!(count = jobs.len(), "Jobs enqueued");
        Ok(())
    }

    async fn receive(&self, max_count: usize) -> Result<Vec<ReceivedJob>, QueueError> {
        let max_count = max_count.clamp(1, MAX_BATCH_SIZE);
        let deadline = Instant::now() + self.config.wait_time;

        loop {
            let claimed = self.claim(max_count).await?;
            let now = Instant::now();
            if !claimed.is_empty() || now >= deadline {
                return Ok(claimed);
            }
            tokio::time::sleep(self.config.poll_interval.min(deadline - now)).await;
        }
    }

    async fn acknowledge(&self, receipt: &str) -> Result<(), QueueError> {
        let receipt = Uuid::parse_str(receipt)
            .map_err(|e| QueueError::Serialization(format!("invalid receipt handle: {}", e)))?;

        queue_entity::Entity::delete_many()
            .filter(queue_entity::Column::ReceiptHandle.eq(receipt))
            .exec(self.db.as_ref())
            .await?;
        Ok(())
    }
}
