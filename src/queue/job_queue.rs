// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::job::{CepJob, ReceivedJob};
use async_trait::async_trait;
use sea_orm::DbErr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// 单次批量发送或接收的传输上限
pub const MAX_BATCH_SIZE: usize = 10;

/// 队列错误类型
#[derive(Error, Debug)]
pub enum QueueError {
    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] DbErr),

    /// 消息无法编码或解码
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// 队列暂不可用
    #[error("Queue unavailable: {0}")]
    Unavailable(String),
}

/// 队列配置
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// 消息被接收后对其他消费者不可见的时长
    pub visibility_timeout: Duration,
    /// 长轮询最长等待时间
    pub wait_time: Duration,
    /// 长轮询内部的检查间隔
    pub poll_interval: Duration,
    /// 单次批量发送的最大消息数，不超过 `MAX_BATCH_SIZE`
    pub max_batch_size: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            visibility_timeout: Duration::from_secs(120),
            wait_time: Duration::from_secs(20),
            poll_interval: Duration::from_millis(500),
            max_batch_size: MAX_BATCH_SIZE,
        }
    }
}

impl QueueConfig {
    /// 实际使用的批次大小，限制在 `1..=MAX_BATCH_SIZE`
    pub fn batch_size(&self) -> usize {
        self.max_batch_size.clamp(1, MAX_BATCH_SIZE)
    }
}

/// 任务队列特质
///
/// 至少一次投递：已接收但未确认的消息在可见性超时后会再次投递给其他消费者，
/// 下游处理必须对重复投递保持幂等。不保证任务之间的顺序。
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// 入队单个任务
    async fn enqueue(&self, job: CepJob) -> Result<(), QueueError>;

    /// 批量入队，超过传输上限时自动分块
    async fn enqueue_batch(&self, jobs: Vec<CepJob>) -> Result<(), QueueError>;

    /// 接收最多 `max_count` 个任务
    ///
    /// 队列为空时可能长轮询等待，返回空列表表示等待期内没有可见消息
    async fn receive(&self, max_count: usize) -> Result<Vec<ReceivedJob>, QueueError>;

    /// 根据确认凭据删除消息
    async fn acknowledge(&self, receipt: &str) -> Result<(), QueueError>;
}

#[async_trait]
impl<T: JobQueue + ?Sized> JobQueue for Arc<T> {
    async fn enqueue(&self, job: CepJob) -> Result<(), QueueError> {
        (**self).enqueue(job).await
    }

    async fn enqueue_batch(&self, jobs: Vec<CepJob>) -> Result<(), QueueError> {
        (**self).enqueue_batch(jobs).await
    }

    async fn receive(&self, max_count: usize) -> Result<Vec<ReceivedJob>, QueueError> {
        (**self).receive(max_count).await
    }

    async fn acknowledge(&self, receipt: &str) -> Result<(), QueueError> {
        (**self).acknowledge(receipt).await
    }
}

/// 按传输上限切分任务列表
pub fn chunk_jobs(jobs: &[CepJob], batch_size: usize) -> std::slice::Chunks<'_, CepJob> {
    jobs.chunks(batch_size.clamp(1, MAX_BATCH_SIZE))
}
