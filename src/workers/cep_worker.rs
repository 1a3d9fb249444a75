// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::cep_result::{CepResult, ResultError};
use crate::domain::models::crawl::JobOutcome;
use crate::domain::models::job::ReceivedJob;
use crate::domain::repositories::cep_result_repository::CepResultRepository;
use crate::domain::repositories::crawl_repository::CrawlRepository;
use crate::domain::services::lookup_service::{CepLookup, LookupError};
use crate::queue::job_queue::JobQueue;
use crate::utils::errors::WorkerError;
use crate::utils::retry_policy::RetryPolicy;
use crate::workers::rate_limiter::{AdaptiveRateLimiter, RateLimitSignal};
use crate::workers::worker::Worker;
use async_trait::async_trait;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

impl RateLimitSignal for LookupError {
    fn is_rate_limit(&self) -> bool {
        matches!(self, LookupError::RateLimited)
    }
}

/// 工作器配置
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// 每次从队列接收的最大消息数
    pub batch_size: usize,
    /// 队列为空时的休眠时间
    pub idle_backoff: Duration,
    /// 处理循环出错后的休眠时间
    pub error_backoff: Duration,
    /// 单个任务的重试策略
    pub retry_policy: RetryPolicy,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            batch_size: 10,
            idle_backoff: Duration::from_secs(1),
            error_backoff: Duration::from_secs(5),
            retry_policy: RetryPolicy::default(),
        }
    }
}

/// 单个任务的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobDisposition {
    /// 写入终态结果并计入统计
    Completed(JobOutcome),
    /// 已安排重试，消息未确认
    RetryScheduled,
    /// 结果已是终态（重复投递），直接确认
    Duplicate,
}

/// CEP 查询工作器
///
/// 循环从队列接收一批任务，批内并发处理（并发度由速率限制器约束），
/// 整批完成后再接收下一批。
pub struct CepWorker<Q, L, C, R>
where
    Q: JobQueue,
    L: CepLookup,
    C: CrawlRepository,
    R: CepResultRepository,
{
    name: String,
    queue: Arc<Q>,
    lookup: Arc<L>,
    crawl_repository: Arc<C>,
    result_repository: Arc<R>,
    rate_limiter: Arc<AdaptiveRateLimiter>,
    config: WorkerConfig,
    processed: AtomicU64,
}

impl<Q, L, C, R> CepWorker<Q, L, C, R>
where
    Q: JobQueue,
    L: CepLookup,
    C: CrawlRepository,
    R: CepResultRepository,
{
    pub fn new(
        id: usize,
        queue: Arc<Q>,
        lookup: Arc<L>,
        crawl_repository: Arc<C>,
        result_repository: Arc<R>,
        rate_limiter: Arc<AdaptiveRateLimiter>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            name: format!("cep-worker-{}", id),
            queue,
            lookup,
            crawl_repository,
            result_repository,
            rate_limiter,
            config,
            processed: AtomicU64::new(0),
        }
    }

    /// 本工作器已处理到终态的任务数
    pub fn processed_count(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// 接收并处理一批任务，返回本批是否收到了消息
    pub async fn poll_once(&self, token: &CancellationToken) -> Result<bool, WorkerError> {
        let batch = self.queue.receive(self.config.batch_size).await?;
        if batch.is_empty() {
            return Ok(false);
        }
        self.process_batch(batch, token).await?;
        Ok(true)
    }

    /// 处理一批任务
    ///
    /// 先把批内涉及的批次标记为 running，再并发处理所有任务并等待全部完成
    pub async fn process_batch(
        &self,
        batch: Vec<ReceivedJob>,
        token: &CancellationToken,
    ) -> Result<Vec<JobDisposition>, WorkerError> {
        let crawl_ids: HashSet<Uuid> = batch.iter().map(|r| r.job.crawl_id).collect();
        for crawl_id in crawl_ids {
            if self.crawl_repository.mark_started(crawl_id).await? {
                info!(crawl_id = %crawl_id, "Crawl started");
            }
        }

        let results = join_all(batch.into_iter().map(|job| self.process_job(job, token))).await;

        let mut dispositions = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(disposition) => dispositions.push(disposition),
                // 消息未确认，可见性超时后会重新投递
                Err(e) => error!(worker = %self.name, "Job processing failed: {}", e),
            }
        }
        Ok(dispositions)
    }

    /// 处理单个任务
    #[instrument(skip(self, received, token), fields(crawl_id = %received.job.crawl_id, cep = %received.job.cep))]
    pub async fn process_job(
        &self,
        received: ReceivedJob,
        token: &CancellationToken,
    ) -> Result<JobDisposition, WorkerError> {
        let job = &received.job;

        // 重试次数从结果行读取，跨重启和重复投递保持一致
        let existing = self.result_repository.find(job.crawl_id, &job.cep).await?;
        if let Some(existing) = &existing {
            if existing.status.is_terminal() {
                debug!("Result already terminal, acknowledging duplicate delivery");
                return self.settle_duplicate(&received).await;
            }
        }
        let retry_count = existing.map(|r| r.retry_count).unwrap_or(0).max(0);

        let started = Instant::now();
        let lookup = self
            .rate_limiter
            .execute(|| self.lookup.resolve(&job.cep))
            .await;
        metrics::histogram!("cep_lookup_duration_seconds").record(started.elapsed().as_secs_f64());

        match lookup {
            Ok(Some(record)) => {
                let result = CepResult::success(job.crawl_id, &job.cep, record, retry_count);
                self.complete(&received, result, JobOutcome::Success).await
            }
            Ok(None) => {
                let result =
                    CepResult::error(job.crawl_id, &job.cep, ResultError::not_found(), retry_count);
                self.complete(&received, result, JobOutcome::Error).await
            }
            Err(e) if e.is_retryable() && self.config.retry_policy.should_retry(retry_count as u32) => {
                self.schedule_retry(&received, e, retry_count, token).await
            }
            Err(e) => {
                warn!(code = %e.code(), retry_count, "Lookup failed permanently: {}", e);
                let error = ResultError::new(e.code(), e.to_string());
                let result = CepResult::error(job.crawl_id, &job.cep, error, retry_count);
                self.complete(&received, result, JobOutcome::Error).await
            }
        }
    }

    /// 原子写入终态结果和统计，检查批次是否完成，最后确认消息
    ///
    /// 任何一步失败时消息保持未确认，重新投递会走重复投递路径补做完成检查
    async fn complete(
        &self,
        received: &ReceivedJob,
        result: CepResult,
        outcome: JobOutcome,
    ) -> Result<JobDisposition, WorkerError> {
        let crawl_id = received.job.crawl_id;

        if !self.result_repository.record_terminal(&result, outcome).await? {
            // 并发的重复投递已经写入了终态
            return self.settle_duplicate(received).await;
        }

        self.check_and_finalize(crawl_id).await?;
        self.queue.acknowledge(&received.receipt).await?;

        let label = match outcome {
            JobOutcome::Success => "success",
            JobOutcome::Error => "error",
        };
        metrics::counter!("cep_jobs_processed_total", "outcome" => label).increment(1);

        let processed = self.processed.fetch_add(1, Ordering::Relaxed) + 1;
        if processed % 100 == 0 {
            info!(worker = %self.name, processed, "Progress");
        }

        Ok(JobDisposition::Completed(outcome))
    }

    /// 记录 pending 结果并等待退避，消息保持未确认
    async fn schedule_retry(
        &self,
        received: &ReceivedJob,
        error: LookupError,
        retry_count: i32,
        token: &CancellationToken,
    ) -> Result<JobDisposition, WorkerError> {
        let job = &received.job;
        let next_count = retry_count + 1;
        let pending = CepResult::pending(
            job.crawl_id,
            &job.cep,
            ResultError::new(error.code(), error.to_string()),
            next_count,
        );

        if !self.result_repository.upsert(&pending).await? {
            return self.settle_duplicate(received).await;
        }

        let delay = self.config.retry_policy.backoff_for(retry_count as u32);
        metrics::counter!("cep_jobs_retried_total", "code" => error.code().to_string()).increment(1);
        info!(
            code = %error.code(),
            attempt = next_count,
            max_retries = self.config.retry_policy.max_retries,
            delay_ms = delay.as_millis() as u64,
            "Retry scheduled"
        );

        tokio::select! {
            _ = token.cancelled() => debug!("Retry backoff interrupted by shutdown"),
            _ = sleep(delay) => {}
        }

        Ok(JobDisposition::RetryScheduled)
    }

    /// 结果已是终态：补做完成检查后确认消息，统计不变
    async fn settle_duplicate(&self, received: &ReceivedJob) -> Result<JobDisposition, WorkerError> {
        self.check_and_finalize(received.job.crawl_id).await?;
        self.queue.acknowledge(&received.receipt).await?;
        metrics::counter!("cep_jobs_processed_total", "outcome" => "duplicate").increment(1);
        Ok(JobDisposition::Duplicate)
    }

    /// 检查批次是否全部完成，是则条件转换到终态
    ///
    /// 多个工作器可能同时看到 `processed >= total`，条件更新保证只有一个生效
    pub async fn check_and_finalize(&self, crawl_id: Uuid) -> Result<(), WorkerError> {
        let Some(crawl) = self.crawl_repository.find_by_id(crawl_id).await? else {
            warn!(crawl_id = %crawl_id, "Crawl not found while checking completion");
            return Ok(());
        };

        if !crawl.is_complete() {
            return Ok(());
        }

        let status = crawl.final_status();
        if self.crawl_repository.mark_finished(crawl_id, status).await? {
            metrics::counter!("crawls_finalized_total", "status" => status.to_string()).increment(1);
            info!(
                crawl_id = %crawl_id,
                status = %status,
                success = crawl.stats.success,
                errors = crawl.stats.errors,
                "Crawl finalized"
            );
        }
        Ok(())
    }

    async fn pause(&self, duration: Duration, token: &CancellationToken) {
        tokio::select! {
            _ = token.cancelled() => {}
            _ = sleep(duration) => {}
        }
    }
}

#[async_trait]
impl<Q, L, C, R> Worker for CepWorker<Q, L, C, R>
where
    Q: JobQueue,
    L: CepLookup,
    C: CrawlRepository,
    R: CepResultRepository,
{
    async fn run(&self, token: CancellationToken) -> Result<(), WorkerError> {
        info!(worker = %self.name, "Worker started");

        while !token.is_cancelled() {
            // 停止信号只打断等待中的接收，已收到的批次会处理完
            let received = tokio::select! {
                _ = token.cancelled() => break,
                received = self.queue.receive(self.config.batch_size) => received,
            };

            let outcome = match received {
                Ok(batch) if batch.is_empty() => {
                    self.pause(self.config.idle_backoff, &token).await;
                    continue;
                }
                Ok(batch) => self.process_batch(batch, &token).await.map(|_| ()),
                Err(e) => Err(WorkerError::from(e)),
            };

            if let Err(e) = outcome {
                error!(worker = %self.name, "Processing loop error: {}", e);
                self.pause(self.config.error_backoff, &token).await;
            }
        }

        info!(worker = %self.name, processed = self.processed_count(), "Worker stopped");
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
#[path = "cep_worker_test.rs"]
mod tests;
