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

use crate::{
    application::dto::{
        crawl_request::{validation_message, CrawlRequestDto, ResultsQuery},
        crawl_response::{CepResultView, CrawlResultsResponse, CrawlStatusResponse, CreateCrawlResponse},
    },
    domain::{
        models::{
            crawl::{Crawl, CrawlStatus},
            job::CepJob,
        },
        repositories::{
            cep_result_repository::CepResultRepository, crawl_repository::CrawlRepository,
            RepositoryError,
        },
        services::cep_range::CepRange,
    },
    queue::job_queue::{JobQueue, QueueError},
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};
use uuid::Uuid;
use validator::Validate;

#[derive(Error, Debug)]
pub enum CrawlUseCaseError {
    #[error("{0}")]
    Validation(String),
    #[error("Crawl {0} not found")]
    NotFound(String),
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
}

/// 爬取用例：提交、查询进度、分页查询结果
pub struct CrawlUseCase<C, R, Q> {
    crawl_repo: Arc<C>,
    result_repo: Arc<R>,
    queue: Arc<Q>,
    max_range_size: u32,
}

impl<C, R, Q> CrawlUseCase<C, R, Q>
where
    C: CrawlRepository + 'static,
    R: CepResultRepository + 'static,
    Q: JobQueue + 'static,
{
    pub fn new(crawl_repo: Arc<C>, result_repo: Arc<R>, queue: Arc<Q>, max_range_size: u32) -> Self {
        Self {
            crawl_repo,
            result_repo,
            queue,
            max_range_size,
        }
    }

    /// 校验范围、创建批次并为每个 CEP 入队一个任务
    ///
    /// 入队失败时批次会被标记为 failed，避免留下永远不会完成的 pending 批次
    pub async fn submit_crawl(
        &self,
        dto: CrawlRequestDto,
    ) -> Result<CreateCrawlResponse, CrawlUseCaseError> {
        dto.validate()
            .map_err(|e| CrawlUseCaseError::Validation(validation_message(&e)))?;

        let range = CepRange::parse(&dto.cep_start, &dto.cep_end, self.max_range_size)
            .map_err(|e| CrawlUseCaseError::Validation(e.to_string()))?;

        let total_ceps = range.len() as i32;
        let crawl = Crawl::new(range.start(), range.end(), total_ceps);
        self.crawl_repo.create(&crawl).await?;

        let jobs: Vec<CepJob> = range.codes().map(|cep| CepJob::new(crawl.id, cep)).collect();
        if let Err(e) = self.queue.enqueue_batch(jobs).await {
            error!(crawl_id = %crawl.id, "Failed to enqueue crawl jobs: {}", e);
            if let Err(mark_err) = self
                .crawl_repo
                .mark_finished(crawl.id, CrawlStatus::Failed)
                .await
            {
                error!(crawl_id = %crawl.id, "Failed to mark crawl as failed: {}", mark_err);
            }
            return Err(e.into());
        }

        info!(
            crawl_id = %crawl.id,
            cep_start = %crawl.cep_start,
            cep_end = %crawl.cep_end,
            total_ceps,
            "Crawl created"
        );

        Ok(CreateCrawlResponse {
            crawl_id: crawl.id,
            total_ceps,
            message: "Crawl started successfully".to_string(),
        })
    }

    /// 查询批次进度，非法 ID 与不存在的批次同样视为未找到
    pub async fn get_crawl_status(
        &self,
        crawl_id: &str,
    ) -> Result<CrawlStatusResponse, CrawlUseCaseError> {
        let crawl = self.find_crawl(crawl_id).await?;
        Ok(crawl.into())
    }

    /// 分页查询终态结果，最新处理的在前
    pub async fn get_crawl_results(
        &self,
        crawl_id: &str,
        query: &ResultsQuery,
    ) -> Result<CrawlResultsResponse, CrawlUseCaseError> {
        let page = query.page();
        let limit = query.limit();
        if page < 1 {
            return Err(CrawlUseCaseError::Validation(
                "page must be greater than or equal to 1".to_string(),
            ));
        }
        if limit < 1 || limit > ResultsQuery::MAX_LIMIT {
            return Err(CrawlUseCaseError::Validation(format!(
                "limit must be between 1 and {}",
                ResultsQuery::MAX_LIMIT
            )));
        }

        let crawl = self.find_crawl(crawl_id).await?;

        let offset = u64::from(page - 1) * u64::from(limit);
        let (results, total) = tokio::try_join!(
            self.result_repo
                .find_by_crawl_id(crawl.id, offset, u64::from(limit)),
            self.result_repo.count_by_crawl_id(crawl.id),
        )?;

        Ok(CrawlResultsResponse {
            results: results.into_iter().map(CepResultView::from).collect(),
            total,
            page,
            limit,
            total_pages: total.div_ceil(u64::from(limit)),
        })
    }

    async fn find_crawl(&self, crawl_id: &str) -> Result<Crawl, CrawlUseCaseError> {
        let Ok(id) = Uuid::parse_str(crawl_id) else {
            return Err(CrawlUseCaseError::NotFound(crawl_id.to_string()));
        };

        self.crawl_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| CrawlUseCaseError::NotFound(crawl_id.to_string()))
    }
}
