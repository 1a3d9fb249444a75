// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::cep_result::{CepResult, CepResultStatus};
use crate::domain::models::crawl::{Crawl, CrawlStatus, JobOutcome};
use crate::domain::repositories::cep_result_repository::CepResultRepository;
use crate::domain::repositories::crawl_repository::{CrawlRepository, RepositoryError};
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

fn apply_outcome(crawl: &mut Crawl, outcome: JobOutcome) {
    crawl.stats.processed += 1;
    match outcome {
        JobOutcome::Success => crawl.stats.success += 1,
        JobOutcome::Error => crawl.stats.errors += 1,
    }
    crawl.updated_at = Utc::now();
}

/// 内存爬取批次仓库
///
/// 每个操作都在同一把锁内完成，语义与数据库实现一致
#[derive(Default)]
pub struct InMemoryCrawlRepository {
    crawls: Mutex<HashMap<Uuid, Crawl>>,
}

impl InMemoryCrawlRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.crawls.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.crawls.lock().is_empty()
    }

    /// 所有批次的快照
    pub fn all(&self) -> Vec<Crawl> {
        self.crawls.lock().values().cloned().collect()
    }
}

#[async_trait]
impl CrawlRepository for InMemoryCrawlRepository {
    async fn create(&self, crawl: &Crawl) -> Result<Crawl, RepositoryError> {
        let mut crawls = self.crawls.lock();
        if crawls.contains_key(&crawl.id) {
            return Err(RepositoryError::Corrupted(format!(
                "duplicate crawl id {}",
                crawl.id
            )));
        }
        crawls.insert(crawl.id, crawl.clone());
        Ok(crawl.clone())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Crawl>, RepositoryError> {
        Ok(self.crawls.lock().get(&id).cloned())
    }

    async fn increment_stats(&self, id: Uuid, outcome: JobOutcome) -> Result<(), RepositoryError> {
        let mut crawls = self.crawls.lock();
        let crawl = crawls.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        apply_outcome(crawl, outcome);
        Ok(())
    }

    async fn mark_started(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let mut crawls = self.crawls.lock();
        match crawls.get_mut(&id) {
            Some(crawl) if crawl.status == CrawlStatus::Pending => {
                let now = Utc::now();
                crawl.status = CrawlStatus::Running;
                crawl.started_at = Some(now);
                crawl.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_finished(&self, id: Uuid, status: CrawlStatus) -> Result<bool, RepositoryError> {
        let mut crawls = self.crawls.lock();
        match crawls.get_mut(&id) {
            Some(crawl) if !crawl.status.is_terminal() => {
                let now = Utc::now();
                crawl.status = status;
                crawl.finished_at = Some(now);
                crawl.updated_at = now;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// 内存查询结果仓库
///
/// 与批次仓库共享计数器，`record_terminal` 同时持有两把锁（先结果后批次）
pub struct InMemoryCepResultRepository {
    results: Mutex<HashMap<(Uuid, String), CepResult>>,
    crawls: Arc<InMemoryCrawlRepository>,
}

impl InMemoryCepResultRepository {
    pub fn new(crawls: Arc<InMemoryCrawlRepository>) -> Self {
        Self {
            results: Mutex::new(HashMap::new()),
            crawls,
        }
    }

    /// 某个批次的全部结果（包括 pending）
    pub fn all_for(&self, crawl_id: Uuid) -> Vec<CepResult> {
        self.results
            .lock()
            .values()
            .filter(|r| r.crawl_id == crawl_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CepResultRepository for InMemoryCepResultRepository {
    async fn find(&self, crawl_id: Uuid, cep: &str) -> Result<Option<CepResult>, RepositoryError> {
        Ok(self
            .results
            .lock()
            .get(&(crawl_id, cep.to_string()))
            .cloned())
    }

    async fn upsert(&self, result: &CepResult) -> Result<bool, RepositoryError> {
        let mut results = self.results.lock();
        let key = (result.crawl_id, result.cep.clone());

        if let Some(existing) = results.get(&key) {
            if existing.status.is_terminal() {
                return Ok(false);
            }
        }
        results.insert(key, result.clone());
        Ok(true)
    }

    async fn record_terminal(
        &self,
        result: &CepResult,
        outcome: JobOutcome,
    ) -> Result<bool, RepositoryError> {
        let mut results = self.results.lock();
        let key = (result.crawl_id, result.cep.clone());

        if results.get(&key).is_some_and(|r| r.status.is_terminal()) {
            return Ok(false);
        }

        let mut crawls = self.crawls.crawls.lock();
        let crawl = crawls
            .get_mut(&result.crawl_id)
            .ok_or(RepositoryError::NotFound)?;
        apply_outcome(crawl, outcome);
        results.insert(key, result.clone());
        Ok(true)
    }

    async fn find_by_crawl_id(
        &self,
        crawl_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<CepResult>, RepositoryError> {
        let mut items: Vec<CepResult> = self
            .results
            .lock()
            .values()
            .filter(|r| r.crawl_id == crawl_id && r.status != CepResultStatus::Pending)
            .cloned()
            .collect();

        items.sort_by(|a, b| {
            b.processed_at
                .cmp(&a.processed_at)
                .then_with(|| a.cep.cmp(&b.cep))
        });

        Ok(items
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count_by_crawl_id(&self, crawl_id: Uuid) -> Result<u64, RepositoryError> {
        Ok(self
            .results
            .lock()
            .values()
            .filter(|r| r.crawl_id == crawl_id && r.status != CepResultStatus::Pending)
            .count() as u64)
    }
}
