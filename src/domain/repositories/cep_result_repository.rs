// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::crawl_repository::RepositoryError;
use crate::domain::models::cep_result::CepResult;
use crate::domain::models::crawl::JobOutcome;
use async_trait::async_trait;
use uuid::Uuid;

/// 查询结果仓库特质
///
/// 以 (crawl_id, cep) 为唯一键
#[async_trait]
pub trait CepResultRepository: Send + Sync {
    /// 查找单个结果
    async fn find(&self, crawl_id: Uuid, cep: &str) -> Result<Option<CepResult>, RepositoryError>;

    /// 插入或更新结果
    ///
    /// 已处于终态（success/error）的行不会被覆盖。
    ///
    /// # 返回值
    ///
    /// * `Ok(true)` - 写入已生效
    /// * `Ok(false)` - 已存在终态结果，写入被忽略
    async fn upsert(&self, result: &CepResult) -> Result<bool, RepositoryError>;

    /// 写入终态结果并递增所属批次的计数器
    ///
    /// 两步在同一个原子操作内完成：要么结果和计数都生效，要么都不生效。
    /// 已处于终态的行不会被覆盖，计数也不会递增。
    ///
    /// # 返回值
    ///
    /// * `Ok(true)` - 结果已写入且计数已递增
    /// * `Ok(false)` - 已存在终态结果，什么也没写
    /// * `Err(RepositoryError::NotFound)` - 批次不存在，结果未写入
    async fn record_terminal(
        &self,
        result: &CepResult,
        outcome: JobOutcome,
    ) -> Result<bool, RepositoryError>;

    /// 分页查询某个批次的终态结果，按 `processed_at` 倒序
    async fn find_by_crawl_id(
        &self,
        crawl_id: Uuid,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<CepResult>, RepositoryError>;

    /// 统计某个批次的终态结果数量
    async fn count_by_crawl_id(&self, crawl_id: Uuid) -> Result<u64, RepositoryError>;
}
