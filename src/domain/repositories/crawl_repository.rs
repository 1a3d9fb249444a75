// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::crawl::{Crawl, CrawlStatus, JobOutcome};
use async_trait::async_trait;
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

/// 仓库错误类型
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    /// 记录未找到
    #[error("Record not found")]
    NotFound,
    /// 存储的数据无法还原为领域对象
    #[error("Corrupted record: {0}")]
    Corrupted(String),
}

/// 爬取批次仓库特质
///
/// 计数器只能在存储层原子递增（`increment_stats`，或随终态结果一起由
/// `CepResultRepository::record_terminal` 递增），
/// 状态只能通过条件更新转换，不提供整行覆盖写入。
#[async_trait]
pub trait CrawlRepository: Send + Sync {
    /// 创建爬取批次
    ///
    /// # 参数
    ///
    /// * `crawl` - 要创建的爬取批次实体
    ///
    /// # 返回值
    ///
    /// * `Ok(Crawl)` - 成功创建后返回爬取批次
    /// * `Err(RepositoryError)` - 创建失败时返回错误
    async fn create(&self, crawl: &Crawl) -> Result<Crawl, RepositoryError>;

    /// 根据ID查找爬取批次
    ///
    /// # 返回值
    ///
    /// * `Ok(Some(Crawl))` - 找到时返回实体
    /// * `Ok(None)` - 未找到时返回空
    /// * `Err(RepositoryError)` - 查询失败时返回错误
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Crawl>, RepositoryError>;

    /// 原子递增 `processed` 以及 `success` 或 `errors` 计数
    ///
    /// 必须是存储层的单条原子更新，而不是应用层的读后写
    async fn increment_stats(&self, id: Uuid, outcome: JobOutcome) -> Result<(), RepositoryError>;

    /// 条件转换 `pending → running` 并记录开始时间
    ///
    /// 返回本次调用是否实际完成了转换
    async fn mark_started(&self, id: Uuid) -> Result<bool, RepositoryError>;

    /// 条件转换到终态并记录结束时间
    ///
    /// 仅在当前状态为 `pending` 或 `running` 时生效。多个工作器同时检测到完成时，
    /// 只有一个调用会返回 `true`
    async fn mark_finished(&self, id: Uuid, status: CrawlStatus) -> Result<bool, RepositoryError>;
}
