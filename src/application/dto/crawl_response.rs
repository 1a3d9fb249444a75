// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::cep_record::CepRecord;
use crate::domain::models::cep_result::{CepResult, CepResultStatus, ResultError};
use crate::domain::models::crawl::{Crawl, CrawlStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 提交爬取后的响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCrawlResponse {
    pub crawl_id: Uuid,
    pub total_ceps: i32,
    pub message: String,
}

/// 爬取进度视图
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlStatusResponse {
    pub crawl_id: Uuid,
    pub cep_start: String,
    pub cep_end: String,
    pub total_ceps: i32,
    pub processed: i32,
    pub success: i32,
    pub errors: i32,
    pub status: CrawlStatus,
    pub progress_percentage: u32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl From<Crawl> for CrawlStatusResponse {
    fn from(crawl: Crawl) -> Self {
        let progress_percentage = crawl.progress_percentage();
        Self {
            crawl_id: crawl.id,
            cep_start: crawl.cep_start,
            cep_end: crawl.cep_end,
            total_ceps: crawl.total_ceps,
            processed: crawl.stats.processed,
            success: crawl.stats.success,
            errors: crawl.stats.errors,
            status: crawl.status,
            progress_percentage,
            created_at: crawl.created_at,
            started_at: crawl.started_at,
            finished_at: crawl.finished_at,
        }
    }
}

/// 单个 CEP 的结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CepResultView {
    pub cep: String,
    pub status: CepResultStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<CepRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ResultError>,
    pub processed_at: DateTime<Utc>,
    pub retry_count: i32,
}

impl From<CepResult> for CepResultView {
    fn from(result: CepResult) -> Self {
        Self {
            cep: result.cep,
            status: result.status,
            data: result.data,
            error: result.error,
            processed_at: result.processed_at,
            retry_count: result.retry_count,
        }
    }
}

/// 分页结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlResultsResponse {
    pub results: Vec<CepResultView>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}
