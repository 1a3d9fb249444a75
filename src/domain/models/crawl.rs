// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// 爬取批次实体
///
/// 表示一次 CEP 范围查询请求，包含范围、总数、进度统计和生命周期时间戳。
/// `total_ceps` 在创建时确定，之后只通过原子递增和条件状态转换修改。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Crawl {
    /// 爬取批次唯一标识符
    pub id: Uuid,
    /// 起始 CEP（8位数字）
    pub cep_start: String,
    /// 结束 CEP（8位数字）
    pub cep_end: String,
    /// 范围内 CEP 总数
    pub total_ceps: i32,
    /// 爬取状态
    pub status: CrawlStatus,
    /// 进度统计
    pub stats: CrawlStats,
    /// 创建时间
    pub created_at: DateTime<Utc>,
    /// 更新时间
    pub updated_at: DateTime<Utc>,
    /// 第一个任务被领取的时间
    pub started_at: Option<DateTime<Utc>>,
    /// 终结时间
    pub finished_at: Option<DateTime<Utc>>,
}

impl Crawl {
    /// 创建一个新的待处理爬取批次
    pub fn new(cep_start: String, cep_end: String, total_ceps: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            cep_start,
            cep_end,
            total_ceps,
            status: CrawlStatus::Pending,
            stats: CrawlStats::default(),
            created_at: now,
            updated_at: now,
            started_at: None,
            finished_at: None,
        }
    }

    /// 是否所有任务都已到达终态
    pub fn is_complete(&self) -> bool {
        self.stats.processed >= self.total_ceps
    }

    /// 所有任务完成时应进入的终态：全部失败为 `Failed`，否则为 `Finished`
    pub fn final_status(&self) -> CrawlStatus {
        if self.stats.errors == self.total_ceps {
            CrawlStatus::Failed
        } else {
            CrawlStatus::Finished
        }
    }

    /// 进度百分比（四舍五入）
    pub fn progress_percentage(&self) -> u32 {
        if self.total_ceps <= 0 {
            return 0;
        }
        ((self.stats.processed as f64 / self.total_ceps as f64) * 100.0).round() as u32
    }
}

/// 爬取进度统计
///
/// 始终满足 `processed = success + errors` 且 `processed <= total_ceps`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlStats {
    /// 已处理数量
    pub processed: i32,
    /// 成功数量
    pub success: i32,
    /// 失败数量
    pub errors: i32,
}

/// 单个任务的终态结果，用于递增爬取统计
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    /// 查询成功
    Success,
    /// 查询失败（包括未找到）
    Error,
}

/// 爬取状态枚举
///
/// 状态转换遵循以下流程：
/// Pending → Running → Finished/Failed
///
/// Finished 和 Failed 是终态，之后不再发生任何转换
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CrawlStatus {
    /// 已创建，尚无任务被领取
    #[default]
    Pending,
    /// 处理中
    Running,
    /// 已完成
    Finished,
    /// 全部失败
    Failed,
}

impl CrawlStatus {
    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, CrawlStatus::Finished | CrawlStatus::Failed)
    }
}

impl fmt::Display for CrawlStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CrawlStatus::Pending => write!(f, "pending"),
            CrawlStatus::Running => write!(f, "running"),
            CrawlStatus::Finished => write!(f, "finished"),
            CrawlStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for CrawlStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(CrawlStatus::Pending),
            "running" => Ok(CrawlStatus::Running),
            "finished" => Ok(CrawlStatus::Finished),
            "failed" => Ok(CrawlStatus::Failed),
            _ => Err(()),
        }
    }
}
