// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::cep_record::CepRecord;

/// 单个 CEP 的查询结果
///
/// 以 (crawl_id, cep) 为唯一键，写入是幂等的 upsert
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CepResult {
    pub crawl_id: Uuid,
    pub cep: String,
    pub status: CepResultStatus,
    /// 成功时的地址数据
    pub data: Option<CepRecord>,
    /// 失败时的错误信息
    pub error: Option<ResultError>,
    /// 已尝试次数
    pub retry_count: i32,
    /// 最后写入时间
    pub processed_at: DateTime<Utc>,
}

impl CepResult {
    pub fn success(crawl_id: Uuid, cep: &str, data: CepRecord, retry_count: i32) -> Self {
        Self {
            crawl_id,
            cep: cep.to_string(),
            status: CepResultStatus::Success,
            data: Some(data),
            error: None,
            retry_count,
            processed_at: Utc::now(),
        }
    }

    pub fn error(crawl_id: Uuid, cep: &str, error: ResultError, retry_count: i32) -> Self {
        Self {
            crawl_id,
            cep: cep.to_string(),
            status: CepResultStatus::Error,
            data: None,
            error: Some(error),
            retry_count,
            processed_at: Utc::now(),
        }
    }

    pub fn pending(crawl_id: Uuid, cep: &str, error: ResultError, retry_count: i32) -> Self {
        Self {
            crawl_id,
            cep: cep.to_string(),
            status: CepResultStatus::Pending,
            data: None,
            error: Some(error),
            retry_count,
            processed_at: Utc::now(),
        }
    }
}

/// 结果状态
///
/// `Pending` 表示至少尝试过一次，正在等待重试
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CepResultStatus {
    Pending,
    Success,
    Error,
}

impl CepResultStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, CepResultStatus::Pending)
    }
}

impl fmt::Display for CepResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CepResultStatus::Pending => write!(f, "pending"),
            CepResultStatus::Success => write!(f, "success"),
            CepResultStatus::Error => write!(f, "error"),
        }
    }
}

impl FromStr for CepResultStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(CepResultStatus::Pending),
            "success" => Ok(CepResultStatus::Success),
            "error" => Ok(CepResultStatus::Error),
            _ => Err(()),
        }
    }
}

/// 持久化的错误信息
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResultError {
    pub message: String,
    pub code: ErrorCode,
}

impl ResultError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code,
        }
    }

    /// CEP 不存在
    pub fn not_found() -> Self {
        Self::new(ErrorCode::CepNotFound, "CEP not found")
    }
}

/// 错误分类码
///
/// 取代按错误消息字符串匹配的分类方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    RateLimit,
    Timeout,
    HttpError,
    NetworkError,
    MalformedResponse,
    CepNotFound,
    UnknownError,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let code = match self {
            ErrorCode::RateLimit => "RATE_LIMIT",
            ErrorCode::Timeout => "TIMEOUT",
            ErrorCode::HttpError => "HTTP_ERROR",
            ErrorCode::NetworkError => "NETWORK_ERROR",
            ErrorCode::MalformedResponse => "MALFORMED_RESPONSE",
            ErrorCode::CepNotFound => "CEP_NOT_FOUND",
            ErrorCode::UnknownError => "UNKNOWN_ERROR",
        };
        f.write_str(code)
    }
}

impl FromStr for ErrorCode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RATE_LIMIT" => Ok(ErrorCode::RateLimit),
            "TIMEOUT" => Ok(ErrorCode::Timeout),
            "HTTP_ERROR" => Ok(ErrorCode::HttpError),
            "NETWORK_ERROR" => Ok(ErrorCode::NetworkError),
            "MALFORMED_RESPONSE" => Ok(ErrorCode::MalformedResponse),
            "CEP_NOT_FOUND" => Ok(ErrorCode::CepNotFound),
            "UNKNOWN_ERROR" => Ok(ErrorCode::UnknownError),
            _ => Err(()),
        }
    }
}
