// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::models::cep_record::CepRecord;
use crate::domain::models::cep_result::ErrorCode;
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// 查询服务错误
///
/// 每个变体都带有明确的分类，重试判断不依赖错误消息文本
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// 服务端返回限流信号
    #[error("Rate limit exceeded")]
    RateLimited,
    /// 请求超时
    #[error("Request timed out")]
    Timeout,
    /// 非 2xx 状态码
    #[error("HTTP error: {0}")]
    Http(u16),
    /// 连接失败等瞬时网络错误
    #[error("Network error: {0}")]
    Network(String),
    /// 响应无法解析
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("{0}")]
    Other(String),
}

impl LookupError {
    /// 错误分类码
    pub fn code(&self) -> ErrorCode {
        match self {
            LookupError::RateLimited => ErrorCode::RateLimit,
            LookupError::Timeout => ErrorCode::Timeout,
            LookupError::Http(_) => ErrorCode::HttpError,
            LookupError::Network(_) => ErrorCode::NetworkError,
            LookupError::MalformedResponse(_) => ErrorCode::MalformedResponse,
            LookupError::Other(_) => ErrorCode::UnknownError,
        }
    }

    /// 是否为可重试的传输错误
    ///
    /// 限流、超时、5xx 和网络错误可重试；其余 4xx 与响应格式错误立即失败
    pub fn is_retryable(&self) -> bool {
        match self {
            LookupError::RateLimited | LookupError::Timeout | LookupError::Network(_) => true,
            LookupError::Http(status) => (500..600).contains(status),
            LookupError::MalformedResponse(_) | LookupError::Other(_) => false,
        }
    }
}

/// 外部 CEP 查询服务
///
/// `Ok(None)` 表示该 CEP 不存在，是领域层面的结果而不是传输错误
#[async_trait]
pub trait CepLookup: Send + Sync {
    async fn resolve(&self, cep: &str) -> Result<Option<CepRecord>, LookupError>;
}

#[async_trait]
impl<T: CepLookup + ?Sized> CepLookup for Arc<T> {
    async fn resolve(&self, cep: &str) -> Result<Option<CepRecord>, LookupError> {
        (**self).resolve(cep).await
    }
}
