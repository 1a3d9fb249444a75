// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::config::settings::ViaCepSettings;
use crate::domain::models::cep_record::CepRecord;
use crate::domain::services::lookup_service::{CepLookup, LookupError};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// ViaCEP 查询客户端
///
/// 请求 `GET {base_url}/{cep}/json`，并把传输层失败归类为 [`LookupError`]
pub struct ViaCepClient {
    client: reqwest::Client,
    base_url: String,
}

impl ViaCepClient {
    /// 创建客户端
    ///
    /// # 参数
    ///
    /// * `base_url` - 服务基础地址，末尾的 `/` 会被去掉
    /// * `timeout` - 单次请求超时时间
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (compatible; cepcrawl/0.1)")
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_settings(settings: &ViaCepSettings) -> Result<Self, reqwest::Error> {
        Self::new(
            settings.base_url.clone(),
            Duration::from_secs(settings.timeout_secs),
        )
    }

    fn url_for(&self, cep: &str) -> String {
        format!("{}/{}/json", self.base_url, cep)
    }
}

/// 把 reqwest 错误归类
fn classify(error: reqwest::Error) -> LookupError {
    if error.is_timeout() {
        LookupError::Timeout
    } else if error.is_decode() {
        LookupError::MalformedResponse(error.to_string())
    } else if error.is_connect() || error.is_request() || error.is_body() {
        LookupError::Network(error.to_string())
    } else {
        LookupError::Other(error.to_string())
    }
}

/// `erro` 字段可能是布尔值，也可能是字符串 "true"
fn is_not_found(body: &Value) -> bool {
    match body.get("erro") {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::String(flag)) => flag.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

fn parse_body(bytes: &[u8]) -> Result<Option<CepRecord>, LookupError> {
    let body: Value = serde_json::from_slice(bytes)
        .map_err(|e| LookupError::MalformedResponse(e.to_string()))?;

    if !body.is_object() {
        return Err(LookupError::MalformedResponse(
            "expected a JSON object".to_string(),
        ));
    }

    if is_not_found(&body) {
        return Ok(None);
    }

    serde_json::from_value(body)
        .map(Some)
        .map_err(|e| LookupError::MalformedResponse(e.to_string()))
}

#[async_trait]
impl CepLookup for ViaCepClient {
    async fn resolve(&self, cep: &str) -> Result<Option<CepRecord>, LookupError> {
        let response = self
            .client
            .get(self.url_for(cep))
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            warn!(cep, "Rate limit reached");
            return Err(LookupError::RateLimited);
        }
        if !status.is_success() {
            debug!(cep, status = status.as_u16(), "Lookup returned non-success status");
            return Err(LookupError::Http(status.as_u16()));
        }

        let bytes = response.bytes().await.map_err(classify)?;
        parse_body(&bytes)
    }
}
