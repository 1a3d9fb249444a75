// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

static CEP_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{8}$").unwrap());

/// 提交爬取请求
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct CrawlRequestDto {
    #[validate(regex(path = *CEP_REGEX, message = "cep_start must contain exactly 8 digits"))]
    pub cep_start: String,
    #[validate(regex(path = *CEP_REGEX, message = "cep_end must contain exactly 8 digits"))]
    pub cep_end: String,
}

/// 结果分页查询参数
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ResultsQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl ResultsQuery {
    pub const DEFAULT_PAGE: u32 = 1;
    pub const DEFAULT_LIMIT: u32 = 20;
    pub const MAX_LIMIT: u32 = 100;

    pub fn page(&self) -> u32 {
        self.page.unwrap_or(Self::DEFAULT_PAGE)
    }

    pub fn limit(&self) -> u32 {
        self.limit.unwrap_or(Self::DEFAULT_LIMIT)
    }
}

/// 把校验错误压平成一条可读消息，按字段名排序保证输出稳定
pub fn validation_message(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    fields
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| match &e.message {
                Some(message) => message.to_string(),
                None => format!("{} is invalid", field),
            })
        })
        .collect::<Vec<_>>()
        .join("; ")
}
