// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use thiserror::Error;

/// CEP 固定位数
pub const CEP_LENGTH: usize = 8;

/// 范围校验错误
///
/// 在创建任何批次或任务之前返回，校验本身没有副作用
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    #[error("{field} must contain exactly 8 digits")]
    InvalidFormat { field: &'static str },
    #[error("cep_start must be less than or equal to cep_end")]
    StartAfterEnd,
    #[error("Range too large. Maximum allowed: {max} CEPs")]
    RangeTooLarge { max: u32 },
}

/// 已校验的 CEP 闭区间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CepRange {
    start: u32,
    end: u32,
}

impl CepRange {
    /// 校验起止 CEP 并构造区间
    ///
    /// 依次检查格式、起止顺序和区间大小
    pub fn parse(start: &str, end: &str, max_size: u32) -> Result<Self, RangeError> {
        let start = parse_cep(start, "cep_start")?;
        let end = parse_cep(end, "cep_end")?;

        if start > end {
            return Err(RangeError::StartAfterEnd);
        }

        let range = Self { start, end };
        if range.len() > max_size as usize {
            return Err(RangeError::RangeTooLarge { max: max_size });
        }

        Ok(range)
    }

    /// 区间内 CEP 数量（包含两端），已校验的区间至少为 1
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        (self.end - self.start) as usize + 1
    }

    pub fn start(&self) -> String {
        format_cep(self.start)
    }

    pub fn end(&self) -> String {
        format_cep(self.end)
    }

    /// 按升序展开区间内所有 CEP，补零到 8 位
    pub fn codes(&self) -> impl Iterator<Item = String> {
        (self.start..=self.end).map(format_cep)
    }
}

fn parse_cep(value: &str, field: &'static str) -> Result<u32, RangeError> {
    if value.len() != CEP_LENGTH || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(RangeError::InvalidFormat { field });
    }
    value
        .parse::<u32>()
        .map_err(|_| RangeError::InvalidFormat { field })
}

fn format_cep(value: u32) -> String {
    format!("{:0width$}", value, width = CEP_LENGTH)
}
