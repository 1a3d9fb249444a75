// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};

/// 查询服务返回的地址记录
///
/// 字段名沿用 ViaCEP 的响应格式，所有字段都可能缺失
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CepRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cep: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logradouro: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complemento: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bairro: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub localidade: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uf: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ibge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gia: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ddd: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub siafi: Option<String>,
}
