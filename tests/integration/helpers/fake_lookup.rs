// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use cepcrawl::domain::models::cep_record::CepRecord;
use cepcrawl::domain::services::lookup_service::{CepLookup, LookupError};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

/// 可编排的查询服务
///
/// 每个 CEP 可以预置一串响应，依次消费；没有预置时返回一条以 CEP 为内容的成功记录
#[derive(Default)]
pub struct FakeLookup {
    scripted: Mutex<HashMap<String, VecDeque<Result<Option<CepRecord>, LookupError>>>>,
    calls: Mutex<HashMap<String, usize>>,
}

impl FakeLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(&self, cep: &str, responses: Vec<Result<Option<CepRecord>, LookupError>>) {
        self.scripted
            .lock()
            .insert(cep.to_string(), responses.into_iter().collect());
    }

    pub fn not_found(&self, cep: &str) {
        self.script(cep, vec![Ok(None)]);
    }

    pub fn calls(&self, cep: &str) -> usize {
        self.calls.lock().get(cep).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().values().sum()
    }
}

pub fn record(cep: &str) -> CepRecord {
    CepRecord {
        cep: Some(format!("{}-{}", &cep[..5], &cep[5..])),
        localidade: Some("São Paulo".to_string()),
        uf: Some("SP".to_string()),
        ..Default::default()
    }
}

#[async_trait]
impl CepLookup for FakeLookup {
    async fn resolve(&self, cep: &str) -> Result<Option<CepRecord>, LookupError> {
        *self.calls.lock().entry(cep.to_string()).or_insert(0) += 1;

        let scripted = self
            .scripted
            .lock()
            .get_mut(cep)
            .and_then(|responses| responses.pop_front());

        scripted.unwrap_or_else(|| Ok(Some(record(cep))))
    }
}
