// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 队列中的单个查询任务
///
/// 不单独持久化，唯一的持久痕迹是它产生的结果行
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CepJob {
    pub crawl_id: Uuid,
    pub cep: String,
}

impl CepJob {
    pub fn new(crawl_id: Uuid, cep: impl Into<String>) -> Self {
        Self {
            crawl_id,
            cep: cep.into(),
        }
    }
}

/// 从队列接收到的任务及其确认凭据
#[derive(Debug, Clone)]
pub struct ReceivedJob {
    pub job: CepJob,
    /// 确认凭据，仅在本次投递的可见性超时内有效
    pub receipt: String,
}
