// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use thiserror::Error;

use crate::domain::repositories::RepositoryError;
use crate::queue::job_queue::QueueError;

/// Worker错误类型
///
/// 只在处理循环边界上出现：记录日志后按固定间隔退避，绝不终止工作器
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("仓库错误: {0}")]
    Repository(#[from] RepositoryError),

    #[error("队列错误: {0}")]
    Queue(#[from] QueueError),
}
