// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::time::Duration;

/// 重试策略配置
///
/// `retry_count` 始终是持久化在结果行中的已尝试次数，而不是工作器内存中的计数
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 最大尝试次数
    pub max_retries: u32,
    /// 初始退避时间
    pub initial_backoff: Duration,
    /// 最大退避时间
    pub max_backoff: Duration,
    /// 退避乘数
    pub backoff_multiplier: f64,
    /// 抖动因子 (0.0-1.0)
    pub jitter_factor: f64,
    /// 是否启用抖动
    pub enable_jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(60))
    }
}

impl RetryPolicy {
    /// 创建指数退避策略：第 n 次失败后等待 `2^n` 秒，受 `max_backoff` 限制
    pub fn new(max_retries: u32, max_backoff: Duration) -> Self {
        Self {
            max_retries,
            initial_backoff: Duration::from_secs(2),
            max_backoff,
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
            enable_jitter: false,
        }
    }

    /// 启用抖动
    pub fn with_jitter(mut self, jitter_factor: f64) -> Self {
        self.enable_jitter = true;
        self.jitter_factor = jitter_factor.clamp(0.0, 1.0);
        self
    }

    /// 计算已尝试 `retry_count` 次后再次失败时的退避时间
    ///
    /// 未启用抖动时等于 `min(2^(retry_count+1) 秒, max_backoff)`
    pub fn backoff_for(&self, retry_count: u32) -> Duration {
        let exponent = retry_count.min(62) as i32;
        let backoff_secs =
            self.initial_backoff.as_secs_f64() * self.backoff_multiplier.powi(exponent);

        // 限制最大退避时间
        let capped_backoff = backoff_secs.min(self.max_backoff.as_secs_f64());

        let final_backoff = if self.enable_jitter && capped_backoff > 0.0 {
            let jitter_range = capped_backoff * self.jitter_factor;
            let jitter = rand::random_range(-jitter_range..=jitter_range);
            (capped_backoff + jitter).max(0.0)
        } else {
            capped_backoff
        };

        Duration::from_secs_f64(final_backoff)
    }

    /// 已尝试 `retry_count` 次的任务再次失败后是否还应重试
    ///
    /// 本次失败会让持久化计数变为 `retry_count + 1`，达到 `max_retries` 即为终态
    pub fn should_retry(&self, retry_count: u32) -> bool {
        retry_count.saturating_add(1) < self.max_retries
    }
}
