// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use parking_lot::Mutex;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, Semaphore};
use tokio::time::Instant;
use tracing::debug;

/// 能够表示“被对方限流”的错误
///
/// 只有限流信号会放大退避乘数，其他错误不影响节奏
pub trait RateLimitSignal {
    fn is_rate_limit(&self) -> bool;
}

/// 速率限制器配置
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// 每秒请求数
    pub requests_per_second: f64,
    /// 最大并发调用数
    pub concurrency: usize,
    /// 退避乘数上限
    pub max_backoff_multiplier: f64,
    /// 收到限流信号时的乘数增长因子
    pub backoff_increase_factor: f64,
    /// 成功调用后的乘数衰减因子
    pub backoff_decay_factor: f64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 3.0,
            concurrency: 2,
            max_backoff_multiplier: 16.0,
            backoff_increase_factor: 2.0,
            backoff_decay_factor: 0.9,
        }
    }
}

impl RateLimiterConfig {
    /// 基础调度间隔 = 1 秒 / 每秒请求数
    pub fn base_interval(&self) -> Duration {
        if self.requests_per_second <= 0.0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(1.0 / self.requests_per_second)
    }
}

/// 速率限制器状态快照
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimiterStatus {
    pub active: usize,
    pub concurrency: usize,
    pub backoff_multiplier: f64,
    pub effective_interval: Duration,
}

/// 自适应速率限制器
///
/// 同时限制并发数和调度节奏。所有调用者共享同一个调度时钟：
/// 两次调度之间至少间隔 `base_interval × backoff_multiplier`。
/// 收到限流信号时乘数按因子放大（有上限），成功后按因子衰减（下限为 1）。
///
/// 只在进程内生效，多个工作进程之间不做协调
pub struct AdaptiveRateLimiter {
    config: RateLimiterConfig,
    permits: Semaphore,
    last_dispatch: AsyncMutex<Option<Instant>>,
    backoff_multiplier: Mutex<f64>,
    active: AtomicUsize,
}

struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl AdaptiveRateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        let concurrency = config.concurrency.max(1);
        Self {
            permits: Semaphore::new(concurrency),
            last_dispatch: AsyncMutex::new(None),
            backoff_multiplier: Mutex::new(1.0),
            active: AtomicUsize::new(0),
            config,
        }
    }

    /// 在并发和节奏限制下执行一次调用
    ///
    /// 调用的结果原样返回；无论成功失败，并发名额都会在返回前释放
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: RateLimitSignal,
    {
        // 信号量从不关闭
        let _permit = self.permits.acquire().await.ok();

        self.wait_for_dispatch_slot().await;

        self.active.fetch_add(1, Ordering::SeqCst);
        let _active = ActiveGuard(&self.active);

        let result = operation().await;
        match &result {
            Ok(_) => self.record_success(),
            Err(e) if e.is_rate_limit() => self.record_rate_limit(),
            Err(_) => {}
        }
        result
    }

    /// 当前状态
    pub fn status(&self) -> RateLimiterStatus {
        let multiplier = *self.backoff_multiplier.lock();
        RateLimiterStatus {
            active: self.active.load(Ordering::SeqCst),
            concurrency: self.config.concurrency.max(1),
            backoff_multiplier: multiplier,
            effective_interval: self.config.base_interval().mul_f64(multiplier),
        }
    }

    fn effective_interval(&self) -> Duration {
        let multiplier = *self.backoff_multiplier.lock();
        self.config.base_interval().mul_f64(multiplier)
    }

    async fn wait_for_dispatch_slot(&self) {
        // 持锁等待，保证调度严格按共享时钟串行
        let mut last = self.last_dispatch.lock().await;
        if let Some(previous) = *last {
            let next = previous + self.effective_interval();
            if next > Instant::now() {
                tokio::time::sleep_until(next).await;
            }
        }
        *last = Some(Instant::now());
    }

    fn record_success(&self) {
        let mut multiplier = self.backoff_multiplier.lock();
        if *multiplier > 1.0 {
            *multiplier = (*multiplier * self.config.backoff_decay_factor).max(1.0);
            metrics::gauge!("rate_limiter_backoff_multiplier").set(*multiplier);
        }
    }

    fn record_rate_limit(&self) {
        let mut multiplier = self.backoff_multiplier.lock();
        *multiplier = (*multiplier * self.config.backoff_increase_factor)
            .min(self.config.max_backoff_multiplier)
            .max(1.0);

        metrics::counter!("rate_limiter_backoff_increases_total").increment(1);
        metrics::gauge!("rate_limiter_backoff_multiplier").set(*multiplier);
        debug!(backoff_multiplier = *multiplier, "Rate limit signal received");
    }
}
