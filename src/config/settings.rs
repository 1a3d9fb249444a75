// Copyright 2025 Kirky.X
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

use crate::queue::job_queue::QueueConfig;
use crate::utils::retry_policy::RetryPolicy;
use crate::workers::cep_worker::WorkerConfig;
use crate::workers::rate_limiter::RateLimiterConfig;

/// 应用程序配置设置
///
/// 包含数据库、服务器、队列、限流、工作器和外部查询服务等所有配置项
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 数据库配置
    pub database: DatabaseSettings,
    /// 服务器配置
    pub server: ServerSettings,
    /// 爬取范围配置
    pub crawl: CrawlSettings,
    /// 队列配置
    pub queue: QueueSettings,
    /// 速率限制配置
    pub rate_limit: RateLimitSettings,
    /// 工作器配置
    pub worker: WorkerSettings,
    /// ViaCEP 服务配置
    pub viacep: ViaCepSettings,
    /// 指标导出配置
    pub metrics: MetricsSettings,
}

/// 数据库配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    /// 数据库连接URL
    pub url: String,
    /// 最大连接数
    pub max_connections: Option<u32>,
    /// 最小连接数
    pub min_connections: Option<u32>,
    /// 连接超时时间（秒）
    pub connect_timeout: Option<u64>,
    /// 空闲连接超时时间（秒）
    pub idle_timeout: Option<u64>,
}

/// 服务器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    /// 服务器监听主机地址
    pub host: String,
    /// 服务器监听端口
    pub port: u16,
}

/// 爬取范围配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlSettings {
    /// 单次爬取允许的最大 CEP 数量
    pub max_range_size: u32,
}

/// 队列配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct QueueSettings {
    /// 消息被接收后不可见的时长（秒）
    pub visibility_timeout_secs: u64,
    /// 长轮询等待时长（秒）
    pub wait_time_secs: u64,
    /// 长轮询内部的轮询间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 单次批量发送的最大消息数
    pub max_batch_size: usize,
}

/// 速率限制配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSettings {
    /// 每秒请求数
    pub requests_per_second: f64,
    /// 最大并发请求数
    pub concurrency: usize,
    /// 退避乘数上限
    pub max_backoff_multiplier: f64,
    /// 遇到限流信号时的乘数增长因子
    pub backoff_increase_factor: f64,
    /// 成功调用后的乘数衰减因子
    pub backoff_decay_factor: f64,
}

/// 工作器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerSettings {
    /// 每个进程启动的工作器数量
    pub count: usize,
    /// 每次从队列接收的最大消息数
    pub batch_size: usize,
    /// 最大重试次数
    pub max_retries: u32,
    /// 队列为空时的休眠时间（毫秒）
    pub idle_backoff_ms: u64,
    /// 处理循环出错后的休眠时间（毫秒）
    pub error_backoff_ms: u64,
    /// 重试退避的上限（秒）
    pub max_retry_backoff_secs: u64,
    /// API 进程是否同时运行工作器
    pub embedded: bool,
}

/// ViaCEP 配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ViaCepSettings {
    /// 服务基础地址
    pub base_url: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

/// 指标导出配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsSettings {
    /// 是否启用 Prometheus 导出
    pub enabled: bool,
    /// 导出器监听地址
    pub listen: String,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 依次加载内置默认值、`config/default`、`config/{APP_ENVIRONMENT}`
    /// 以及 `CEPCRAWL__` 前缀的环境变量，后者优先级最高
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载的配置
    /// * `Err(ConfigError)` - 配置加载失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        Self::builder()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(Environment::with_prefix("CEPCRAWL").separator("__"))
            .build()?
            .try_deserialize()
    }

    /// 仅使用内置默认值构建配置，不读取文件和环境变量
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::builder()?.build()?.try_deserialize()
    }

    fn builder() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
        Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3000)?
            .set_default("database.url", "sqlite::memory:")?
            .set_default("database.max_connections", 20)?
            .set_default("database.min_connections", 1)?
            .set_default("database.connect_timeout", 10)?
            .set_default("database.idle_timeout", 300)?
            .set_default("crawl.max_range_size", 10_000)?
            .set_default("queue.visibility_timeout_secs", 120)?
            .set_default("queue.wait_time_secs", 20)?
            .set_default("queue.poll_interval_ms", 500)?
            .set_default("queue.max_batch_size", 10)?
            .set_default("rate_limit.requests_per_second", 3.0)?
            .set_default("rate_limit.concurrency", 2)?
            .set_default("rate_limit.max_backoff_multiplier", 16.0)?
            .set_default("rate_limit.backoff_increase_factor", 2.0)?
            .set_default("rate_limit.backoff_decay_factor", 0.9)?
            .set_default("worker.count", 1)?
            .set_default("worker.batch_size", 10)?
            .set_default("worker.max_retries", 3)?
            .set_default("worker.idle_backoff_ms", 1000)?
            .set_default("worker.error_backoff_ms", 5000)?
            .set_default("worker.max_retry_backoff_secs", 60)?
            .set_default("worker.embedded", true)?
            .set_default("viacep.base_url", "https://viacep.com.br/ws")?
            .set_default("viacep.timeout_secs", 10)?
            .set_default("metrics.enabled", true)?
            .set_default("metrics.listen", "0.0.0.0:9000")
    }
}

impl QueueSettings {
    pub fn to_config(&self) -> QueueConfig {
        QueueConfig {
            visibility_timeout: Duration::from_secs(self.visibility_timeout_secs),
            wait_time: Duration::from_secs(self.wait_time_secs),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            max_batch_size: self.max_batch_size,
        }
    }
}

impl RateLimitSettings {
    pub fn to_config(&self) -> RateLimiterConfig {
        RateLimiterConfig {
            requests_per_second: self.requests_per_second,
            concurrency: self.concurrency,
            max_backoff_multiplier: self.max_backoff_multiplier,
            backoff_increase_factor: self.backoff_increase_factor,
            backoff_decay_factor: self.backoff_decay_factor,
        }
    }
}

impl WorkerSettings {
    pub fn to_config(&self) -> WorkerConfig {
        WorkerConfig {
            batch_size: self.batch_size,
            idle_backoff: Duration::from_millis(self.idle_backoff_ms),
            error_backoff: Duration::from_millis(self.error_backoff_ms),
            retry_policy: RetryPolicy::new(
                self.max_retries,
                Duration::from_secs(self.max_retry_backoff_secs),
            ),
        }
    }
}
