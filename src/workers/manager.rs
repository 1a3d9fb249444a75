// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::domain::repositories::cep_result_repository::CepResultRepository;
use crate::domain::repositories::crawl_repository::CrawlRepository;
use crate::domain::services::lookup_service::CepLookup;
use crate::queue::job_queue::JobQueue;
use crate::workers::cep_worker::{CepWorker, WorkerConfig};
use crate::workers::rate_limiter::AdaptiveRateLimiter;
use crate::workers::worker::Worker;
use std::sync::Arc;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// 工作器管理器
///
/// 同一进程内的所有工作器共享一个速率限制器
pub struct WorkerManager<Q, L, C, R>
where
    Q: JobQueue + 'static,
    L: CepLookup + 'static,
    C: CrawlRepository + 'static,
    R: CepResultRepository + 'static,
{
    queue: Arc<Q>,
    lookup: Arc<L>,
    crawl_repository: Arc<C>,
    result_repository: Arc<R>,
    rate_limiter: Arc<AdaptiveRateLimiter>,
    config: WorkerConfig,
    token: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl<Q, L, C, R> WorkerManager<Q, L, C, R>
where
    Q: JobQueue + 'static,
    L: CepLookup + 'static,
    C: CrawlRepository + 'static,
    R: CepResultRepository + 'static,
{
    pub fn new(
        queue: Arc<Q>,
        lookup: Arc<L>,
        crawl_repository: Arc<C>,
        result_repository: Arc<R>,
        rate_limiter: Arc<AdaptiveRateLimiter>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            queue,
            lookup,
            crawl_repository,
            result_repository,
            rate_limiter,
            config,
            token: CancellationToken::new(),
            handles: Vec::new(),
        }
    }

    /// 停止信号，取消后所有工作器在当前批次完成后退出
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// 正在运行的工作器数量
    pub fn running(&self) -> usize {
        self.handles.iter().filter(|h| !h.is_finished()).count()
    }

    pub fn start_workers(&mut self, count: usize) {
        for _ in 0..count {
            let worker = CepWorker::new(
                self.handles.len(),
                self.queue.clone(),
                self.lookup.clone(),
                self.crawl_repository.clone(),
                self.result_repository.clone(),
                self.rate_limiter.clone(),
                self.config.clone(),
            );

            let token = self.token.clone();
            let handle = tokio::spawn(async move {
                if let Err(e) = worker.run(token).await {
                    error!(worker = worker.name(), "Worker exited with error: {}", e);
                }
            });
            self.handles.push(handle);
        }
        info!(count, "Workers started");
    }

    /// 发出停止信号并等待所有工作器处理完当前批次
    pub async fn shutdown(&mut self) {
        info!("Shutting down workers...");
        self.token.cancel();

        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                error!("Worker task failed: {}", e);
            }
        }

        info!("Workers shut down successfully");
    }

    /// 等待进程停止信号后关闭所有工作器
    pub async fn wait_for_shutdown(&mut self) {
        shutdown_signal().await;
        self.shutdown().await;
    }
}

/// 等待 Ctrl+C 或 SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!("Unable to listen for shutdown signal: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                error!("Unable to listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
