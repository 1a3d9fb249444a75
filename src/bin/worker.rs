// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use cepcrawl::config::settings::Settings;
use cepcrawl::infrastructure::database::connection;
use cepcrawl::infrastructure::metrics::init_metrics;
use cepcrawl::infrastructure::repositories::cep_result_repo_impl::CepResultRepositoryImpl;
use cepcrawl::infrastructure::repositories::crawl_repo_impl::CrawlRepositoryImpl;
use cepcrawl::infrastructure::services::viacep_client::ViaCepClient;
use cepcrawl::queue::database_queue::DatabaseJobQueue;
use cepcrawl::utils::telemetry;
use cepcrawl::workers::manager::WorkerManager;
use cepcrawl::workers::rate_limiter::AdaptiveRateLimiter;
use migration::{Migrator, MigratorTrait};
use std::sync::Arc;
use tracing::info;

/// 独立工作进程
///
/// 只消费队列，不提供 HTTP 接口；收到 SIGINT/SIGTERM 后处理完当前批次再退出
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_telemetry();
    info!("Starting cepcrawl worker...");

    let settings = Settings::new()?;
    init_metrics(&settings.metrics);

    let db = Arc::new(connection::create_pool(&settings.database).await?);
    Migrator::up(db.as_ref(), None).await?;
    info!("Database ready");

    let queue = Arc::new(DatabaseJobQueue::new(db.clone(), settings.queue.to_config()));
    let lookup = Arc::new(ViaCepClient::from_settings(&settings.viacep)?);
    let rate_limiter = Arc::new(AdaptiveRateLimiter::new(settings.rate_limit.to_config()));

    let mut manager = WorkerManager::new(
        queue,
        lookup,
        Arc::new(CrawlRepositoryImpl::new(db.clone())),
        Arc::new(CepResultRepositoryImpl::new(db)),
        rate_limiter,
        settings.worker.to_config(),
    );
    manager.start_workers(settings.worker.count.max(1));
    manager.wait_for_shutdown().await;

    info!("Worker process stopped");
    Ok(())
}
