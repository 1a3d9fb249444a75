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

use cepcrawl::application::use_cases::crawl_use_case::CrawlUseCase;
use cepcrawl::config::settings::Settings;
use cepcrawl::infrastructure::database::connection;
use cepcrawl::infrastructure::metrics::init_metrics;
use cepcrawl::infrastructure::repositories::cep_result_repo_impl::CepResultRepositoryImpl;
use cepcrawl::infrastructure::repositories::crawl_repo_impl::CrawlRepositoryImpl;
use cepcrawl::infrastructure::services::viacep_client::ViaCepClient;
use cepcrawl::presentation::routes;
use cepcrawl::queue::database_queue::DatabaseJobQueue;
use cepcrawl::utils::telemetry;
use cepcrawl::workers::manager::{shutdown_signal, WorkerManager};
use cepcrawl::workers::rate_limiter::AdaptiveRateLimiter;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use migration::{Migrator, MigratorTrait};

/// 主函数
///
/// 启动 HTTP API，按配置在同一进程内运行工作器
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting cepcrawl...");

    // 2. Load configuration
    let settings = Settings::new()?;
    info!("Configuration loaded");

    init_metrics(&settings.metrics);

    // 3. Connect to database
    let db = Arc::new(connection::create_pool(&settings.database).await?);
    info!("Database connection established");

    info!("Running database migrations...");
    Migrator::up(db.as_ref(), None).await?;
    info!("Database migrations applied");

    // 4. Initialize components
    let crawl_repo = Arc::new(CrawlRepositoryImpl::new(db.clone()));
    let result_repo = Arc::new(CepResultRepositoryImpl::new(db.clone()));
    let queue = Arc::new(DatabaseJobQueue::new(db.clone(), settings.queue.to_config()));

    // 5. Start embedded workers
    let mut worker_manager = if settings.worker.embedded {
        let lookup = Arc::new(ViaCepClient::from_settings(&settings.viacep)?);
        let rate_limiter = Arc::new(AdaptiveRateLimiter::new(settings.rate_limit.to_config()));
        let mut manager = WorkerManager::new(
            queue.clone(),
            lookup,
            crawl_repo.clone(),
            result_repo.clone(),
            rate_limiter,
            settings.worker.to_config(),
        );
        manager.start_workers(settings.worker.count);
        Some(manager)
    } else {
        info!("Embedded workers disabled");
        None
    };

    // 6. Start HTTP server
    let use_case = Arc::new(CrawlUseCase::new(
        crawl_repo,
        result_repo,
        queue,
        settings.crawl.max_range_size,
    ));
    let app = routes::routes(use_case);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(manager) = worker_manager.as_mut() {
        manager.shutdown().await;
    }

    info!("Server stopped");
    Ok(())
}
