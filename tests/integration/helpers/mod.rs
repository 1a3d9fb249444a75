// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod fake_lookup;

use axum_test::TestServer;
use cepcrawl::application::use_cases::crawl_use_case::CrawlUseCase;
use cepcrawl::config::settings::DatabaseSettings;
use cepcrawl::infrastructure::database::connection;
use cepcrawl::infrastructure::repositories::cep_result_repo_impl::CepResultRepositoryImpl;
use cepcrawl::infrastructure::repositories::crawl_repo_impl::CrawlRepositoryImpl;
use cepcrawl::presentation::routes;
use cepcrawl::queue::database_queue::DatabaseJobQueue;
use cepcrawl::queue::job_queue::QueueConfig;
use migration::{Migrator, MigratorTrait};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use std::time::Duration;

pub use fake_lookup::FakeLookup;

/// 每次调用都得到一个独立的、已迁移的内存 SQLite 库
pub async fn setup_db() -> Arc<DatabaseConnection> {
    let settings = DatabaseSettings {
        url: "sqlite::memory:".to_string(),
        max_connections: Some(5),
        min_connections: Some(1),
        connect_timeout: Some(5),
        idle_timeout: Some(60),
    };

    let db = connection::create_pool(&settings)
        .await
        .expect("Failed to open sqlite database");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    Arc::new(db)
}

/// 不做长轮询的队列配置
pub fn queue_config(visibility_timeout: Duration) -> QueueConfig {
    QueueConfig {
        visibility_timeout,
        wait_time: Duration::ZERO,
        poll_interval: Duration::from_millis(10),
        ..Default::default()
    }
}

#[allow(dead_code)]
pub struct TestApp {
    pub server: TestServer,
    pub db: Arc<DatabaseConnection>,
    pub crawl_repo: Arc<CrawlRepositoryImpl>,
    pub result_repo: Arc<CepResultRepositoryImpl>,
    pub queue: Arc<DatabaseJobQueue>,
}

pub async fn create_test_app() -> TestApp {
    create_test_app_with_max_range(10_000).await
}

pub async fn create_test_app_with_max_range(max_range_size: u32) -> TestApp {
    let db = setup_db().await;
    let crawl_repo = Arc::new(CrawlRepositoryImpl::new(db.clone()));
    let result_repo = Arc::new(CepResultRepositoryImpl::new(db.clone()));
    let queue = Arc::new(DatabaseJobQueue::new(
        db.clone(),
        queue_config(Duration::from_secs(120)),
    ));

    let use_case = Arc::new(CrawlUseCase::new(
        crawl_repo.clone(),
        result_repo.clone(),
        queue.clone(),
        max_range_size,
    ));
    let server = TestServer::new(routes::routes(use_case)).unwrap();

    TestApp {
        server,
        db,
        crawl_repo,
        result_repo,
        queue,
    }
}
