// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{create_test_app, queue_config, setup_db, FakeLookup, TestApp};
use axum::http::StatusCode;
use cepcrawl::domain::models::cep_result::{CepResultStatus, ErrorCode};
use cepcrawl::domain::models::crawl::{Crawl, CrawlStatus};
use cepcrawl::domain::models::job::CepJob;
use cepcrawl::domain::repositories::cep_result_repository::CepResultRepository;
use cepcrawl::domain::repositories::crawl_repository::CrawlRepository;
use cepcrawl::domain::services::lookup_service::LookupError;
use cepcrawl::infrastructure::repositories::cep_result_repo_impl::CepResultRepositoryImpl;
use cepcrawl::infrastructure::repositories::crawl_repo_impl::CrawlRepositoryImpl;
use cepcrawl::queue::database_queue::DatabaseJobQueue;
use cepcrawl::queue::job_queue::JobQueue;
use cepcrawl::utils::retry_policy::RetryPolicy;
use cepcrawl::workers::cep_worker::{CepWorker, JobDisposition, WorkerConfig};
use cepcrawl::workers::manager::WorkerManager;
use cepcrawl::workers::rate_limiter::{AdaptiveRateLimiter, RateLimiterConfig};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

fn fast_limiter() -> Arc<AdaptiveRateLimiter> {
    Arc::new(AdaptiveRateLimiter::new(RateLimiterConfig {
        requests_per_second: 1000.0,
        concurrency: 4,
        ..Default::default()
    }))
}

fn fast_worker_config() -> WorkerConfig {
    WorkerConfig {
        batch_size: 10,
        idle_backoff: Duration::from_millis(20),
        error_backoff: Duration::from_millis(50),
        retry_policy: RetryPolicy {
            initial_backoff: Duration::from_millis(10),
            ..RetryPolicy::new(3, Duration::from_millis(50))
        },
    }
}

/// 轮询直到批次进入终态
async fn wait_for_terminal(repo: &CrawlRepositoryImpl, crawl_id: Uuid) -> Crawl {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(15);
    loop {
        let crawl = repo.find_by_id(crawl_id).await.unwrap().unwrap();
        if crawl.status.is_terminal() {
            return crawl;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "crawl {} did not finish: {:?}",
            crawl_id,
            crawl.stats
        );
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

async fn submit(app: &TestApp, start: &str, end: &str) -> Uuid {
    let response = app
        .server
        .post("/cep/crawl")
        .json(&json!({ "cep_start": start, "cep_end": end }))
        .await;
    assert_eq!(response.status_code(), StatusCode::ACCEPTED);
    let body: Value = response.json();
    Uuid::parse_str(body["crawl_id"].as_str().unwrap()).unwrap()
}

fn manager_for(
    app: &TestApp,
    lookup: Arc<FakeLookup>,
    visibility_timeout: Duration,
) -> WorkerManager<DatabaseJobQueue, FakeLookup, CrawlRepositoryImpl, CepResultRepositoryImpl> {
    WorkerManager::new(
        Arc::new(DatabaseJobQueue::new(
            app.db.clone(),
            queue_config(visibility_timeout),
        )),
        lookup,
        app.crawl_repo.clone(),
        app.result_repo.clone(),
        fast_limiter(),
        fast_worker_config(),
    )
}

#[tokio::test]
async fn test_submitted_crawl_is_processed_to_completion() {
    let app = create_test_app().await;
    let lookup = Arc::new(FakeLookup::new());
    lookup.not_found("01000003");

    let crawl_id = submit(&app, "01000000", "01000004").await;

    let mut manager = manager_for(&app, lookup.clone(), Duration::from_secs(120));
    manager.start_workers(2);
    let crawl = wait_for_terminal(&app.crawl_repo, crawl_id).await;
    manager.shutdown().await;

    assert_eq!(crawl.status, CrawlStatus::Finished);
    assert_eq!(crawl.stats.processed, 5);
    assert_eq!(crawl.stats.success, 4);
    assert_eq!(crawl.stats.errors, 1);
    assert!(crawl.finished_at.is_some());
    assert_eq!(app.queue.len().await.unwrap(), 0);
    assert_eq!(lookup.total_calls(), 5);

    let status: Value = app
        .server
        .get(&format!("/cep/crawl/{}", crawl_id))
        .await
        .json();
    assert_eq!(status["status"], "finished");
    assert_eq!(status["progress_percentage"], 100);

    let results: Value = app
        .server
        .get(&format!("/cep/crawl/{}/results", crawl_id))
        .await
        .json();
    assert_eq!(results["total"], 5);
    let missing = results["results"]
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["cep"] == "01000003")
        .unwrap();
    assert_eq!(missing["status"], "error");
    assert_eq!(missing["error"]["code"], "CEP_NOT_FOUND");
}

#[tokio::test]
async fn test_crawl_where_every_lookup_fails_is_failed() {
    let app = create_test_app().await;
    let lookup = Arc::new(FakeLookup::new());
    for cep in ["01000000", "01000001"] {
        lookup.script(cep, vec![Err(LookupError::Http(404))]);
    }

    let crawl_id = submit(&app, "01000000", "01000001").await;

    let mut manager = manager_for(&app, lookup, Duration::from_secs(120));
    manager.start_workers(1);
    let crawl = wait_for_terminal(&app.crawl_repo, crawl_id).await;
    manager.shutdown().await;

    assert_eq!(crawl.status, CrawlStatus::Failed);
    assert_eq!(crawl.stats.errors, 2);

    let result = app.result_repo.find(crawl_id, "01000000").await.unwrap().unwrap();
    let error = result.error.unwrap();
    assert_eq!(error.code, ErrorCode::HttpError);
    // 4xx 不重试
    assert_eq!(result.retry_count, 0);
}

#[tokio::test]
async fn test_transient_failure_is_retried_after_redelivery() {
    let app = create_test_app().await;
    let lookup = Arc::new(FakeLookup::new());
    lookup.script(
        "01000001",
        vec![
            Err(LookupError::Http(503)),
            Err(LookupError::Timeout),
        ],
    );

    let crawl_id = submit(&app, "01000000", "01000002").await;

    let mut manager = manager_for(&app, lookup.clone(), Duration::from_millis(200));
    manager.start_workers(1);
    let crawl = wait_for_terminal(&app.crawl_repo, crawl_id).await;
    manager.shutdown().await;

    assert_eq!(crawl.status, CrawlStatus::Finished);
    assert_eq!(crawl.stats.success, 3);
    assert_eq!(crawl.stats.processed, 3);
    assert_eq!(lookup.calls("01000001"), 3);

    let result = app.result_repo.find(crawl_id, "01000001").await.unwrap().unwrap();
    assert_eq!(result.status, CepResultStatus::Success);
    assert_eq!(result.retry_count, 2);
}

#[tokio::test]
async fn test_retries_stop_at_threshold() {
    let app = create_test_app().await;
    let lookup = Arc::new(FakeLookup::new());
    lookup.script(
        "01000000",
        vec![
            Err(LookupError::Http(503)),
            Err(LookupError::Http(503)),
            Err(LookupError::Http(503)),
            Ok(None),
        ],
    );

    let crawl_id = submit(&app, "01000000", "01000000").await;

    let mut manager = manager_for(&app, lookup.clone(), Duration::from_millis(200));
    manager.start_workers(1);
    let crawl = wait_for_terminal(&app.crawl_repo, crawl_id).await;
    manager.shutdown().await;

    assert_eq!(crawl.status, CrawlStatus::Failed);
    assert_eq!(lookup.calls("01000000"), 3);

    let result = app.result_repo.find(crawl_id, "01000000").await.unwrap().unwrap();
    assert_eq!(result.status, CepResultStatus::Error);
    assert_eq!(result.error.unwrap().code, ErrorCode::HttpError);
    assert_eq!(result.retry_count, 2);
    assert_eq!(app.queue.len().await.unwrap(), 0);
}

#[tokio::test]
async fn test_duplicate_delivery_is_counted_once() {
    let db = setup_db().await;
    let crawl_repo = Arc::new(CrawlRepositoryImpl::new(db.clone()));
    let result_repo = Arc::new(CepResultRepositoryImpl::new(db.clone()));
    // 可见性超时为零，同一条消息可以被连续接收两次
    let queue = Arc::new(DatabaseJobQueue::new(db, queue_config(Duration::ZERO)));
    let lookup = Arc::new(FakeLookup::new());

    let crawl = Crawl::new("01000000".to_string(), "01000001".to_string(), 2);
    crawl_repo.create(&crawl).await.unwrap();
    queue
        .enqueue(CepJob::new(crawl.id, "01000000"))
        .await
        .unwrap();

    let mut deliveries = queue.receive(10).await.unwrap();
    deliveries.extend(queue.receive(10).await.unwrap());
    assert_eq!(deliveries.len(), 2);

    let worker = CepWorker::new(
        0,
        queue.clone(),
        lookup.clone(),
        crawl_repo.clone(),
        result_repo.clone(),
        fast_limiter(),
        fast_worker_config(),
    );
    let token = CancellationToken::new();

    let first = worker
        .process_batch(vec![deliveries.remove(0)], &token)
        .await
        .unwrap();
    let second = worker
        .process_batch(vec![deliveries.remove(0)], &token)
        .await
        .unwrap();

    assert!(matches!(first[0], JobDisposition::Completed(_)));
    assert_eq!(second[0], JobDisposition::Duplicate);

    let stored = crawl_repo.find_by_id(crawl.id).await.unwrap().unwrap();
    assert_eq!(stored.stats.processed, 1);
    assert_eq!(stored.stats.success, 1);
    assert_eq!(stored.status, CrawlStatus::Running);
    assert_eq!(lookup.calls("01000000"), 1);
    assert_eq!(queue.len().await.unwrap(), 0);
}
