// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::super::helpers::{fake_lookup::record, setup_db};
use cepcrawl::domain::models::cep_result::{CepResult, CepResultStatus, ErrorCode, ResultError};
use cepcrawl::domain::models::crawl::{Crawl, JobOutcome};
use cepcrawl::domain::repositories::cep_result_repository::CepResultRepository;
use cepcrawl::domain::repositories::crawl_repository::{CrawlRepository, RepositoryError};
use cepcrawl::infrastructure::database::entities::cep_result as result_entity;
use cepcrawl::infrastructure::repositories::cep_result_repo_impl::CepResultRepositoryImpl;
use cepcrawl::infrastructure::repositories::crawl_repo_impl::CrawlRepositoryImpl;
use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, Set};
use uuid::Uuid;

async fn repo() -> CepResultRepositoryImpl {
    CepResultRepositoryImpl::new(setup_db().await)
}

fn timeout() -> ResultError {
    ResultError::new(ErrorCode::Timeout, "Request timed out")
}

#[tokio::test]
async fn test_success_result_round_trip() {
    let repo = repo().await;
    let crawl_id = Uuid::new_v4();

    let result = CepResult::success(crawl_id, "01001000", record("01001000"), 1);
    assert!(repo.upsert(&result).await.unwrap());

    let found = repo.find(crawl_id, "01001000").await.unwrap().unwrap();
    assert_eq!(found.status, CepResultStatus::Success);
    assert_eq!(found.data, Some(record("01001000")));
    assert!(found.error.is_none());
    assert_eq!(found.retry_count, 1);

    assert!(repo.find(crawl_id, "01001001").await.unwrap().is_none());
    assert!(repo.find(Uuid::new_v4(), "01001000").await.unwrap().is_none());
}

#[tokio::test]
async fn test_error_result_keeps_code_and_message() {
    let repo = repo().await;
    let crawl_id = Uuid::new_v4();

    let result = CepResult::error(crawl_id, "99999999", ResultError::not_found(), 0);
    repo.upsert(&result).await.unwrap();

    let found = repo.find(crawl_id, "99999999").await.unwrap().unwrap();
    assert_eq!(found.status, CepResultStatus::Error);
    assert!(found.data.is_none());
    let error = found.error.unwrap();
    assert_eq!(error.code, ErrorCode::CepNotFound);
    assert_eq!(error.message, "CEP not found");
}

#[tokio::test]
async fn test_pending_row_is_overwritten() {
    let repo = repo().await;
    let crawl_id = Uuid::new_v4();

    assert!(repo
        .upsert(&CepResult::pending(crawl_id, "01000000", timeout(), 1))
        .await
        .unwrap());
    assert!(repo
        .upsert(&CepResult::pending(crawl_id, "01000000", timeout(), 2))
        .await
        .unwrap());
    assert_eq!(
        repo.find(crawl_id, "01000000").await.unwrap().unwrap().retry_count,
        2
    );

    assert!(repo
        .upsert(&CepResult::success(crawl_id, "01000000", record("01000000"), 2))
        .await
        .unwrap());
    let found = repo.find(crawl_id, "01000000").await.unwrap().unwrap();
    assert_eq!(found.status, CepResultStatus::Success);
    assert!(found.error.is_none());
}

#[tokio::test]
async fn test_terminal_row_is_never_overwritten() {
    let repo = repo().await;
    let crawl_id = Uuid::new_v4();

    assert!(repo
        .upsert(&CepResult::success(crawl_id, "01000000", record("01000000"), 0))
        .await
        .unwrap());

    assert!(!repo
        .upsert(&CepResult::error(crawl_id, "01000000", timeout(), 3))
        .await
        .unwrap());
    assert!(!repo
        .upsert(&CepResult::pending(crawl_id, "01000000", timeout(), 1))
        .await
        .unwrap());

    let found = repo.find(crawl_id, "01000000").await.unwrap().unwrap();
    assert_eq!(found.status, CepResultStatus::Success);
    assert_eq!(found.retry_count, 0);
}

#[tokio::test]
async fn test_listing_is_terminal_only_newest_first() {
    let repo = repo().await;
    let crawl_id = Uuid::new_v4();
    let base = Utc::now() - Duration::minutes(10);

    for i in 0..5 {
        let cep = format!("{:08}", 1_000_000 + i);
        let mut result = CepResult::success(crawl_id, &cep, record(&cep), 0);
        result.processed_at = base + Duration::seconds(i as i64);
        repo.upsert(&result).await.unwrap();
    }
    repo.upsert(&CepResult::pending(crawl_id, "01000009", timeout(), 1))
        .await
        .unwrap();
    // 其他批次的结果不计入
    repo.upsert(&CepResult::success(Uuid::new_v4(), "01000000", record("01000000"), 0))
        .await
        .unwrap();

    assert_eq!(repo.count_by_crawl_id(crawl_id).await.unwrap(), 5);

    let first = repo.find_by_crawl_id(crawl_id, 0, 2).await.unwrap();
    let ceps: Vec<&str> = first.iter().map(|r| r.cep.as_str()).collect();
    assert_eq!(ceps, vec!["01000004", "01000003"]);

    let last = repo.find_by_crawl_id(crawl_id, 4, 2).await.unwrap();
    assert_eq!(last.len(), 1);
    assert_eq!(last[0].cep, "01000000");

    assert!(repo.find_by_crawl_id(crawl_id, 10, 2).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_record_terminal_writes_result_and_counts_once() {
    let db = setup_db().await;
    let crawls = CrawlRepositoryImpl::new(db.clone());
    let repo = CepResultRepositoryImpl::new(db);
    let crawl = Crawl::new("01000000".to_string(), "01000001".to_string(), 2);
    crawls.create(&crawl).await.unwrap();

    repo.upsert(&CepResult::pending(crawl.id, "01000000", timeout(), 1))
        .await
        .unwrap();
    let success = CepResult::success(crawl.id, "01000000", record("01000000"), 1);
    assert!(repo.record_terminal(&success, JobOutcome::Success).await.unwrap());

    let not_found = CepResult::error(crawl.id, "01000000", ResultError::not_found(), 1);
    assert!(!repo.record_terminal(&not_found, JobOutcome::Error).await.unwrap());

    let stored = crawls.find_by_id(crawl.id).await.unwrap().unwrap();
    assert_eq!(stored.stats.processed, 1);
    assert_eq!(stored.stats.success, 1);
    assert_eq!(stored.stats.errors, 0);

    let found = repo.find(crawl.id, "01000000").await.unwrap().unwrap();
    assert_eq!(found.status, CepResultStatus::Success);
}

#[tokio::test]
async fn test_record_terminal_rolls_back_when_counter_update_fails() {
    let repo = repo().await;
    let crawl_id = Uuid::new_v4();

    repo.upsert(&CepResult::pending(crawl_id, "01000000", timeout(), 1))
        .await
        .unwrap();

    // 批次不存在，计数更新失败，结果写入随事务回滚
    let success = CepResult::success(crawl_id, "01000000", record("01000000"), 1);
    let err = repo
        .record_terminal(&success, JobOutcome::Success)
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound));

    let found = repo.find(crawl_id, "01000000").await.unwrap().unwrap();
    assert_eq!(found.status, CepResultStatus::Pending);
    assert_eq!(found.retry_count, 1);
    assert_eq!(repo.count_by_crawl_id(crawl_id).await.unwrap(), 0);
}

#[tokio::test]
async fn test_unknown_error_code_is_reported_as_corrupted() {
    let db = setup_db().await;
    let crawl_id = Uuid::new_v4();
    result_entity::ActiveModel {
        crawl_id: Set(crawl_id),
        cep: Set("01000000".to_string()),
        status: Set("error".to_string()),
        data: Set(None),
        error_message: Set(Some("boom".to_string())),
        error_code: Set(Some("SOMETHING_ELSE".to_string())),
        retry_count: Set(0),
        processed_at: Set(Utc::now().into()),
    }
    .insert(db.as_ref())
    .await
    .unwrap();

    let err = CepResultRepositoryImpl::new(db)
        .find(crawl_id, "01000000")
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::Corrupted(_)));
}
