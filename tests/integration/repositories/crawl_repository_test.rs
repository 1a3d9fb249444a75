// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::super::helpers::setup_db;
use cepcrawl::domain::models::crawl::{Crawl, CrawlStatus, JobOutcome};
use cepcrawl::domain::repositories::crawl_repository::{CrawlRepository, RepositoryError};
use cepcrawl::infrastructure::repositories::crawl_repo_impl::CrawlRepositoryImpl;
use futures::future::join_all;
use std::sync::Arc;
use uuid::Uuid;

async fn repo_with_crawl(total: i32) -> (Arc<CrawlRepositoryImpl>, Crawl) {
    let repo = Arc::new(CrawlRepositoryImpl::new(setup_db().await));
    let crawl = Crawl::new("01000000".to_string(), format!("{:08}", 1_000_000 + total - 1), total);
    repo.create(&crawl).await.unwrap();
    (repo, crawl)
}

#[tokio::test]
async fn test_create_and_find_round_trip() {
    let (repo, crawl) = repo_with_crawl(10).await;

    let found = repo.find_by_id(crawl.id).await.unwrap().unwrap();
    assert_eq!(found.id, crawl.id);
    assert_eq!(found.cep_start, "01000000");
    assert_eq!(found.cep_end, "01000009");
    assert_eq!(found.total_ceps, 10);
    assert_eq!(found.status, CrawlStatus::Pending);
    assert_eq!(found.stats.processed, 0);
    assert!(found.started_at.is_none());
    assert!(found.finished_at.is_none());

    assert!(repo.find_by_id(Uuid::new_v4()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_increment_stats_keeps_counters_consistent() {
    let (repo, crawl) = repo_with_crawl(10).await;

    repo.increment_stats(crawl.id, JobOutcome::Success).await.unwrap();
    repo.increment_stats(crawl.id, JobOutcome::Success).await.unwrap();
    repo.increment_stats(crawl.id, JobOutcome::Error).await.unwrap();

    let found = repo.find_by_id(crawl.id).await.unwrap().unwrap();
    assert_eq!(found.stats.processed, 3);
    assert_eq!(found.stats.success, 2);
    assert_eq!(found.stats.errors, 1);
}

#[tokio::test]
async fn test_concurrent_increments_are_not_lost() {
    let (repo, crawl) = repo_with_crawl(40).await;

    let updates = (0..40).map(|i| {
        let repo = repo.clone();
        let outcome = if i % 4 == 0 {
            JobOutcome::Error
        } else {
            JobOutcome::Success
        };
        async move { repo.increment_stats(crawl.id, outcome).await }
    });
    for result in join_all(updates).await {
        result.unwrap();
    }

    let found = repo.find_by_id(crawl.id).await.unwrap().unwrap();
    assert_eq!(found.stats.processed, 40);
    assert_eq!(found.stats.success, 30);
    assert_eq!(found.stats.errors, 10);
    assert!(found.is_complete());
}

#[tokio::test]
async fn test_increment_unknown_crawl_is_not_found() {
    let (repo, _) = repo_with_crawl(1).await;

    let err = repo
        .increment_stats(Uuid::new_v4(), JobOutcome::Success)
        .await
        .unwrap_err();
    assert!(matches!(err, RepositoryError::NotFound));
}

#[tokio::test]
async fn test_mark_started_only_from_pending() {
    let (repo, crawl) = repo_with_crawl(2).await;

    assert!(repo.mark_started(crawl.id).await.unwrap());
    assert!(!repo.mark_started(crawl.id).await.unwrap());

    let found = repo.find_by_id(crawl.id).await.unwrap().unwrap();
    assert_eq!(found.status, CrawlStatus::Running);
    assert!(found.started_at.is_some());
}

#[tokio::test]
async fn test_mark_finished_happens_once() {
    let (repo, crawl) = repo_with_crawl(2).await;
    repo.mark_started(crawl.id).await.unwrap();

    assert!(repo.mark_finished(crawl.id, CrawlStatus::Finished).await.unwrap());
    assert!(!repo.mark_finished(crawl.id, CrawlStatus::Failed).await.unwrap());
    // 终态之后不会再回到 running
    assert!(!repo.mark_started(crawl.id).await.unwrap());

    let found = repo.find_by_id(crawl.id).await.unwrap().unwrap();
    assert_eq!(found.status, CrawlStatus::Finished);
    assert!(found.finished_at.is_some());
}

#[tokio::test]
async fn test_concurrent_finalizers_have_single_winner() {
    let (repo, crawl) = repo_with_crawl(1).await;
    repo.mark_started(crawl.id).await.unwrap();

    let attempts = (0..8).map(|_| {
        let repo = repo.clone();
        async move { repo.mark_finished(crawl.id, CrawlStatus::Finished).await }
    });
    let winners = join_all(attempts)
        .await
        .into_iter()
        .filter(|r| *r.as_ref().unwrap())
        .count();

    assert_eq!(winners, 1);
}
