// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::helpers::{queue_config, setup_db};
use cepcrawl::domain::models::job::CepJob;
use cepcrawl::queue::database_queue::DatabaseJobQueue;
use cepcrawl::queue::job_queue::{JobQueue, QueueConfig, QueueError};
use std::collections::HashSet;
use std::time::Duration;
use uuid::Uuid;

fn jobs(crawl_id: Uuid, n: u32) -> Vec<CepJob> {
    (0..n)
        .map(|i| CepJob::new(crawl_id, format!("{:08}", 1_000_000 + i)))
        .collect()
}

#[tokio::test]
async fn test_enqueue_and_receive_in_batches() {
    let queue = DatabaseJobQueue::new(setup_db().await, queue_config(Duration::from_secs(120)));
    let crawl_id = Uuid::new_v4();

    queue.enqueue_batch(jobs(crawl_id, 25)).await.unwrap();
    assert_eq!(queue.len().await.unwrap(), 25);

    let mut seen = HashSet::new();
    loop {
        let batch = queue.receive(50).await.unwrap();
        if batch.is_empty() {
            break;
        }
        // 单次接收受传输上限约束
        assert!(batch.len() <= 10);
        for received in batch {
            assert_eq!(received.job.crawl_id, crawl_id);
            assert!(seen.insert(received.job.cep.clone()));
        }
    }
    assert_eq!(seen.len(), 25);

    // 未确认的消息仍在队列中，只是不可见
    assert_eq!(queue.len().await.unwrap(), 25);
}

#[tokio::test]
async fn test_acknowledge_removes_message() {
    let queue = DatabaseJobQueue::new(setup_db().await, queue_config(Duration::from_secs(120)));
    queue.enqueue(CepJob::new(Uuid::new_v4(), "01000000")).await.unwrap();

    let batch = queue.receive(10).await.unwrap();
    assert_eq!(batch.len(), 1);

    queue.acknowledge(&batch[0].receipt).await.unwrap();
    assert_eq!(queue.len().await.unwrap(), 0);
    assert!(queue.receive(10).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unacknowledged_message_is_redelivered_with_new_receipt() {
    // 可见性超时为零：接收后立即重新可见
    let queue = DatabaseJobQueue::new(setup_db().await, queue_config(Duration::ZERO));
    let job = CepJob::new(Uuid::new_v4(), "01000000");
    queue.enqueue(job.clone()).await.unwrap();

    let first = queue.receive(10).await.unwrap();
    assert_eq!(first.len(), 1);
    let second = queue.receive(10).await.unwrap();
    assert_eq!(second.len(), 1);

    assert_eq!(second[0].job, job);
    assert_ne!(first[0].receipt, second[0].receipt);

    // 过期凭据不能删除消息
    queue.acknowledge(&first[0].receipt).await.unwrap();
    assert_eq!(queue.len().await.unwrap(), 1);

    queue.acknowledge(&second[0].receipt).await.unwrap();
    assert_eq!(queue.len().await.unwrap(), 0);
}

#[tokio::test]
async fn test_visibility_timeout_expires() {
    let queue = DatabaseJobQueue::new(
        setup_db().await,
        queue_config(Duration::from_millis(300)),
    );
    queue.enqueue(CepJob::new(Uuid::new_v4(), "01000000")).await.unwrap();

    assert_eq!(queue.receive(10).await.unwrap().len(), 1);
    assert!(queue.receive(10).await.unwrap().is_empty());

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(queue.receive(10).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_long_poll_picks_up_late_message() {
    let db = setup_db().await;
    let queue = std::sync::Arc::new(DatabaseJobQueue::new(
        db,
        QueueConfig {
            visibility_timeout: Duration::from_secs(120),
            wait_time: Duration::from_secs(5),
            poll_interval: Duration::from_millis(50),
            ..Default::default()
        },
    ));

    let producer = queue.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        producer
            .enqueue(CepJob::new(Uuid::new_v4(), "01000000"))
            .await
            .unwrap();
    });

    let started = std::time::Instant::now();
    let batch = queue.receive(10).await.unwrap();
    assert_eq!(batch.len(), 1);
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_concurrent_receivers_never_share_a_message() {
    let queue = std::sync::Arc::new(DatabaseJobQueue::new(
        setup_db().await,
        queue_config(Duration::from_secs(120)),
    ));
    queue.enqueue_batch(jobs(Uuid::new_v4(), 30)).await.unwrap();

    let receivers: Vec<_> = (0..4)
        .map(|_| {
            let queue = queue.clone();
            tokio::spawn(async move {
                let mut ceps = Vec::new();
                loop {
                    let batch = queue.receive(5).await.unwrap();
                    if batch.is_empty() {
                        break;
                    }
                    ceps.extend(batch.into_iter().map(|r| r.job.cep));
                }
                ceps
            })
        })
        .collect();

    let mut all = Vec::new();
    for handle in receivers {
        all.extend(handle.await.unwrap());
    }
    let unique: HashSet<_> = all.iter().cloned().collect();
    assert_eq!(all.len(), 30);
    assert_eq!(unique.len(), 30);
}

#[tokio::test]
async fn test_malformed_receipt_is_rejected() {
    let queue = DatabaseJobQueue::new(setup_db().await, queue_config(Duration::from_secs(120)));
    let err = queue.acknowledge("not-a-receipt").await.unwrap_err();
    assert!(matches!(err, QueueError::Serialization(_)));
}
