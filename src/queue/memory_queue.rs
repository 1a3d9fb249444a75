// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use super::job_queue::{chunk_jobs, JobQueue, QueueConfig, QueueError, MAX_BATCH_SIZE};
use crate::domain::models::job::{CepJob, ReceivedJob};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::time::Instant;
use uuid::Uuid;

#[derive(Debug)]
struct Message {
    job: CepJob,
    receipt: Option<String>,
    visible_at: Instant,
    receive_count: u32,
}

/// 内存任务队列
///
/// 可见性超时使用 `tokio::time::Instant` 计时，测试中可以暂停或快进时间
pub struct InMemoryJobQueue {
    config: QueueConfig,
    messages: Mutex<VecDeque<Message>>,
    batches_sent: AtomicUsize,
}

impl InMemoryJobQueue {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config,
            messages: Mutex::new(VecDeque::new()),
            batches_sent: AtomicUsize::new(0),
        }
    }

    /// 队列中的消息总数（包括不可见的）
    pub fn len(&self) -> usize {
        self.messages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.lock().is_empty()
    }

    /// 已被接收且仍在可见性超时内的消息数
    pub fn in_flight(&self) -> usize {
        let now = Instant::now();
        self.messages
            .lock()
            .iter()
            .filter(|m| m.receipt.is_some() && m.visible_at > now)
            .count()
    }

    /// 已发送的批次数
    pub fn batches_sent(&self) -> usize {
        self.batches_sent.load(Ordering::Relaxed)
    }

    /// 某个任务被投递的次数
    pub fn receive_count(&self, job: &CepJob) -> Option<u32> {
        self.messages
            .lock()
            .iter()
            .find(|m| &m.job == job)
            .map(|m| m.receive_count)
    }

    fn push(&self, jobs: &[CepJob]) {
        let now = Instant::now();
        let mut messages = self.messages.lock();
        messages.extend(jobs.iter().cloned().map(|job| Message {
            job,
            receipt: None,
            visible_at: now,
            receive_count: 0,
        }));
    }

    fn claim(&self, max_count: usize) -> Vec<ReceivedJob> {
        let now = Instant::now();
        let mut messages = self.messages.lock();

        messages
            .iter_mut()
            .filter(|m| m.visible_at <= now)
            .take(max_count)
            .map(|m| {
                let receipt = Uuid::new_v4().to_string();
                m.receipt = Some(receipt.clone());
                m.visible_at = now + self.config.visibility_timeout;
                m.receive_count += 1;
                ReceivedJob {
                    job: m.job.clone(),
                    receipt,
                }
            })
            .collect()
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn enqueue(&self, job: CepJob) -> Result<(), QueueError> {
        self.push(std::slice::from_ref(&job));
        self.batches_sent.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn enqueue_batch(&self, jobs: Vec<CepJob>) -> Result<(), QueueError> {
        for chunk in chunk_jobs(&jobs, self.config.batch_size()) {
            self.push(chunk);
            self.batches_sent.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    async fn receive(&self, max_count: usize) -> Result<Vec<ReceivedJob>, QueueError> {
        let max_count = max_count.clamp(1, MAX_BATCH_SIZE);
        let deadline = Instant::now() + self.config.wait_time;

        loop {
            let claimed = self.claim(max_count);
            let now = Instant::now();
            if !claimed.is_empty() || now >= deadline {
                return Ok(claimed);
            }
            tokio::time::sleep(self.config.poll_interval.min(deadline - now)).await;
        }
    }

    async fn acknowledge(&self, receipt: &str) -> Result<(), QueueError> {
        // 过期的凭据不再匹配任何消息，确认被忽略
        self.messages
            .lock()
            .retain(|m| m.receipt.as_deref() != Some(receipt));
        Ok(())
    }
}
