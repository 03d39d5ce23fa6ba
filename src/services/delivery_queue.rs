//! Bounded delivery queue and worker pool.
//!
//! Producers hand queued notifications to a bounded channel; a fixed pool
//! of workers consumes them, attempts delivery through the transport, and
//! schedules backoff re-enqueues for transient failures. Submissions to a
//! full buffer are dropped, never blocked on.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, error::TrySendError, Receiver, Sender};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::DeliveryConfig;
use crate::metrics::{DeliveryMetrics, MetricsSnapshot};
use crate::models::{Notification, NotificationStatus};
use crate::services::transport::DeliveryTransport;
use crate::store::MemoryStore;

pub const DEFAULT_WORKER_COUNT: usize = 10;
pub const DEFAULT_QUEUE_CAPACITY: usize = 1000;

/// Retry budget and backoff schedule for failed delivery attempts.
///
/// `attempts` is incremented on every failure and the budget check is
/// `attempts <= max_retries`, so a terminally failed notification carries
/// `max_retries + 1` attempts. Backoff doubles per attempt with no jitter:
/// 100ms, 200ms, 400ms at the defaults.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &DeliveryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_backoff: Duration::from_millis(config.initial_backoff_ms),
        }
    }

    /// Whether a notification with `attempts` recorded failures still has
    /// retry budget.
    pub fn should_retry(&self, attempts: u32) -> bool {
        attempts <= self.max_retries
    }

    /// Backoff before re-enqueueing the `attempt`-th failure (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        self.initial_backoff * 2u32.pow(attempt.saturating_sub(1))
    }
}

/// Everything a worker needs to run a processing pass, cheap to clone into
/// spawned tasks.
#[derive(Clone)]
struct WorkerContext {
    store: Arc<MemoryStore>,
    metrics: Arc<DeliveryMetrics>,
    transport: Arc<dyn DeliveryTransport>,
    policy: RetryPolicy,
    tx: Sender<Notification>,
    shutdown: CancellationToken,
}

/// Bounded handoff channel plus the worker pool consuming it.
pub struct DeliveryQueue {
    context: WorkerContext,
    rx: Mutex<Option<Receiver<Notification>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    worker_count: usize,
}

impl DeliveryQueue {
    pub fn new(
        store: Arc<MemoryStore>,
        metrics: Arc<DeliveryMetrics>,
        transport: Arc<dyn DeliveryTransport>,
        config: &DeliveryConfig,
    ) -> Self {
        let worker_count = if config.worker_count == 0 {
            DEFAULT_WORKER_COUNT
        } else {
            config.worker_count
        };
        let capacity = if config.queue_capacity == 0 {
            DEFAULT_QUEUE_CAPACITY
        } else {
            config.queue_capacity
        };

        let (tx, rx) = mpsc::channel(capacity);

        Self {
            context: WorkerContext {
                store,
                metrics,
                transport,
                policy: RetryPolicy::from_config(config),
                tx,
                shutdown: CancellationToken::new(),
            },
            rx: Mutex::new(Some(rx)),
            workers: Mutex::new(Vec::new()),
            worker_count,
        }
    }

    /// Spawn the worker pool. A second call is a no-op.
    pub fn start(&self) {
        let receiver = self.rx.lock().take();
        let Some(receiver) = receiver else {
            warn!("delivery queue already started");
            return;
        };

        let shared_rx = Arc::new(AsyncMutex::new(receiver));
        let mut workers = self.workers.lock();
        for id in 0..self.worker_count {
            let context = self.context.clone();
            let rx = Arc::clone(&shared_rx);
            workers.push(tokio::spawn(worker_loop(context, id, rx)));
        }

        info!(workers = self.worker_count, "delivery queue started");
    }

    /// Hand one notification to the pipeline. Returns `false` without
    /// blocking when the buffer is full or the queue has shut down.
    pub fn submit(&self, notification: Notification) -> bool {
        try_submit(&self.context.tx, notification)
    }

    /// Bulk submission; returns how many notifications the buffer accepted.
    pub fn submit_all(&self, notifications: Vec<Notification>) -> usize {
        let mut queued = 0;
        for notification in notifications {
            if self.submit(notification) {
                queued += 1;
            }
        }
        queued
    }

    /// Number of notifications currently buffered.
    pub fn len(&self) -> usize {
        self.context.tx.max_capacity() - self.context.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Metrics snapshot including the live queue length and pool size.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.context.metrics.snapshot(self.len(), self.worker_count)
    }

    /// Signal shutdown and wait for every worker to exit its loop.
    ///
    /// In-flight processing passes run to completion; buffered items are
    /// discarded when the receiver drops. Pending backoff sleepers observe
    /// the cancellation and abandon their re-enqueue.
    pub async fn stop(&self) {
        self.context.shutdown.cancel();

        let handles: Vec<JoinHandle<()>> = self.workers.lock().drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                error!("delivery worker task panicked: {}", e);
            }
        }

        info!("delivery queue stopped");
    }
}

fn try_submit(tx: &Sender<Notification>, notification: Notification) -> bool {
    match tx.try_send(notification) {
        Ok(()) => true,
        Err(TrySendError::Full(dropped)) => {
            warn!(notification = %dropped.id, "delivery queue full, notification dropped");
            false
        }
        Err(TrySendError::Closed(dropped)) => {
            warn!(notification = %dropped.id, "delivery queue closed, notification dropped");
            false
        }
    }
}

async fn worker_loop(
    context: WorkerContext,
    id: usize,
    rx: Arc<AsyncMutex<Receiver<Notification>>>,
) {
    debug!(worker = id, "delivery worker started");

    loop {
        let next = {
            let mut rx = rx.lock().await;
            tokio::select! {
                biased;
                _ = context.shutdown.cancelled() => None,
                item = rx.recv() => item,
            }
        };

        let Some(notification) = next else {
            debug!(worker = id, "delivery worker stopping");
            return;
        };

        process(&context, notification).await;
    }
}

/// One delivery attempt: synthetic latency, failure draw, then either a
/// terminal store transition or a scheduled re-enqueue.
async fn process(context: &WorkerContext, mut notification: Notification) {
    let started = Instant::now();

    tokio::time::sleep(context.transport.delivery_delay()).await;

    if context.transport.attempt_fails() {
        context.metrics.record_failed_attempt();
        notification.attempts += 1;

        if context.policy.should_retry(notification.attempts) {
            let backoff = context.policy.backoff_for(notification.attempts);
            info!(
                notification = %notification.id,
                user = %notification.user_id,
                attempt = notification.attempts,
                max_retries = context.policy.max_retries,
                ?backoff,
                "delivery failed, retry scheduled"
            );

            notification.status = NotificationStatus::Retrying;
            if let Err(e) = context.store.update_notification(&notification) {
                warn!("failed to persist retrying status: {}", e);
            }
            context.metrics.record_retry();

            let retry_context = context.clone();
            tokio::spawn(async move {
                tokio::select! {
                    biased;
                    _ = retry_context.shutdown.cancelled() => {
                        debug!(
                            notification = %notification.id,
                            "retry abandoned, queue shutting down"
                        );
                    }
                    _ = tokio::time::sleep(backoff) => {
                        try_submit(&retry_context.tx, notification);
                    }
                }
            });
            return;
        }

        warn!(
            notification = %notification.id,
            user = %notification.user_id,
            attempts = notification.attempts,
            "delivery failed permanently"
        );
        notification.status = NotificationStatus::Failed;
        if let Err(e) = context.store.update_notification(&notification) {
            warn!("failed to persist failed status: {}", e);
        }
        return;
    }

    notification.status = NotificationStatus::Delivered;
    if let Err(e) = context.store.update_notification(&notification) {
        warn!("failed to persist delivered status: {}", e);
    }
    context.metrics.record_delivery(started.elapsed());

    debug!(
        notification = %notification.id,
        user = %notification.user_id,
        post = %notification.post_id,
        "notification delivered"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Post;
    use chrono::Utc;

    struct NeverFail;

    impl DeliveryTransport for NeverFail {
        fn delivery_delay(&self) -> Duration {
            Duration::ZERO
        }

        fn attempt_fails(&self) -> bool {
            false
        }
    }

    fn queue_with_config(config: DeliveryConfig) -> Arc<DeliveryQueue> {
        Arc::new(DeliveryQueue::new(
            Arc::new(MemoryStore::new()),
            Arc::new(DeliveryMetrics::new()),
            Arc::new(NeverFail),
            &config,
        ))
    }

    fn sample_notification() -> Notification {
        let post = Post {
            id: "p1".to_string(),
            author_id: "author".to_string(),
            content: "content".to_string(),
            created_at: Utc::now(),
        };
        Notification::for_follower("u1", &post)
    }

    #[test]
    fn test_retry_policy_backoff_schedule() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.backoff_for(1), Duration::from_millis(100));
        assert_eq!(policy.backoff_for(2), Duration::from_millis(200));
        assert_eq!(policy.backoff_for(3), Duration::from_millis(400));
    }

    #[test]
    fn test_retry_policy_budget_boundary() {
        let policy = RetryPolicy::default();

        assert!(policy.should_retry(1));
        assert!(policy.should_retry(3));
        assert!(!policy.should_retry(4));
    }

    #[tokio::test]
    async fn test_zero_worker_count_falls_back_to_default() {
        let queue = queue_with_config(DeliveryConfig {
            worker_count: 0,
            ..DeliveryConfig::default()
        });

        assert_eq!(queue.worker_count(), DEFAULT_WORKER_COUNT);
    }

    #[tokio::test]
    async fn test_full_buffer_drops_without_blocking() {
        let queue = queue_with_config(DeliveryConfig {
            queue_capacity: 3,
            ..DeliveryConfig::default()
        });

        for _ in 0..3 {
            assert!(queue.submit(sample_notification()));
        }
        assert!(!queue.submit(sample_notification()));
        assert_eq!(queue.len(), 3);
    }

    #[tokio::test]
    async fn test_bulk_submit_reports_accepted_count() {
        let queue = queue_with_config(DeliveryConfig {
            queue_capacity: 2,
            ..DeliveryConfig::default()
        });

        let batch: Vec<Notification> = (0..5).map(|_| sample_notification()).collect();
        assert_eq!(queue.submit_all(batch), 2);
    }

    #[tokio::test]
    async fn test_snapshot_reflects_queue_length_and_pool_size() {
        let queue = queue_with_config(DeliveryConfig {
            worker_count: 4,
            queue_capacity: 10,
            ..DeliveryConfig::default()
        });
        queue.submit(sample_notification());
        queue.submit(sample_notification());

        let snapshot = queue.metrics_snapshot();
        assert_eq!(snapshot.queue_size, 2);
        assert_eq!(snapshot.worker_count, 4);
    }

    #[tokio::test]
    async fn test_start_twice_is_noop() {
        let queue = queue_with_config(DeliveryConfig {
            worker_count: 2,
            ..DeliveryConfig::default()
        });

        queue.start();
        queue.start();
        queue.stop().await;
    }
}
