//! Post-accept front-end: fans a published post out into one queued
//! notification per follower and hands the batch to the delivery queue.

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Notification, Post};
use crate::services::delivery_queue::DeliveryQueue;
use crate::store::MemoryStore;

/// A post as accepted on the ingest surface, before server defaults are
/// applied.
#[derive(Debug, Clone)]
pub struct IncomingPost {
    /// Empty when the caller wants a server-minted ID
    pub id: String,
    pub author_id: String,
    pub content: String,
    /// Unix seconds; zero means "now"
    pub created_at: i64,
}

/// Outcome of a publish: the effective post ID and how many notifications
/// the delivery queue accepted.
#[derive(Debug, Clone)]
pub struct PublishOutcome {
    pub post_id: String,
    pub notifications_queued: usize,
}

pub struct Dispatcher {
    store: Arc<MemoryStore>,
    queue: Arc<DeliveryQueue>,
}

impl Dispatcher {
    pub fn new(store: Arc<MemoryStore>, queue: Arc<DeliveryQueue>) -> Self {
        Self { store, queue }
    }

    /// Persist the post, fan out one queued notification per follower of
    /// the author, and bulk-enqueue them for delivery.
    ///
    /// Notifications are persisted before enqueueing, so a queue-full drop
    /// leaves a `Queued` record in the store that is never delivered. An
    /// unknown author is an error.
    pub fn publish_post(&self, incoming: IncomingPost) -> Result<PublishOutcome> {
        let post = Post {
            id: if incoming.id.is_empty() {
                Uuid::new_v4().to_string()
            } else {
                incoming.id
            },
            author_id: incoming.author_id,
            content: incoming.content,
            created_at: resolve_timestamp(incoming.created_at),
        };

        self.store.save_post(post.clone());

        let followers = self.store.get_followers(&post.author_id)?;

        let mut notifications = Vec::with_capacity(followers.len());
        for follower in &followers {
            let notification = Notification::for_follower(&follower.id, &post);
            self.store.save_notification(notification.clone());
            notifications.push(notification);
        }

        let queued = self.queue.submit_all(notifications);

        info!(
            post = %post.id,
            author = %post.author_id,
            queued,
            "post published"
        );

        Ok(PublishOutcome {
            post_id: post.id,
            notifications_queued: queued,
        })
    }
}

fn resolve_timestamp(unix_seconds: i64) -> DateTime<Utc> {
    if unix_seconds == 0 {
        return Utc::now();
    }
    match Utc.timestamp_opt(unix_seconds, 0).single() {
        Some(ts) => ts,
        None => Utc::now(),
    }
}
