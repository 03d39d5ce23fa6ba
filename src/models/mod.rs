use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Body used for every fan-out notification.
pub const FANOUT_NOTIFICATION_CONTENT: &str = "New post from a user you follow";

/// Delivery status of a notification.
///
/// `Delivered` and `Failed` are terminal; a `Retrying` notification
/// re-enters the queue as `Queued` work once its backoff elapses.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum NotificationStatus {
    Unknown,
    /// Persisted and waiting for a delivery attempt
    Queued,
    /// Successfully delivered
    Delivered,
    /// Retry budget exhausted
    Failed,
    /// Failed at least once, re-enqueue scheduled
    Retrying,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Unknown => "UNKNOWN",
            NotificationStatus::Queued => "QUEUED",
            NotificationStatus::Delivered => "DELIVERED",
            NotificationStatus::Failed => "FAILED",
            NotificationStatus::Retrying => "RETRYING",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "QUEUED" => NotificationStatus::Queued,
            "DELIVERED" => NotificationStatus::Delivered,
            "FAILED" => NotificationStatus::Failed,
            "RETRYING" => NotificationStatus::Retrying,
            _ => NotificationStatus::Unknown,
        }
    }
}

/// A user with its materialized follower relations.
///
/// Follower lists are a cache of relations and may reference users that no
/// longer resolve; readers drop unresolved IDs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    pub follower_ids: Vec<String>,
    pub following_ids: Vec<String>,
}

/// A published post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub author_id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A recipient-addressed record of a post worth delivering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,

    /// Recipient user ID
    pub user_id: String,

    pub post_id: String,

    /// Author of the post, duplicated for read-path efficiency
    pub author_id: String,

    pub content: String,

    pub created_at: DateTime<Utc>,

    pub read: bool,

    pub status: NotificationStatus,

    /// Failed delivery attempts so far; monotonically non-decreasing
    pub attempts: u32,
}

impl Notification {
    /// Build the queued notification telling `user_id` about `post`.
    pub fn for_follower(user_id: &str, post: &Post) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            post_id: post.id.clone(),
            author_id: post.author_id.clone(),
            content: FANOUT_NOTIFICATION_CONTENT.to_string(),
            created_at: Utc::now(),
            read: false,
            status: NotificationStatus::Queued,
            attempts: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_symbolic_mapping_is_bijective() {
        let statuses = vec![
            NotificationStatus::Unknown,
            NotificationStatus::Queued,
            NotificationStatus::Delivered,
            NotificationStatus::Failed,
            NotificationStatus::Retrying,
        ];

        for status in statuses {
            assert_eq!(NotificationStatus::parse(status.as_str()), status);
        }

        assert_eq!(
            NotificationStatus::parse("nonsense"),
            NotificationStatus::Unknown
        );
    }

    #[test]
    fn test_status_serde_matches_symbolic_names() {
        let json = serde_json::to_string(&NotificationStatus::Retrying).unwrap();
        assert_eq!(json, "\"RETRYING\"");

        let back: NotificationStatus = serde_json::from_str("\"DELIVERED\"").unwrap();
        assert_eq!(back, NotificationStatus::Delivered);
    }

    #[test]
    fn test_notification_for_follower_defaults() {
        let post = Post {
            id: "post1".to_string(),
            author_id: "user1".to_string(),
            content: "hello".to_string(),
            created_at: Utc::now(),
        };

        let notification = Notification::for_follower("user2", &post);

        assert_eq!(notification.user_id, "user2");
        assert_eq!(notification.post_id, "post1");
        assert_eq!(notification.author_id, "user1");
        assert_eq!(notification.content, FANOUT_NOTIFICATION_CONTENT);
        assert_eq!(notification.status, NotificationStatus::Queued);
        assert_eq!(notification.attempts, 0);
        assert!(!notification.read);
    }

    #[test]
    fn test_notification_serialization_round_trip() {
        let post = Post {
            id: "post1".to_string(),
            author_id: "user1".to_string(),
            content: "hello".to_string(),
            created_at: Utc::now(),
        };
        let notification = Notification::for_follower("user3", &post);

        let json = serde_json::to_string(&notification).unwrap();
        let back: Notification = serde_json::from_str(&json).unwrap();

        assert_eq!(back.id, notification.id);
        assert_eq!(back.user_id, notification.user_id);
        assert_eq!(back.status, notification.status);
    }
}
