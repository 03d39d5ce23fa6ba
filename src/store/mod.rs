//! Concurrency-safe in-memory repository of users, posts, and per-user
//! notification histories. Sole source of truth for the dispatch pipeline.

use chrono::{Duration as ChronoDuration, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use uuid::Uuid;

use crate::error::{DispatchError, Result};
use crate::models::{Notification, Post, User};

#[derive(Default)]
struct StoreInner {
    users: HashMap<String, User>,
    posts: HashMap<String, Post>,
    /// Per-recipient histories; append-only with respect to distinct IDs
    notifications: HashMap<String, Vec<Notification>>,
}

/// In-memory store guarded by a single readers-writer lock.
///
/// Reads return cloned snapshots; mutation happens only through the
/// explicit save/update operations.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<StoreInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a user. Intended for initialization and tests;
    /// the pipeline itself never creates users.
    pub fn insert_user(&self, user: User) {
        let mut inner = self.inner.write();
        inner.notifications.entry(user.id.clone()).or_default();
        inner.users.insert(user.id.clone(), user);
    }

    pub fn get_user(&self, id: &str) -> Result<User> {
        let inner = self.inner.read();
        inner
            .users
            .get(id)
            .cloned()
            .ok_or_else(|| DispatchError::UserNotFound(id.to_string()))
    }

    pub fn get_all_users(&self) -> Vec<User> {
        let inner = self.inner.read();
        inner.users.values().cloned().collect()
    }

    /// Resolve the followers of `user_id`. Follower IDs that no longer
    /// resolve to a user are silently dropped: follower lists are a
    /// materialized cache of relations and may reference removed users.
    pub fn get_followers(&self, user_id: &str) -> Result<Vec<User>> {
        let inner = self.inner.read();
        let user = inner
            .users
            .get(user_id)
            .ok_or_else(|| DispatchError::UserNotFound(user_id.to_string()))?;

        Ok(user
            .follower_ids
            .iter()
            .filter_map(|id| inner.users.get(id).cloned())
            .collect())
    }

    /// Store a post, overwriting on ID collision.
    pub fn save_post(&self, post: Post) {
        let mut inner = self.inner.write();
        inner.posts.insert(post.id.clone(), post);
    }

    pub fn get_post(&self, id: &str) -> Result<Post> {
        let inner = self.inner.read();
        inner
            .posts
            .get(id)
            .cloned()
            .ok_or_else(|| DispatchError::PostNotFound(id.to_string()))
    }

    /// Append a notification to its recipient's history.
    pub fn save_notification(&self, notification: Notification) {
        let mut inner = self.inner.write();
        inner
            .notifications
            .entry(notification.user_id.clone())
            .or_default()
            .push(notification);
    }

    /// Replace an existing notification in place, matched by ID under its
    /// recipient's history.
    pub fn update_notification(&self, notification: &Notification) -> Result<()> {
        let mut inner = self.inner.write();
        let history = inner
            .notifications
            .get_mut(&notification.user_id)
            .ok_or_else(|| DispatchError::UserNotFound(notification.user_id.clone()))?;

        match history.iter_mut().find(|n| n.id == notification.id) {
            Some(entry) => {
                *entry = notification.clone();
                Ok(())
            }
            None => Err(DispatchError::NotificationNotFound(
                notification.id.to_string(),
            )),
        }
    }

    /// Flip the read flag on one notification and return the updated
    /// snapshot.
    pub fn mark_notification_read(&self, user_id: &str, id: Uuid) -> Result<Notification> {
        let mut inner = self.inner.write();
        let history = inner
            .notifications
            .get_mut(user_id)
            .ok_or_else(|| DispatchError::UserNotFound(user_id.to_string()))?;

        match history.iter_mut().find(|n| n.id == id) {
            Some(entry) => {
                entry.read = true;
                Ok(entry.clone())
            }
            None => Err(DispatchError::NotificationNotFound(id.to_string())),
        }
    }

    /// Up to `limit` most recently appended notifications for a user,
    /// newest first. An unknown user yields an empty list, not an error.
    pub fn get_user_notifications(&self, user_id: &str, limit: usize) -> Vec<Notification> {
        let inner = self.inner.read();
        match inner.notifications.get(user_id) {
            Some(history) => history.iter().rev().take(limit).cloned().collect(),
            None => Vec::new(),
        }
    }

    /// Populate the store with a small demo social graph.
    pub fn seed_demo_data(&self) {
        let mut users = vec![
            demo_user("user1", "alice"),
            demo_user("user2", "bob"),
            demo_user("user3", "charlie"),
            demo_user("user4", "dave"),
            demo_user("user5", "eve"),
            demo_user("user6", "frank"),
            demo_user("user7", "grace"),
        ];

        // alice is followed by everyone; a few others have partial graphs
        users[0].follower_ids = ids(&["user2", "user3", "user4", "user5", "user6", "user7"]);
        users[1].follower_ids = ids(&["user1", "user3", "user5"]);
        users[2].follower_ids = ids(&["user1", "user2", "user4"]);
        users[3].follower_ids = ids(&["user2", "user5", "user7"]);

        for user in users {
            self.insert_user(user);
        }

        let now = Utc::now();
        let posts = vec![
            Post {
                id: "post1".to_string(),
                author_id: "user1".to_string(),
                content: "Hello world from alice!".to_string(),
                created_at: now - ChronoDuration::hours(24),
            },
            Post {
                id: "post2".to_string(),
                author_id: "user2".to_string(),
                content: "bob's first post".to_string(),
                created_at: now - ChronoDuration::hours(12),
            },
            Post {
                id: "post3".to_string(),
                author_id: "user3".to_string(),
                content: "charlie's thoughts on feeds".to_string(),
                created_at: now - ChronoDuration::hours(6),
            },
        ];

        for post in posts {
            self.save_post(post);
        }
    }
}

fn demo_user(id: &str, username: &str) -> User {
    User {
        id: id.to_string(),
        username: username.to_string(),
        follower_ids: Vec::new(),
        following_ids: Vec::new(),
    }
}

fn ids(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NotificationStatus;

    fn store_with_users(users: &[(&str, &[&str])]) -> MemoryStore {
        let store = MemoryStore::new();
        for (id, followers) in users {
            store.insert_user(User {
                id: id.to_string(),
                username: format!("user {}", id),
                follower_ids: followers.iter().map(|s| s.to_string()).collect(),
                following_ids: Vec::new(),
            });
        }
        store
    }

    fn sample_post(id: &str, author: &str) -> Post {
        Post {
            id: id.to_string(),
            author_id: author.to_string(),
            content: "content".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_get_user_not_found() {
        let store = MemoryStore::new();
        assert_eq!(
            store.get_user("ghost").unwrap_err(),
            DispatchError::UserNotFound("ghost".to_string())
        );
    }

    #[test]
    fn test_followers_resolved_and_unresolved_dropped() {
        let store = store_with_users(&[("u1", &["u2", "missing", "u3"]), ("u2", &[]), ("u3", &[])]);

        let followers = store.get_followers("u1").unwrap();
        let mut follower_ids: Vec<_> = followers.iter().map(|u| u.id.clone()).collect();
        follower_ids.sort();

        assert_eq!(follower_ids, vec!["u2", "u3"]);
    }

    #[test]
    fn test_followers_of_unknown_user_is_error() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.get_followers("ghost"),
            Err(DispatchError::UserNotFound(_))
        ));
    }

    #[test]
    fn test_save_post_overwrites_on_collision() {
        let store = MemoryStore::new();
        store.save_post(sample_post("p1", "u1"));

        let mut replacement = sample_post("p1", "u2");
        replacement.content = "rewritten".to_string();
        store.save_post(replacement);

        let post = store.get_post("p1").unwrap();
        assert_eq!(post.author_id, "u2");
        assert_eq!(post.content, "rewritten");
    }

    #[test]
    fn test_notifications_newest_first_with_limit() {
        let store = store_with_users(&[("u1", &[])]);
        let post = sample_post("p1", "author");

        let mut ids = Vec::new();
        for _ in 0..5 {
            let n = Notification::for_follower("u1", &post);
            ids.push(n.id);
            store.save_notification(n);
        }

        let recent = store.get_user_notifications("u1", 3);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].id, ids[4]);
        assert_eq!(recent[1].id, ids[3]);
        assert_eq!(recent[2].id, ids[2]);
    }

    #[test]
    fn test_notifications_for_unknown_user_empty_not_error() {
        let store = MemoryStore::new();
        assert!(store.get_user_notifications("ghost", 20).is_empty());
    }

    #[test]
    fn test_update_notification_in_place() {
        let store = store_with_users(&[("u1", &[])]);
        let post = sample_post("p1", "author");
        let mut notification = Notification::for_follower("u1", &post);
        store.save_notification(notification.clone());

        notification.status = NotificationStatus::Delivered;
        notification.attempts = 2;
        store.update_notification(&notification).unwrap();

        let stored = store.get_user_notifications("u1", 1);
        assert_eq!(stored[0].status, NotificationStatus::Delivered);
        assert_eq!(stored[0].attempts, 2);
    }

    #[test]
    fn test_update_notification_unknown_recipient() {
        let store = MemoryStore::new();
        let post = sample_post("p1", "author");
        let notification = Notification::for_follower("ghost", &post);

        assert!(matches!(
            store.update_notification(&notification),
            Err(DispatchError::UserNotFound(_))
        ));
    }

    #[test]
    fn test_update_notification_unknown_id() {
        let store = store_with_users(&[("u1", &[])]);
        let post = sample_post("p1", "author");
        store.save_notification(Notification::for_follower("u1", &post));

        let stray = Notification::for_follower("u1", &post);
        assert!(matches!(
            store.update_notification(&stray),
            Err(DispatchError::NotificationNotFound(_))
        ));
    }

    #[test]
    fn test_mark_notification_read() {
        let store = store_with_users(&[("u1", &[])]);
        let post = sample_post("p1", "author");
        let notification = Notification::for_follower("u1", &post);
        let id = notification.id;
        store.save_notification(notification);

        let updated = store.mark_notification_read("u1", id).unwrap();
        assert!(updated.read);

        let stored = store.get_user_notifications("u1", 1);
        assert!(stored[0].read);
    }

    #[test]
    fn test_seed_demo_data_graph() {
        let store = MemoryStore::new();
        store.seed_demo_data();

        assert_eq!(store.get_all_users().len(), 7);
        assert_eq!(store.get_followers("user1").unwrap().len(), 6);
        assert_eq!(store.get_followers("user2").unwrap().len(), 3);
        assert!(store.get_post("post1").is_ok());
        assert!(store.get_user_notifications("user5", 20).is_empty());
    }
}
