//! Per-user notification history endpoints.

use actix_web::{web, HttpResponse, Result as ActixResult};
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::DispatchError;
use crate::handlers::ApiResponse;
use crate::models::{Notification, NotificationStatus};
use crate::store::MemoryStore;

/// Maximum history entries returned per user.
const READ_LIMIT: usize = 20;

/// External view of a notification on the read surface.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    pub id: Uuid,
    #[serde(rename = "userID")]
    pub user_id: String,
    #[serde(rename = "postID")]
    pub post_id: String,
    #[serde(rename = "authorID")]
    pub author_id: String,
    pub content: String,
    /// RFC-3339 UTC timestamp
    pub created_at: String,
    pub read: bool,
    /// Symbolic status name
    pub status: NotificationStatus,
    pub attempts: u32,
}

impl From<Notification> for NotificationView {
    fn from(n: Notification) -> Self {
        Self {
            id: n.id,
            user_id: n.user_id,
            post_id: n.post_id,
            author_id: n.author_id,
            content: n.content,
            created_at: n.created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            read: n.read,
            status: n.status,
            attempts: n.attempts,
        }
    }
}

/// List the most recent notifications for a user, newest first.
///
/// GET /api/v1/notifications/{user_id}
pub async fn get_notifications(
    store: web::Data<Arc<MemoryStore>>,
    path: web::Path<String>,
) -> ActixResult<HttpResponse> {
    let user_id = path.into_inner();

    let views: Vec<NotificationView> = store
        .get_user_notifications(&user_id, READ_LIMIT)
        .into_iter()
        .map(NotificationView::from)
        .collect();

    Ok(HttpResponse::Ok().json(views))
}

/// Mark one notification as read.
///
/// PUT /api/v1/notifications/{user_id}/{id}/read
pub async fn mark_as_read(
    store: web::Data<Arc<MemoryStore>>,
    path: web::Path<(String, Uuid)>,
) -> ActixResult<HttpResponse> {
    let (user_id, notification_id) = path.into_inner();

    match store.mark_notification_read(&user_id, notification_id) {
        Ok(notification) => {
            Ok(HttpResponse::Ok().json(ApiResponse::ok(NotificationView::from(notification))))
        }
        Err(e @ DispatchError::UserNotFound(_))
        | Err(e @ DispatchError::NotificationNotFound(_)) => {
            Ok(HttpResponse::NotFound().json(ApiResponse::<NotificationView>::err(e.to_string())))
        }
        Err(e) => Ok(
            HttpResponse::InternalServerError().json(ApiResponse::<NotificationView>::err(
                e.to_string(),
            )),
        ),
    }
}

/// Register routes
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1/notifications")
            .route("/{user_id}", web::get().to(get_notifications))
            .route("/{user_id}/{id}/read", web::put().to(mark_as_read)),
    );
}
