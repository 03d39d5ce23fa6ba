//! User listing endpoint.

use actix_web::{web, HttpResponse, Result as ActixResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::models::User;
use crate::store::MemoryStore;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: String,
    pub username: String,
    pub followers: usize,
    pub following: usize,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            followers: user.follower_ids.len(),
            following: user.following_ids.len(),
        }
    }
}

/// List all users.
///
/// GET /api/v1/users
pub async fn get_users(store: web::Data<Arc<MemoryStore>>) -> ActixResult<HttpResponse> {
    let mut views: Vec<UserView> = store
        .get_all_users()
        .into_iter()
        .map(UserView::from)
        .collect();
    views.sort_by(|a, b| a.id.cmp(&b.id));

    Ok(HttpResponse::Ok().json(views))
}

/// Register routes
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/api/v1/users").route("", web::get().to(get_users)));
}
