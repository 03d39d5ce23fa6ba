//! Delivery metrics endpoints.

use actix_web::{web, HttpResponse, Result as ActixResult};
use std::sync::Arc;

use crate::services::DeliveryQueue;

/// Current delivery metrics snapshot.
///
/// GET /api/v1/metrics (also served operationally at /metrics)
pub async fn get_metrics(queue: web::Data<Arc<DeliveryQueue>>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(queue.metrics_snapshot()))
}

/// Health probe.
///
/// GET /health
pub async fn health() -> &'static str {
    "OK"
}

/// Register routes
pub fn register_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/api/v1/metrics", web::get().to(get_metrics));
}
