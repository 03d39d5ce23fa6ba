//! gRPC ingest surface for post-accept events.

use std::sync::Arc;
use tonic::{Request, Response, Status};

use crate::services::{Dispatcher, IncomingPost};

pub mod proto {
    pub mod notifications {
        pub mod v1 {
            tonic::include_proto!("notifications.v1");
        }
        pub use v1::*;
    }
}

use proto::notifications::v1::notification_ingest_server::NotificationIngest;
use proto::notifications::v1::{PublishPostRequest, PublishPostResponse};

pub use proto::notifications::v1::notification_ingest_server::NotificationIngestServer;

pub struct NotificationIngestService {
    dispatcher: Arc<Dispatcher>,
}

impl NotificationIngestService {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[tonic::async_trait]
impl NotificationIngest for NotificationIngestService {
    async fn publish_post(
        &self,
        request: Request<PublishPostRequest>,
    ) -> Result<Response<PublishPostResponse>, Status> {
        let req = request.into_inner();

        let outcome = self
            .dispatcher
            .publish_post(IncomingPost {
                id: req.id,
                author_id: req.author_id,
                content: req.content,
                created_at: req.created_at,
            })
            .map_err(|e| Status::internal(format!("failed to publish post: {}", e)))?;

        Ok(Response::new(PublishPostResponse {
            post_id: outcome.post_id,
            notifications_queued: outcome.notifications_queued as i32,
            success: true,
        }))
    }
}
