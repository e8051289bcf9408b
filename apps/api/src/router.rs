use std::sync::Arc;

use axum::{routing::get, Router};

use queue_cell::create_queue_router;
use queue_cell::QueueRegistry;

pub fn create_router(registry: Arc<QueueRegistry>) -> Router {
    Router::new()
        .route("/", get(|| async { "Clinic queue API is running!" }))
        .nest("/api", create_queue_router(registry))
}
