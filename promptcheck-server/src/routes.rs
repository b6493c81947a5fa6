use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

use crate::{handlers, AppState};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/evaluate", post(handlers::evaluate))
        .route("/api/optimize", post(handlers::optimize))
        .route("/health", get(handlers::health))
}
