//! Liveness and welcome routes.

use std::sync::Arc;

use axum::routing::get;
use axum::{Json, Router};

use crate::state::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
}

/// GET /health
async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok", "service": "AION API" }))
}

/// GET /
async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "Welcome to AION Cognitive System" }))
}
