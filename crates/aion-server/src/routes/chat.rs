//! Chat routes — memory-augmented streaming chat.
//! Mounted under /api/v1/chat.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use tokio_stream::StreamExt;
use tracing::error;

use super::error_response;
use crate::state::AppState;
use aion_chat::ChatRequest;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/message", post(send_message))
}

/// POST /api/v1/chat/message — stream the reply as raw text fragments.
///
/// The body is sent as fragments arrive. If the provider fails mid-way
/// the body is cut off after whatever was already sent.
async fn send_message(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Response {
    let stream = match state.chat.handle(req).await {
        Ok(stream) => stream,
        Err(e) => {
            error!("Chat request failed: {}", e);
            return error_response(e);
        }
    };

    let stream = stream.map(|fragment| {
        if let Err(e) = &fragment {
            error!("Provider stream aborted: {}", e);
        }
        fragment
    });

    (
        [(header::CONTENT_TYPE, "text/event-stream")],
        Body::from_stream(stream),
    )
        .into_response()
}
